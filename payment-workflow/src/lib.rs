//! Merged payment collection workflow
//!
//! Provides the stateful core of aggregated bill payment:
//! - In-memory bill selection with a derived payable total
//! - Payment session lifecycle against the billing backend
//! - Cancellable status polling with a client-side timeout cap
//! - A four-stage workflow driving selection through completion
//!
//! One [`PaymentWorkflow`] is constructed per mounted UI instance; all
//! mutable state is private to that instance.

pub mod error;
pub mod poller;
pub mod selection;
pub mod session;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{WorkflowError, WorkflowResult};
pub use poller::{PollerConfig, PollerHandle, StatusPoller, TerminalCallback, TerminalStatus};
pub use selection::BillSelection;
pub use session::{PaymentSession, SessionController};
pub use workflow::{PaymentWorkflow, Stage, TerminalEvent};
