//! REST client for clinic billing endpoints
//!
//! Provides the HTTP boundary of the merged payment collection flow:
//! - Unpaid bill lookup per patient, normalized from the backend's
//!   assorted response envelopes
//! - Merged payment session creation
//! - Payment session status queries
//!
//! Everything above this crate works with typed models and the
//! [`PaymentsApi`] trait; raw JSON never leaves the client boundary.

pub mod client;
pub mod envelope;
pub mod error;
pub mod models;

pub use client::{ApiConfig, BillingClient, PaymentsApi};
pub use error::{ClientError, ClientResult};
pub use models::{
    Bill, BillStatus, CreateSessionRequest, CreateSessionResponse, Patient, SessionStatus,
    SessionStatusResponse,
};
