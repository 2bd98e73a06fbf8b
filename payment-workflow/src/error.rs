use billing_client::ClientError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Client-side precondition failure. Never reaches the network and is
    /// always recoverable in place.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backend accepted the request shape but produced no usable
    /// session (missing id or QR payload). The user returns to bill review
    /// with their selection intact.
    #[error("Session creation failed: {0}")]
    SessionCreation(String),

    /// Transport, backend, or credential failure from the billing client
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl WorkflowError {
    /// Whether the flow must abort and defer to the authentication
    /// collaborator.
    pub fn is_auth(&self) -> bool {
        matches!(self, WorkflowError::Client(err) if err.is_auth())
    }
}
