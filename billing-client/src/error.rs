use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level failure, no usable response
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response with whatever the backend said about it
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// Credential rejected. Not retried here, the shell re-authenticates
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Response body did not decode as the expected shape
    #[error("Decode error: {0}")]
    Decode(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl ClientError {
    /// Whether the flow must abort and hand control back to the
    /// authentication collaborator.
    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Auth(_))
    }
}
