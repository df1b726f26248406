use state_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid request: {0}")]
    InvalidRequest(#[source] serde_json::Error),

    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to install log subscriber: {0}")]
    Logging(String),
}

impl ServiceError {
    /// HTTP-style status the facade reports for this failure.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Store(error) if error.is_not_found() => 404,
            Self::InvalidRequest(_) => 400,
            Self::Store(_) | Self::Encode(_) | Self::Logging(_) => 500,
        }
    }
}
