use thiserror::Error;

#[derive(Debug, Error)]
pub enum CallerError {
    /// Connection refused, timeout, or a non-2xx status from the service.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed request text or an unparseable response body.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Array length mismatch or out-of-range scalar, raised before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl CallerError {
    pub fn is_transport(&self) -> bool {
        matches!(self, CallerError::Transport(_))
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, CallerError::Protocol(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CallerError::Validation(_))
    }
}

impl From<CallerError> for String {
    fn from(err: CallerError) -> Self {
        err.to_string()
    }
}

pub type Result<T, E = CallerError> = std::result::Result<T, E>;
