use std::time::Duration;

/// Outcome of a request/response exchange that did not yield a response.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service '{service}' did not respond within {timeout:?}")]
    Timeout { service: String, timeout: Duration },
    /// The query completed without any reply, usually because no server
    /// matched or the transport-level query timeout expired.
    #[error("service '{0}' finished without a response")]
    NoResponse(String),
    #[error("service '{service}' replied with an error: {reason}")]
    Remote { service: String, reason: String },
    #[error("codec error: {0}")]
    Codec(#[from] cdr::Error),
    #[error("transport error: {0}")]
    Transport(zenoh::Error),
}

impl From<zenoh::Error> for ServiceError {
    fn from(value: zenoh::Error) -> Self {
        Self::Transport(value)
    }
}
