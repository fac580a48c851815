use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("connection error: {0}")]
    Connection(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid target")]
    InvalidTarget,
    #[error("rate limited")]
    RateLimited,
    #[error("provider rejected credentials")]
    Unauthorized,
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Error surface of the inbound ports, mapped onto transport status codes.
#[derive(Debug, Error)]
pub enum HandleError {
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("timed out")]
    Timeout,
    #[error("busy: {0}")]
    Busy(String),
    #[error("internal error: {0}")]
    Internal(String),
}
