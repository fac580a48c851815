use std::future::Future;
use std::time::Duration;

use dispatch_core::error::DomainError;
use dispatch_ports::error::{HandleError, PortError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("port error: {0}")]
    Port(#[from] PortError),
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("{0} is not configured")]
    Unconfigured(&'static str),
    #[error("store operations exceeded the request budget")]
    Timeout,
    #[error("a reminder pass is already running")]
    ReminderInProgress,
}

impl From<AppError> for HandleError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Domain(e) => HandleError::Rejected(e.to_string()),
            AppError::Invalid(msg) => HandleError::Rejected(msg),
            AppError::Port(PortError::NotFound) => HandleError::NotFound,
            AppError::Port(PortError::Conflict(msg)) => HandleError::Conflict(msg),
            AppError::Port(e) => HandleError::Internal(e.to_string()),
            AppError::Unconfigured(what) => {
                HandleError::Internal(format!("{what} is not configured"))
            }
            AppError::Timeout => HandleError::Timeout,
            AppError::ReminderInProgress => {
                HandleError::Busy("a reminder pass is already running".into())
            }
        }
    }
}

/// Reads the provider numbers; an unset config is a deployment fault.
pub(crate) fn require_numbers<T>(result: Result<T, PortError>) -> Result<T, AppError> {
    match result {
        Err(PortError::NotFound) => Err(AppError::Unconfigured("phone numbers")),
        other => Ok(other?),
    }
}

/// Runs store work under a request budget.
pub(crate) async fn within_budget<T, F>(budget: Duration, work: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(budget, work)
        .await
        .map_err(|_| AppError::Timeout)?
}
