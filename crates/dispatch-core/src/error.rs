use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid phone format")]
    InvalidPhoneFormat,
    #[error("caller id is empty")]
    EmptyCallerId,
    #[error("invalid time of day: {0}")]
    InvalidTimeOfDay(String),
    #[error("time window must not end before it starts")]
    InvalidTimeWindow,
    #[error("invalid day of week: {0}")]
    InvalidDayOfWeek(u8),
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("schedule entry must be exactly one of always, recurring or dated")]
    AmbiguousScheduleKind,
    #[error("unknown notification strategy: {0}")]
    UnknownStrategy(String),
    #[error("thread is already closed")]
    ThreadAlreadyClosed,
    #[error("invalid id: {0}")]
    InvalidId(String),
}
