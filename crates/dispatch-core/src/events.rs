use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::conversation::IgnoreReason;
use crate::ids::ThreadId;
use crate::phone::Phone;
use crate::schedule::Fallback;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DomainEvent {
    ThreadOpened(ThreadOpened),
    ContactIgnored(ContactIgnored),
    StaffPaged(StaffPaged),
    RemindersSent(RemindersSent),
}

impl DomainEvent {
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::ThreadOpened(e) => e.occurred_at,
            Self::ContactIgnored(e) => e.occurred_at,
            Self::StaffPaged(e) => e.occurred_at,
            Self::RemindersSent(e) => e.occurred_at,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ThreadOpened(_) => "thread.opened",
            Self::ContactIgnored(_) => "contact.ignored",
            Self::StaffPaged(_) => "staff.paged",
            Self::RemindersSent(_) => "reminders.sent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadOpened {
    pub thread_id: ThreadId,
    pub phone: Phone,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactIgnored {
    pub phone: Phone,
    pub reason: IgnoreReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffPaged {
    pub from: Phone,
    pub recipients: Vec<Phone>,
    pub failed: Vec<Phone>,
    pub fallback: Option<Fallback>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemindersSent {
    pub date: NaiveDate,
    pub recipients: Vec<Phone>,
    pub failed: Vec<Phone>,
    pub occurred_at: DateTime<Utc>,
}
