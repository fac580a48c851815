use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::ThreadId;
use crate::phone::Phone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreadStatus {
    Open,
    Closed,
}

impl ThreadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(Self::Open),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationThread {
    id: ThreadId,
    phone: Phone,
    status: ThreadStatus,
    created_at: DateTime<Utc>,
}

impl ConversationThread {
    pub fn open(phone: Phone, now: DateTime<Utc>) -> Self {
        Self {
            id: ThreadId::new(),
            phone,
            status: ThreadStatus::Open,
            created_at: now,
        }
    }

    pub fn from_parts(
        id: ThreadId,
        phone: Phone,
        status: ThreadStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            phone,
            status,
            created_at,
        }
    }

    pub fn close(&mut self) -> Result<(), DomainError> {
        if self.status == ThreadStatus::Closed {
            return Err(DomainError::ThreadAlreadyClosed);
        }
        self.status = ThreadStatus::Closed;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.status == ThreadStatus::Open
    }

    pub fn id(&self) -> &ThreadId {
        &self.id
    }

    pub fn phone(&self) -> &Phone {
        &self.phone
    }

    pub fn status(&self) -> ThreadStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
