use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// When inbound contacts page staff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationStrategy {
    /// Page only on the first contact of a conversation.
    #[default]
    Thread,
    /// Page on every inbound contact.
    Always,
}

impl NotificationStrategy {
    pub fn should_notify(&self, is_new_thread: bool) -> bool {
        is_new_thread || *self == Self::Always
    }
}

impl std::str::FromStr for NotificationStrategy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "THREAD" => Ok(Self::Thread),
            "ALWAYS" => Ok(Self::Always),
            other => Err(DomainError::UnknownStrategy(other.to_string())),
        }
    }
}

impl std::fmt::Display for NotificationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Thread => f.write_str("THREAD"),
            Self::Always => f.write_str("ALWAYS"),
        }
    }
}
