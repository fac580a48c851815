pub mod strategy;
pub mod thread;

use serde::Serialize;

pub use strategy::NotificationStrategy;
pub use thread::{ConversationThread, ThreadStatus};

/// Why an inbound contact was dropped before reaching the thread store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    Blocked,
    Staff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactOutcome {
    pub is_new_thread: bool,
    pub should_notify_staff: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactDisposition {
    Ignored(IgnoreReason),
    Accepted(ContactOutcome),
}

impl ContactDisposition {
    pub fn should_notify_staff(&self) -> bool {
        matches!(
            self,
            Self::Accepted(ContactOutcome {
                should_notify_staff: true,
                ..
            })
        )
    }
}

/// Screening and paging rules for inbound contacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactPolicy {
    pub strategy: NotificationStrategy,
    /// Lets staff phones go through the public flow, for self-testing.
    pub skip_staff_ignore: bool,
}

impl ContactPolicy {
    pub fn screen(&self, blocked: bool, active_staff: bool) -> Option<IgnoreReason> {
        if blocked {
            return Some(IgnoreReason::Blocked);
        }
        if active_staff && !self.skip_staff_ignore {
            return Some(IgnoreReason::Staff);
        }
        None
    }

    pub fn outcome(&self, is_new_thread: bool) -> ContactOutcome {
        ContactOutcome {
            is_new_thread,
            should_notify_staff: self.strategy.should_notify(is_new_thread),
        }
    }
}
