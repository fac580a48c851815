use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use dispatch_core::phone::Phone;
use dispatch_core::schedule::Fallback;

/// Provider-facing numbers: caller ID for live transfers and sender for SMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumberConfig {
    pub inbound: Phone,
    pub outbound: Phone,
}

#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub from: Phone,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct InboundCall {
    pub from: Phone,
    pub call_sid: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialStatus {
    Completed,
    Answered,
    Busy,
    NoAnswer,
    Failed,
    Canceled,
    Other(String),
}

impl DialStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "completed" => Self::Completed,
            "answered" => Self::Answered,
            "busy" => Self::Busy,
            "no-answer" => Self::NoAnswer,
            "failed" => Self::Failed,
            "canceled" => Self::Canceled,
            other => Self::Other(other.to_string()),
        }
    }

    /// A staff member picked up the transferred call.
    pub fn was_answered(&self) -> bool {
        matches!(self, Self::Completed | Self::Answered)
    }
}

#[derive(Debug, Clone)]
pub struct CallStatusUpdate {
    pub from: Phone,
    pub call_sid: String,
    pub dial_status: DialStatus,
}

/// Live transfer of a caller to the on-call set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialPlan {
    pub greeting: String,
    pub caller_id: Phone,
    pub numbers: Vec<Phone>,
    pub timeout_secs: u32,
    /// The public caller, echoed back by the provider's status callback.
    pub caller: Phone,
}

/// Caller-facing reply to an inbound event, rendered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Empty,
    Message(String),
    Say(String),
    Dial(DialPlan),
}

/// Provider metadata for one accepted send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent { external_id: Option<String> },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub recipient: Phone,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

/// Per-recipient outcome of one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub deliveries: Vec<Delivery>,
}

impl DispatchReport {
    pub fn sent(&self) -> Vec<Phone> {
        self.deliveries
            .iter()
            .filter(|d| matches!(d.status, DeliveryStatus::Sent { .. }))
            .map(|d| d.recipient.clone())
            .collect()
    }

    pub fn failed(&self) -> Vec<Phone> {
        self.deliveries
            .iter()
            .filter(|d| matches!(d.status, DeliveryStatus::Failed { .. }))
            .map(|d| d.recipient.clone())
            .collect()
    }

    pub fn attempted(&self) -> usize {
        self.deliveries.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReminderReport {
    AlreadyRan { date: NaiveDate },
    NothingScheduled { date: NaiveDate },
    NoNewBlocks { date: NaiveDate },
    Sent { date: NaiveDate, report: DispatchReport },
}

/// Result of inserting an open thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadInsert {
    Created,
    /// Another open thread for the same phone already exists.
    AlreadyOpen,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnCallNow {
    pub phones: Vec<Phone>,
    pub fallback: Option<Fallback>,
}

/// Admin request for a new schedule entry, in the store's flat shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewScheduleEntry {
    pub phone_number: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub day_of_week: Option<u8>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default)]
    pub always: bool,
}
