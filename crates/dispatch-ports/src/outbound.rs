use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use dispatch_core::conversation::ConversationThread;
use dispatch_core::events::DomainEvent;
use dispatch_core::ids::ScheduleEntryId;
use dispatch_core::phone::Phone;
use dispatch_core::schedule::ScheduleEntry;
use dispatch_core::staff::StaffMember;

use crate::error::{NotifyError, PortError};
use crate::types::{PhoneNumberConfig, SendReceipt, ThreadInsert};

#[async_trait]
pub trait StaffRepository: Send + Sync {
    async fn list_active_phones(&self) -> Result<Vec<Phone>, PortError>;
    async fn find_by_phone(&self, phone: &Phone) -> Result<Option<StaffMember>, PortError>;
    async fn list_all(&self) -> Result<Vec<StaffMember>, PortError>;
    async fn save(&self, member: &StaffMember) -> Result<(), PortError>;
    /// Returns whether a member was removed.
    async fn delete_by_phone(&self, phone: &Phone) -> Result<bool, PortError>;
}

#[async_trait]
pub trait BlocklistRepository: Send + Sync {
    async fn is_blocked(&self, phone: &Phone) -> Result<bool, PortError>;
    async fn list_blocked(&self) -> Result<Vec<Phone>, PortError>;
    /// Returns whether the number was newly blocked.
    async fn block(&self, phone: &Phone) -> Result<bool, PortError>;
    /// Returns whether the number was on the list.
    async fn unblock(&self, phone: &Phone) -> Result<bool, PortError>;
}

#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn count(&self) -> Result<u64, PortError>;
    /// Entries putting a phone on call at a local date-time.
    async fn find_matching_at(&self, local: NaiveDateTime) -> Result<Vec<ScheduleEntry>, PortError>;
    /// Entries with a block on a local date, ignoring time of day.
    async fn find_for_date(&self, date: NaiveDate) -> Result<Vec<ScheduleEntry>, PortError>;
    async fn list_all(&self) -> Result<Vec<ScheduleEntry>, PortError>;
    async fn save(&self, entry: &ScheduleEntry) -> Result<(), PortError>;
    async fn delete(&self, id: &ScheduleEntryId) -> Result<bool, PortError>;
}

#[async_trait]
pub trait ThreadRepository: Send + Sync {
    async fn find_open(&self, phone: &Phone) -> Result<Option<ConversationThread>, PortError>;
    /// Inserts an open thread unless one already exists for the phone.
    async fn insert_open(&self, thread: &ConversationThread) -> Result<ThreadInsert, PortError>;
    async fn save(&self, thread: &ConversationThread) -> Result<(), PortError>;
}

#[async_trait]
pub trait ConfigRepository: Send + Sync {
    /// `NotFound` until both numbers have been stored.
    async fn phone_numbers(&self) -> Result<PhoneNumberConfig, PortError>;
    async fn set_phone_numbers(&self, config: &PhoneNumberConfig) -> Result<(), PortError>;
    async fn reminder_last_run(&self) -> Result<Option<NaiveDate>, PortError>;
    async fn set_reminder_last_run(&self, date: NaiveDate) -> Result<(), PortError>;
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, from: &Phone, to: &Phone, body: &str) -> Result<SendReceipt, NotifyError>;
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), PortError>;
}
