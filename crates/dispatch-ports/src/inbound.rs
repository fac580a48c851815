use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use dispatch_core::phone::Phone;
use dispatch_core::schedule::ScheduleEntry;
use dispatch_core::staff::StaffMember;

use crate::error::HandleError;
use crate::types::{
    CallStatusUpdate, InboundCall, InboundMessage, NewScheduleEntry, OnCallNow, ReminderReport,
    Reply,
};

#[async_trait]
pub trait ContactReceiver: Send + Sync {
    async fn receive_message(
        &self,
        message: InboundMessage,
        now: DateTime<Utc>,
    ) -> Result<Reply, HandleError>;
    async fn receive_call(&self, call: InboundCall, now: DateTime<Utc>)
        -> Result<Reply, HandleError>;
    async fn receive_call_status(
        &self,
        update: CallStatusUpdate,
        now: DateTime<Utc>,
    ) -> Result<Reply, HandleError>;
}

#[async_trait]
pub trait ReminderRunner: Send + Sync {
    async fn run_daily_pass(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ReminderReport, HandleError>;
}

#[async_trait]
pub trait RosterAdmin: Send + Sync {
    async fn list_staff(&self) -> Result<Vec<StaffMember>, HandleError>;
    async fn add_staff(&self, phone: Phone) -> Result<StaffMember, HandleError>;
    async fn remove_staff(&self, phone: &Phone) -> Result<(), HandleError>;
    async fn list_blocked(&self) -> Result<Vec<Phone>, HandleError>;
    async fn block_number(&self, phone: Phone) -> Result<(), HandleError>;
    async fn unblock_number(&self, phone: &Phone) -> Result<(), HandleError>;
    async fn list_schedule(&self) -> Result<Vec<ScheduleEntry>, HandleError>;
    async fn add_schedule_entry(
        &self,
        entry: NewScheduleEntry,
        now: DateTime<Utc>,
    ) -> Result<ScheduleEntry, HandleError>;
    async fn remove_schedule_entry(&self, id: &str) -> Result<(), HandleError>;
    async fn close_thread(&self, phone: &Phone) -> Result<(), HandleError>;
    async fn on_call_now(&self, now: DateTime<Utc>) -> Result<OnCallNow, HandleError>;
}
