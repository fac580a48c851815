//! In-memory fakes of the outbound ports, shared by the service tests.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use dispatch_core::conversation::ConversationThread;
use dispatch_core::events::DomainEvent;
use dispatch_core::ids::ScheduleEntryId;
use dispatch_core::phone::Phone;
use dispatch_core::schedule::ScheduleEntry;
use dispatch_core::staff::StaffMember;
use dispatch_ports::error::{NotifyError, PortError};
use dispatch_ports::outbound::{
    BlocklistRepository, ConfigRepository, EventPublisher, MessageSender, ScheduleRepository,
    StaffRepository, ThreadRepository,
};
use dispatch_ports::types::{PhoneNumberConfig, SendReceipt, ThreadInsert};

pub fn phone(n: &str) -> Phone {
    Phone::new(n).unwrap()
}

pub fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub const INBOUND: &str = "+15105550100";
pub const OUTBOUND: &str = "+15105550199";

#[derive(Default)]
pub struct State {
    pub staff: Vec<StaffMember>,
    pub blocked: BTreeSet<Phone>,
    pub schedules: Vec<ScheduleEntry>,
    pub threads: Vec<ConversationThread>,
    pub numbers: Option<PhoneNumberConfig>,
    pub reminder_last_run: Option<NaiveDate>,
    pub events: Vec<DomainEvent>,
    pub fail_schedules: bool,
    pub fail_staff: bool,
    pub fail_events: bool,
    /// Makes `find_open` miss, simulating a concurrent creator.
    pub hide_open_threads: bool,
}

#[derive(Clone, Default)]
pub struct FakeStore {
    pub state: Arc<Mutex<State>>,
}

impl FakeStore {
    pub fn with_numbers() -> Self {
        let store = Self::default();
        store.state.lock().unwrap().numbers = Some(PhoneNumberConfig {
            inbound: phone(INBOUND),
            outbound: phone(OUTBOUND),
        });
        store
    }

    pub fn add_staff(&self, n: &str, active: bool) {
        let mut member = StaffMember::new(phone(n));
        if !active {
            member.deactivate();
        }
        self.state.lock().unwrap().staff.push(member);
    }

    pub fn add_entry(&self, entry: ScheduleEntry) {
        self.state.lock().unwrap().schedules.push(entry);
    }

    pub fn block(&self, n: &str) {
        self.state.lock().unwrap().blocked.insert(phone(n));
    }

    pub fn open_threads(&self, n: &str) -> usize {
        let target = phone(n);
        self.state
            .lock()
            .unwrap()
            .threads
            .iter()
            .filter(|t| t.phone() == &target && t.is_open())
            .count()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.state
            .lock()
            .unwrap()
            .events
            .iter()
            .map(|e| e.event_type())
            .collect()
    }
}

fn unavailable() -> PortError {
    PortError::Connection("store unreachable".into())
}

#[async_trait]
impl StaffRepository for FakeStore {
    async fn list_active_phones(&self) -> Result<Vec<Phone>, PortError> {
        let state = self.state.lock().unwrap();
        if state.fail_staff {
            return Err(unavailable());
        }
        Ok(state
            .staff
            .iter()
            .filter(|m| m.is_active())
            .map(|m| m.phone().clone())
            .collect())
    }

    async fn find_by_phone(&self, phone: &Phone) -> Result<Option<StaffMember>, PortError> {
        let state = self.state.lock().unwrap();
        if state.fail_staff {
            return Err(unavailable());
        }
        Ok(state.staff.iter().find(|m| m.phone() == phone).cloned())
    }

    async fn list_all(&self) -> Result<Vec<StaffMember>, PortError> {
        Ok(self.state.lock().unwrap().staff.clone())
    }

    async fn save(&self, member: &StaffMember) -> Result<(), PortError> {
        let mut state = self.state.lock().unwrap();
        if let Some(pos) = state.staff.iter().position(|m| m.id() == member.id()) {
            state.staff[pos] = member.clone();
        } else if state.staff.iter().any(|m| m.phone() == member.phone()) {
            return Err(PortError::Conflict("phone number already exists".into()));
        } else {
            state.staff.push(member.clone());
        }
        Ok(())
    }

    async fn delete_by_phone(&self, phone: &Phone) -> Result<bool, PortError> {
        let mut state = self.state.lock().unwrap();
        let before = state.staff.len();
        state.staff.retain(|m| m.phone() != phone);
        Ok(state.staff.len() != before)
    }
}

#[async_trait]
impl BlocklistRepository for FakeStore {
    async fn is_blocked(&self, phone: &Phone) -> Result<bool, PortError> {
        Ok(self.state.lock().unwrap().blocked.contains(phone))
    }

    async fn list_blocked(&self) -> Result<Vec<Phone>, PortError> {
        Ok(self.state.lock().unwrap().blocked.iter().cloned().collect())
    }

    async fn block(&self, phone: &Phone) -> Result<bool, PortError> {
        Ok(self.state.lock().unwrap().blocked.insert(phone.clone()))
    }

    async fn unblock(&self, phone: &Phone) -> Result<bool, PortError> {
        Ok(self.state.lock().unwrap().blocked.remove(phone))
    }
}

#[async_trait]
impl ScheduleRepository for FakeStore {
    async fn count(&self) -> Result<u64, PortError> {
        let state = self.state.lock().unwrap();
        if state.fail_schedules {
            return Err(unavailable());
        }
        Ok(state.schedules.len() as u64)
    }

    async fn find_matching_at(
        &self,
        local: NaiveDateTime,
    ) -> Result<Vec<ScheduleEntry>, PortError> {
        let state = self.state.lock().unwrap();
        if state.fail_schedules {
            return Err(unavailable());
        }
        Ok(state
            .schedules
            .iter()
            .filter(|e| e.matches_at(local))
            .cloned()
            .collect())
    }

    async fn find_for_date(&self, date: NaiveDate) -> Result<Vec<ScheduleEntry>, PortError> {
        let state = self.state.lock().unwrap();
        if state.fail_schedules {
            return Err(unavailable());
        }
        Ok(state
            .schedules
            .iter()
            .filter(|e| e.applies_on(date))
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<ScheduleEntry>, PortError> {
        Ok(self.state.lock().unwrap().schedules.clone())
    }

    async fn save(&self, entry: &ScheduleEntry) -> Result<(), PortError> {
        self.state.lock().unwrap().schedules.push(entry.clone());
        Ok(())
    }

    async fn delete(&self, id: &ScheduleEntryId) -> Result<bool, PortError> {
        let mut state = self.state.lock().unwrap();
        let before = state.schedules.len();
        state.schedules.retain(|e| e.id() != id);
        Ok(state.schedules.len() != before)
    }
}

#[async_trait]
impl ThreadRepository for FakeStore {
    async fn find_open(&self, phone: &Phone) -> Result<Option<ConversationThread>, PortError> {
        let state = self.state.lock().unwrap();
        if state.hide_open_threads {
            return Ok(None);
        }
        Ok(state
            .threads
            .iter()
            .find(|t| t.phone() == phone && t.is_open())
            .cloned())
    }

    async fn insert_open(&self, thread: &ConversationThread) -> Result<ThreadInsert, PortError> {
        let mut state = self.state.lock().unwrap();
        if state
            .threads
            .iter()
            .any(|t| t.phone() == thread.phone() && t.is_open())
        {
            return Ok(ThreadInsert::AlreadyOpen);
        }
        state.threads.push(thread.clone());
        Ok(ThreadInsert::Created)
    }

    async fn save(&self, thread: &ConversationThread) -> Result<(), PortError> {
        let mut state = self.state.lock().unwrap();
        if let Some(pos) = state.threads.iter().position(|t| t.id() == thread.id()) {
            state.threads[pos] = thread.clone();
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigRepository for FakeStore {
    async fn phone_numbers(&self) -> Result<PhoneNumberConfig, PortError> {
        self.state
            .lock()
            .unwrap()
            .numbers
            .clone()
            .ok_or(PortError::NotFound)
    }

    async fn set_phone_numbers(&self, config: &PhoneNumberConfig) -> Result<(), PortError> {
        self.state.lock().unwrap().numbers = Some(config.clone());
        Ok(())
    }

    async fn reminder_last_run(&self) -> Result<Option<NaiveDate>, PortError> {
        Ok(self.state.lock().unwrap().reminder_last_run)
    }

    async fn set_reminder_last_run(&self, date: NaiveDate) -> Result<(), PortError> {
        self.state.lock().unwrap().reminder_last_run = Some(date);
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for FakeStore {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), PortError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_events {
            return Err(unavailable());
        }
        state.events.extend(events);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub from: Phone,
    pub to: Phone,
    pub body: String,
}

#[derive(Clone, Default)]
pub struct FakeSender {
    pub sent: Arc<Mutex<Vec<SentMessage>>>,
    pub failing: Arc<Mutex<BTreeSet<Phone>>>,
}

impl FakeSender {
    pub fn fail_for(&self, n: &str) {
        self.failing.lock().unwrap().insert(phone(n));
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn recipients(&self) -> Vec<Phone> {
        self.sent().into_iter().map(|m| m.to).collect()
    }
}

#[async_trait]
impl MessageSender for FakeSender {
    async fn send(&self, from: &Phone, to: &Phone, body: &str) -> Result<SendReceipt, NotifyError> {
        if self.failing.lock().unwrap().contains(to) {
            return Err(NotifyError::DeliveryFailed("carrier rejected".into()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentMessage {
            from: from.clone(),
            to: to.clone(),
            body: body.to_string(),
        });
        Ok(SendReceipt {
            external_id: Some(format!("SM{}", sent.len())),
        })
    }
}
