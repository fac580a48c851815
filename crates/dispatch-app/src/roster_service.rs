use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use dispatch_core::error::DomainError;
use dispatch_core::ids::ScheduleEntryId;
use dispatch_core::phone::Phone;
use dispatch_core::schedule::{Recurrence, ScheduleEntry, TimeWindow};
use dispatch_core::staff::StaffMember;
use dispatch_ports::error::{HandleError, PortError};
use dispatch_ports::inbound::RosterAdmin;
use dispatch_ports::outbound::{
    BlocklistRepository, ScheduleRepository, StaffRepository, ThreadRepository,
};
use dispatch_ports::types::{NewScheduleEntry, OnCallNow};

use crate::error::{within_budget, AppError};
use crate::oncall_service::OnCallResolver;

/// Builds a schedule entry from an admin request. A recurring entry without
/// a date takes effect `today`; an `always` entry without times covers the
/// whole day.
pub fn parse_new_entry(req: NewScheduleEntry, today: NaiveDate) -> Result<ScheduleEntry, AppError> {
    let phone = Phone::new(&req.phone_number)?;

    let window = match (req.start_time.as_deref(), req.end_time.as_deref()) {
        (Some(start), Some(end)) => TimeWindow::parse(start, end)?,
        (None, None) if req.always => TimeWindow::whole_day(),
        _ => {
            return Err(AppError::Invalid(
                "start_time and end_time are required".into(),
            ))
        }
    };

    let date = match req.date.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Some(
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| DomainError::InvalidDate(s.to_string()))?,
        ),
        _ if req.recurring => Some(today),
        _ => None,
    };

    let recurrence = Recurrence::from_flags(req.always, req.recurring, req.day_of_week, date)?;
    Ok(ScheduleEntry::new(phone, window, recurrence))
}

/// Maintenance of staff, blocklist, schedule and threads.
pub struct RosterService<St, Bl, Sc, Th>
where
    St: StaffRepository + Clone,
    Bl: BlocklistRepository,
    Sc: ScheduleRepository + Clone,
    Th: ThreadRepository,
{
    staff: St,
    blocklist: Bl,
    schedules: Sc,
    threads: Th,
    resolver: OnCallResolver<St, Sc>,
    timeout: Duration,
}

impl<St, Bl, Sc, Th> RosterService<St, Bl, Sc, Th>
where
    St: StaffRepository + Clone,
    Bl: BlocklistRepository,
    Sc: ScheduleRepository + Clone,
    Th: ThreadRepository,
{
    pub fn new(
        staff: St,
        blocklist: Bl,
        schedules: Sc,
        threads: Th,
        timezone: Tz,
        timeout: Duration,
    ) -> Self {
        Self {
            resolver: OnCallResolver::new(staff.clone(), schedules.clone(), timezone),
            staff,
            blocklist,
            schedules,
            threads,
            timeout,
        }
    }

    pub async fn add_member(&self, phone: Phone) -> Result<StaffMember, AppError> {
        within_budget(self.timeout, async {
            if self.staff.find_by_phone(&phone).await?.is_some() {
                return Err(AppError::from(PortError::Conflict(
                    "phone number already exists".into(),
                )));
            }
            let member = StaffMember::new(phone);
            self.staff.save(&member).await?;
            tracing::info!(phone = %member.phone(), "staff member added");
            Ok(member)
        })
        .await
    }

    pub async fn remove_member(&self, phone: &Phone) -> Result<(), AppError> {
        within_budget(self.timeout, async {
            if !self.staff.delete_by_phone(phone).await? {
                return Err(AppError::from(PortError::NotFound));
            }
            tracing::info!(phone = %phone, "staff member removed");
            Ok(())
        })
        .await
    }

    pub async fn block(&self, phone: Phone) -> Result<(), AppError> {
        within_budget(self.timeout, async {
            if !self.blocklist.block(&phone).await? {
                return Err(AppError::from(PortError::Conflict(
                    "number already blocked".into(),
                )));
            }
            tracing::info!(phone = %phone, "number blocked");
            Ok(())
        })
        .await
    }

    pub async fn unblock(&self, phone: &Phone) -> Result<(), AppError> {
        within_budget(self.timeout, async {
            if !self.blocklist.unblock(phone).await? {
                return Err(AppError::from(PortError::NotFound));
            }
            tracing::info!(phone = %phone, "number unblocked");
            Ok(())
        })
        .await
    }

    pub async fn add_entry(
        &self,
        req: NewScheduleEntry,
        now: DateTime<Utc>,
    ) -> Result<ScheduleEntry, AppError> {
        let entry = parse_new_entry(req, self.resolver.today(now))?;
        within_budget(self.timeout, async {
            self.schedules.save(&entry).await?;
            Ok::<_, AppError>(())
        })
        .await?;
        tracing::info!(id = %entry.id(), phone = %entry.phone(), "schedule entry added");
        Ok(entry)
    }

    pub async fn remove_entry(&self, id: &str) -> Result<(), AppError> {
        let id = ScheduleEntryId::parse(id)?;
        within_budget(self.timeout, async {
            if !self.schedules.delete(&id).await? {
                return Err(AppError::from(PortError::NotFound));
            }
            Ok(())
        })
        .await?;
        tracing::info!(id = %id, "schedule entry removed");
        Ok(())
    }

    /// Closes the open thread for a number so its next contact pages staff again.
    pub async fn close(&self, phone: &Phone) -> Result<(), AppError> {
        within_budget(self.timeout, async {
            let mut thread = self
                .threads
                .find_open(phone)
                .await?
                .ok_or(PortError::NotFound)?;
            thread.close()?;
            self.threads.save(&thread).await?;
            tracing::info!(phone = %phone, thread_id = %thread.id(), "thread closed");
            Ok::<_, AppError>(())
        })
        .await
    }

    pub async fn on_call(&self, now: DateTime<Utc>) -> Result<OnCallNow, AppError> {
        let resolution = within_budget(self.timeout, self.resolver.resolve_at(now)).await?;
        Ok(OnCallNow {
            fallback: resolution.fallback(),
            phones: resolution.into_phones(),
        })
    }
}

#[async_trait]
impl<St, Bl, Sc, Th> RosterAdmin for RosterService<St, Bl, Sc, Th>
where
    St: StaffRepository + Clone,
    Bl: BlocklistRepository,
    Sc: ScheduleRepository + Clone,
    Th: ThreadRepository,
{
    async fn list_staff(&self) -> Result<Vec<StaffMember>, HandleError> {
        Ok(self.staff.list_all().await.map_err(AppError::from)?)
    }

    async fn add_staff(&self, phone: Phone) -> Result<StaffMember, HandleError> {
        Ok(self.add_member(phone).await?)
    }

    async fn remove_staff(&self, phone: &Phone) -> Result<(), HandleError> {
        Ok(self.remove_member(phone).await?)
    }

    async fn list_blocked(&self) -> Result<Vec<Phone>, HandleError> {
        Ok(self.blocklist.list_blocked().await.map_err(AppError::from)?)
    }

    async fn block_number(&self, phone: Phone) -> Result<(), HandleError> {
        Ok(self.block(phone).await?)
    }

    async fn unblock_number(&self, phone: &Phone) -> Result<(), HandleError> {
        Ok(self.unblock(phone).await?)
    }

    async fn list_schedule(&self) -> Result<Vec<ScheduleEntry>, HandleError> {
        Ok(self.schedules.list_all().await.map_err(AppError::from)?)
    }

    async fn add_schedule_entry(
        &self,
        entry: NewScheduleEntry,
        now: DateTime<Utc>,
    ) -> Result<ScheduleEntry, HandleError> {
        Ok(self.add_entry(entry, now).await?)
    }

    async fn remove_schedule_entry(&self, id: &str) -> Result<(), HandleError> {
        Ok(self.remove_entry(id).await?)
    }

    async fn close_thread(&self, phone: &Phone) -> Result<(), HandleError> {
        Ok(self.close(phone).await?)
    }

    async fn on_call_now(&self, now: DateTime<Utc>) -> Result<OnCallNow, HandleError> {
        Ok(self.on_call(now).await?)
    }
}
