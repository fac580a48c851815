use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

use dispatch_core::phone::Phone;
use dispatch_core::schedule::{resolve_on_call, OnCallResolution, ScheduleEntry, ScheduleLookup};
use dispatch_ports::outbound::{ScheduleRepository, StaffRepository};

use crate::error::AppError;

pub struct OnCallResolver<St, Sc>
where
    St: StaffRepository,
    Sc: ScheduleRepository,
{
    staff: St,
    schedules: Sc,
    timezone: Tz,
}

impl<St, Sc> OnCallResolver<St, Sc>
where
    St: StaffRepository,
    Sc: ScheduleRepository,
{
    pub fn new(staff: St, schedules: Sc, timezone: Tz) -> Self {
        Self {
            staff,
            schedules,
            timezone,
        }
    }

    /// Staff phones to page at `at`. Only a roster failure is an error;
    /// schedule trouble degrades to the whole active roster.
    pub async fn resolve_at(&self, at: DateTime<Utc>) -> Result<OnCallResolution, AppError> {
        let active = self.staff.list_active_phones().await?;
        let local = at.with_timezone(&self.timezone).naive_local();
        let lookup = self.lookup(local).await;
        let resolution = resolve_on_call(&active, &lookup);

        match resolution.fallback() {
            Some(fallback) => tracing::info!(
                fallback = fallback.as_str(),
                active = active.len(),
                "paging all active staff"
            ),
            None => tracing::info!(
                on_call = resolution.phones().len(),
                active = active.len(),
                "filtered to on-call staff"
            ),
        }

        Ok(resolution)
    }

    async fn lookup(&self, local: NaiveDateTime) -> ScheduleLookup {
        let configured = match self.schedules.count().await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "schedule count failed");
                return ScheduleLookup::Unavailable;
            }
        };
        if configured == 0 {
            return ScheduleLookup::Loaded {
                configured,
                matched: vec![],
            };
        }

        match self.schedules.find_matching_at(local).await {
            Ok(entries) => ScheduleLookup::Loaded {
                configured,
                matched: entries.into_iter().filter(|e| e.matches_at(local)).collect(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "schedule query failed");
                ScheduleLookup::Unavailable
            }
        }
    }

    /// Entries with an on-call block on a local date. Errors propagate.
    pub async fn entries_for_date(&self, date: NaiveDate) -> Result<Vec<ScheduleEntry>, AppError> {
        let entries = self.schedules.find_for_date(date).await?;
        Ok(entries.into_iter().filter(|e| e.applies_on(date)).collect())
    }

    pub async fn active_phones(&self) -> Result<Vec<Phone>, AppError> {
        Ok(self.staff.list_active_phones().await?)
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }
}
