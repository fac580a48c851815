pub mod fallback;
pub mod reminder;
pub mod window;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::ScheduleEntryId;
use crate::phone::Phone;

pub use fallback::{resolve_on_call, Fallback, OnCallResolution, ScheduleLookup};
pub use reminder::reminder_recipients;
pub use window::TimeWindow;

/// Day numbering used by the schedule store: 0 = Sunday .. 6 = Saturday.
pub fn weekday_from_index(index: u8) -> Result<Weekday, DomainError> {
    match index {
        0 => Ok(Weekday::Sun),
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        other => Err(DomainError::InvalidDayOfWeek(other)),
    }
}

pub fn weekday_index(day: Weekday) -> u8 {
    day.num_days_from_sunday() as u8
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    Always,
    /// Repeats every week on `day`, never before `effective_from`.
    Weekly {
        day: Weekday,
        effective_from: NaiveDate,
    },
    Once {
        date: NaiveDate,
    },
}

impl Recurrence {
    /// Builds a recurrence from the flat flags a schedule record carries.
    pub fn from_flags(
        always: bool,
        recurring: bool,
        day_of_week: Option<u8>,
        date: Option<NaiveDate>,
    ) -> Result<Self, DomainError> {
        match (always, recurring) {
            (true, true) => Err(DomainError::AmbiguousScheduleKind),
            (true, false) => Ok(Self::Always),
            (false, true) => match (day_of_week, date) {
                (Some(day), Some(effective_from)) => Ok(Self::Weekly {
                    day: weekday_from_index(day)?,
                    effective_from,
                }),
                _ => Err(DomainError::AmbiguousScheduleKind),
            },
            (false, false) => match date {
                Some(date) => Ok(Self::Once { date }),
                None => Err(DomainError::AmbiguousScheduleKind),
            },
        }
    }

    /// Day-granularity applicability, ignoring the time window.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        match self {
            Self::Always => true,
            Self::Weekly {
                day,
                effective_from,
            } => date.weekday() == *day && date >= *effective_from,
            Self::Once { date: on } => date == *on,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    id: ScheduleEntryId,
    phone: Phone,
    window: TimeWindow,
    recurrence: Recurrence,
}

impl ScheduleEntry {
    pub fn new(phone: Phone, window: TimeWindow, recurrence: Recurrence) -> Self {
        Self {
            id: ScheduleEntryId::new(),
            phone,
            window,
            recurrence,
        }
    }

    /// Whether this entry puts its phone on call at the given local instant.
    /// `Always` entries match regardless of their window.
    pub fn matches_at(&self, local: NaiveDateTime) -> bool {
        match self.recurrence {
            Recurrence::Always => true,
            _ => self.recurrence.applies_on(local.date()) && self.window.contains(local.time()),
        }
    }

    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.recurrence.applies_on(date)
    }

    pub fn id(&self) -> &ScheduleEntryId {
        &self.id
    }

    pub fn phone(&self) -> &Phone {
        &self.phone
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn recurrence(&self) -> &Recurrence {
        &self.recurrence
    }

    pub fn is_always(&self) -> bool {
        matches!(self.recurrence, Recurrence::Always)
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self.recurrence, Recurrence::Weekly { .. })
    }

    pub fn day_of_week(&self) -> Option<u8> {
        match self.recurrence {
            Recurrence::Weekly { day, .. } => Some(weekday_index(day)),
            _ => None,
        }
    }

    /// One-off date, or a weekly entry's effective-start date.
    pub fn date(&self) -> Option<NaiveDate> {
        match self.recurrence {
            Recurrence::Always => None,
            Recurrence::Weekly { effective_from, .. } => Some(effective_from),
            Recurrence::Once { date } => Some(date),
        }
    }
}

/// Entries with an on-call block on `date`, at day granularity.
pub fn entries_on(entries: &[ScheduleEntry], date: NaiveDate) -> Vec<ScheduleEntry> {
    entries
        .iter()
        .filter(|e| e.applies_on(date))
        .cloned()
        .collect()
}
