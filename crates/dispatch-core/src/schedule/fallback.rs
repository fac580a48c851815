use std::collections::BTreeSet;

use serde::Serialize;

use crate::phone::Phone;
use crate::schedule::ScheduleEntry;

/// Why the resolver paged the whole active roster instead of the scheduled set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    ScheduleUnavailable,
    NoScheduleConfigured,
    NoEntryMatched,
    NoActiveOnCall,
}

impl Fallback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScheduleUnavailable => "schedule_unavailable",
            Self::NoScheduleConfigured => "no_schedule_configured",
            Self::NoEntryMatched => "no_entry_matched",
            Self::NoActiveOnCall => "no_active_on_call",
        }
    }
}

/// What the schedule store returned for one instant.
#[derive(Debug, Clone)]
pub enum ScheduleLookup {
    Unavailable,
    Loaded {
        configured: u64,
        matched: Vec<ScheduleEntry>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnCallResolution {
    phones: BTreeSet<Phone>,
    fallback: Option<Fallback>,
}

impl OnCallResolution {
    pub fn phones(&self) -> &BTreeSet<Phone> {
        &self.phones
    }

    pub fn into_phones(self) -> Vec<Phone> {
        self.phones.into_iter().collect()
    }

    pub fn fallback(&self) -> Option<Fallback> {
        self.fallback
    }

    pub fn is_empty(&self) -> bool {
        self.phones.is_empty()
    }
}

type Tier = (Fallback, fn(&ScheduleLookup, &BTreeSet<Phone>) -> bool);

/// Evaluated in order; the first tier that holds replaces the result with the
/// active roster.
const FALLBACK_TIERS: [Tier; 4] = [
    (Fallback::ScheduleUnavailable, schedule_unavailable),
    (Fallback::NoScheduleConfigured, no_schedule_configured),
    (Fallback::NoEntryMatched, no_entry_matched),
    (Fallback::NoActiveOnCall, no_active_on_call),
];

fn schedule_unavailable(lookup: &ScheduleLookup, _: &BTreeSet<Phone>) -> bool {
    matches!(lookup, ScheduleLookup::Unavailable)
}

fn no_schedule_configured(lookup: &ScheduleLookup, _: &BTreeSet<Phone>) -> bool {
    matches!(lookup, ScheduleLookup::Loaded { configured: 0, .. })
}

fn no_entry_matched(lookup: &ScheduleLookup, _: &BTreeSet<Phone>) -> bool {
    matches!(lookup, ScheduleLookup::Loaded { matched, .. } if matched.is_empty())
}

fn no_active_on_call(_: &ScheduleLookup, on_call: &BTreeSet<Phone>) -> bool {
    on_call.is_empty()
}

/// Intersects the matched entries with the active roster, then applies the
/// fallback tiers. Never empty while `active` is non-empty.
pub fn resolve_on_call(active: &[Phone], lookup: &ScheduleLookup) -> OnCallResolution {
    let baseline: BTreeSet<Phone> = active.iter().cloned().collect();

    let on_call: BTreeSet<Phone> = match lookup {
        ScheduleLookup::Unavailable => BTreeSet::new(),
        ScheduleLookup::Loaded { matched, .. } => matched
            .iter()
            .map(|e| e.phone().clone())
            .filter(|p| baseline.contains(p))
            .collect(),
    };

    for (fallback, holds) in FALLBACK_TIERS {
        if holds(lookup, &on_call) {
            return OnCallResolution {
                phones: baseline,
                fallback: Some(fallback),
            };
        }
    }

    OnCallResolution {
        phones: on_call,
        fallback: None,
    }
}
