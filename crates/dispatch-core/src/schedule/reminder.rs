use std::collections::BTreeSet;

use crate::phone::Phone;
use crate::schedule::ScheduleEntry;

/// Phones that start an on-call block today, plus every phone holding an
/// `always` entry. Staff continuing a block from yesterday are skipped.
pub fn reminder_recipients(
    today: &[ScheduleEntry],
    yesterday: &[ScheduleEntry],
) -> BTreeSet<Phone> {
    let yesterday: BTreeSet<&Phone> = yesterday.iter().map(|e| e.phone()).collect();
    let always: BTreeSet<&Phone> = today
        .iter()
        .filter(|e| e.is_always())
        .map(|e| e.phone())
        .collect();

    today
        .iter()
        .map(|e| e.phone())
        .filter(|p| always.contains(p) || !yesterday.contains(p))
        .cloned()
        .collect()
}
