//! Bulk slot generation for the evening clinic.

use crate::constants::{CLINIC_FIRST_SLOT, CLINIC_LAST_SLOT, CLINIC_SLOT_MINUTES};
use crate::slots::{SlotKey, SlotStore};
use crate::BookingResult;
use careslot_ids::DoctorId;
use careslot_types::{SlotDate, SlotTime};
use chrono::Weekday;

/// Clinic start times from 17:00 to 22:00 inclusive, every 30 minutes.
pub fn clinic_times() -> BookingResult<Vec<SlotTime>> {
    let first = CLINIC_FIRST_SLOT.0 * 60 + CLINIC_FIRST_SLOT.1;
    let last = CLINIC_LAST_SLOT.0 * 60 + CLINIC_LAST_SLOT.1;

    (first..=last)
        .step_by(CLINIC_SLOT_MINUTES as usize)
        .map(|minutes| SlotTime::from_hm(minutes / 60, minutes % 60).map_err(Into::into))
        .collect()
}

/// Publishes clinic slots on each of the `days` days after `from`, skipping Fridays.
///
/// Slots that already exist are left as they are. Returns the keys of the slots added.
pub fn seed_slots(
    store: &SlotStore,
    doctor_id: DoctorId,
    from: SlotDate,
    days: u32,
) -> BookingResult<Vec<SlotKey>> {
    let times = clinic_times()?;
    let mut added = Vec::new();

    for offset in 1..=days {
        let Some(date) = from.plus_days(offset) else {
            break;
        };
        if date.weekday() == Weekday::Fri {
            continue;
        }
        for time in &times {
            let key = SlotKey::new(doctor_id, date, *time);
            if store.insert_if_absent(key) {
                added.push(key);
            }
        }
    }

    tracing::info!(doctor = %doctor_id, %from, days, added = added.len(), "seeded clinic slots");
    Ok(added)
}
