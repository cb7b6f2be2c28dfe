//! Slot Store.
//!
//! Each slot is an independently addressable record keyed by `(doctor, date, time)` and owns an
//! atomic booking counter. The outer lock only guards the *set* of slots: adding or removing a
//! slot takes it for writing, while reservations take it for reading just long enough to clone
//! the counter handle. Contention on a busy slot therefore never blocks bookings on other slots.
//!
//! The counter itself is only ever mutated through [`crate::capacity::CapacityEnforcer`].

use crate::capacity::SlotCounter;
use crate::constants::SLOT_CAPACITY;
use crate::{locks, BookingError, BookingResult};
use careslot_ids::DoctorId;
use careslot_types::{SlotDate, SlotTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Identity of a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    pub doctor_id: DoctorId,
    pub date: SlotDate,
    pub time: SlotTime,
}

impl SlotKey {
    pub fn new(doctor_id: DoctorId, date: SlotDate, time: SlotTime) -> Self {
        Self {
            doctor_id,
            date,
            time,
        }
    }
}

/// A slot together with its current booking count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Slot {
    pub date: SlotDate,
    pub time: SlotTime,
    /// Distinguishes this slot from earlier slots published at the same date and time.
    pub generation: u64,
    pub booked_count: u32,
}

/// A slot that can still take at least one booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AvailableSlot {
    pub date: SlotDate,
    pub time: SlotTime,
    pub available_spots: u32,
}

type DoctorSlots = BTreeMap<(SlotDate, SlotTime), Arc<SlotCounter>>;

#[derive(Debug)]
pub struct SlotStore {
    slots: RwLock<HashMap<DoctorId, DoctorSlots>>,
    next_generation: AtomicU64,
}

impl Default for SlotStore {
    fn default() -> Self {
        Self {
            slots: RwLock::default(),
            next_generation: AtomicU64::new(1),
        }
    }
}

impl SlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an empty slot and returns the doctor's full slot list.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::DuplicateSlot`] if the doctor already has a slot at `date`/`time`.
    pub fn add_slot(
        &self,
        doctor_id: DoctorId,
        date: SlotDate,
        time: SlotTime,
    ) -> BookingResult<Vec<Slot>> {
        let mut slots = locks::write(&self.slots);
        let doctor_slots = slots.entry(doctor_id).or_default();
        if doctor_slots.contains_key(&(date, time)) {
            return Err(BookingError::DuplicateSlot { date, time });
        }
        doctor_slots.insert((date, time), self.fresh_counter());
        Ok(snapshot_of(doctor_slots))
    }

    /// Adds an empty slot unless one already exists. Returns whether a slot was added.
    pub(crate) fn insert_if_absent(&self, key: SlotKey) -> bool {
        let mut slots = locks::write(&self.slots);
        let doctor_slots = slots.entry(key.doctor_id).or_default();
        if doctor_slots.contains_key(&(key.date, key.time)) {
            return false;
        }
        doctor_slots.insert((key.date, key.time), self.fresh_counter());
        true
    }

    /// Removes a slot unconditionally and returns the doctor's remaining slots.
    ///
    /// Live appointments against the slot are left in place; cancelling them later releases
    /// nothing, even if a slot is published again at the same date and time.
    pub fn remove_slot(&self, doctor_id: DoctorId, date: SlotDate, time: SlotTime) -> Vec<Slot> {
        self.detach(SlotKey::new(doctor_id, date, time)).1
    }

    /// Removes a slot and hands back its counter so the removal can be undone with
    /// [`SlotStore::put_back`].
    pub(crate) fn detach(&self, key: SlotKey) -> (Option<Arc<SlotCounter>>, Vec<Slot>) {
        let mut slots = locks::write(&self.slots);
        let Some(doctor_slots) = slots.get_mut(&key.doctor_id) else {
            return (None, Vec::new());
        };

        let removed = doctor_slots.remove(&(key.date, key.time));
        if let Some(counter) = &removed {
            let booked = counter.booked();
            if booked > 0 {
                tracing::warn!(
                    doctor = %key.doctor_id,
                    date = %key.date,
                    time = %key.time,
                    booked,
                    "removed slot that still has bookings"
                );
            }
        }

        (removed, snapshot_of(doctor_slots))
    }

    /// Reinstates a counter taken out by [`SlotStore::detach`]. An existing slot at the same key
    /// is left alone.
    pub(crate) fn put_back(&self, key: SlotKey, counter: Arc<SlotCounter>) {
        locks::write(&self.slots)
            .entry(key.doctor_id)
            .or_default()
            .entry((key.date, key.time))
            .or_insert(counter);
    }

    /// Every slot the doctor has published, ordered by date then time.
    pub fn slots_for(&self, doctor_id: &DoctorId) -> Vec<Slot> {
        locks::read(&self.slots)
            .get(doctor_id)
            .map(snapshot_of)
            .unwrap_or_default()
    }

    /// Slots in `[today, today + within_days]` that still have room.
    pub fn list_available(
        &self,
        doctor_id: &DoctorId,
        today: SlotDate,
        within_days: u32,
    ) -> Vec<AvailableSlot> {
        let last = today.plus_days(within_days);
        self.available_where(doctor_id, |date| {
            date >= today && last.map_or(true, |last| date <= last)
        })
    }

    /// Slots on `date` that still have room.
    pub fn list_available_for_date(&self, doctor_id: &DoctorId, date: SlotDate) -> Vec<AvailableSlot> {
        self.available_where(doctor_id, |d| d == date)
    }

    /// Current booking count of a slot, or `None` when the slot does not exist.
    pub fn booked_count(&self, key: &SlotKey) -> Option<u32> {
        self.counter(key).map(|c| c.booked())
    }

    /// Generation of the slot currently published at `key`.
    pub fn generation(&self, key: &SlotKey) -> Option<u64> {
        self.counter(key).map(|c| c.generation())
    }

    pub(crate) fn counter(&self, key: &SlotKey) -> Option<Arc<SlotCounter>> {
        locks::read(&self.slots)
            .get(&key.doctor_id)
            .and_then(|doctor_slots| doctor_slots.get(&(key.date, key.time)))
            .cloned()
    }

    pub(crate) fn all(&self) -> Vec<(DoctorId, Vec<Slot>)> {
        let mut all: Vec<(DoctorId, Vec<Slot>)> = locks::read(&self.slots)
            .iter()
            .map(|(id, doctor_slots)| (*id, snapshot_of(doctor_slots)))
            .collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    /// Replaces every slot with the given records.
    ///
    /// New slots get generations above both the restored ones and `seen_generation`, the
    /// highest generation any restored appointment refers to.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::SnapshotSchema`] for a duplicate key or a count above capacity. The
    /// store is left untouched on error.
    pub(crate) fn replace_all(
        &self,
        records: Vec<(DoctorId, Vec<Slot>)>,
        seen_generation: u64,
    ) -> BookingResult<()> {
        let mut rebuilt: HashMap<DoctorId, DoctorSlots> = HashMap::new();
        let mut highest = seen_generation;
        for (doctor_id, slots) in records {
            let doctor_slots = rebuilt.entry(doctor_id).or_default();
            for slot in slots {
                if slot.booked_count > SLOT_CAPACITY {
                    return Err(BookingError::SnapshotSchema(format!(
                        "slot {} {} for doctor {} has booked_count {} above capacity {}",
                        slot.date, slot.time, doctor_id, slot.booked_count, SLOT_CAPACITY
                    )));
                }
                highest = highest.max(slot.generation);
                let counter = Arc::new(SlotCounter::new(slot.generation, slot.booked_count));
                if doctor_slots.insert((slot.date, slot.time), counter).is_some() {
                    return Err(BookingError::SnapshotSchema(format!(
                        "duplicate slot {} {} for doctor {}",
                        slot.date, slot.time, doctor_id
                    )));
                }
            }
        }

        let mut slots = locks::write(&self.slots);
        *slots = rebuilt;
        self.next_generation.store(highest + 1, Ordering::Relaxed);
        Ok(())
    }

    fn fresh_counter(&self) -> Arc<SlotCounter> {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        Arc::new(SlotCounter::new(generation, 0))
    }

    fn available_where(
        &self,
        doctor_id: &DoctorId,
        keep_date: impl Fn(SlotDate) -> bool,
    ) -> Vec<AvailableSlot> {
        let slots = locks::read(&self.slots);
        let Some(doctor_slots) = slots.get(doctor_id) else {
            return Vec::new();
        };

        doctor_slots
            .iter()
            .filter(|((date, _), _)| keep_date(*date))
            .filter_map(|((date, time), counter)| {
                let booked = counter.booked();
                (booked < SLOT_CAPACITY).then(|| AvailableSlot {
                    date: *date,
                    time: *time,
                    available_spots: SLOT_CAPACITY - booked,
                })
            })
            .collect()
    }
}

fn snapshot_of(doctor_slots: &DoctorSlots) -> Vec<Slot> {
    doctor_slots
        .iter()
        .map(|((date, time), counter)| Slot {
            date: *date,
            time: *time,
            generation: counter.generation(),
            booked_count: counter.booked(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> SlotDate {
        SlotDate::parse(s).unwrap()
    }

    fn time(s: &str) -> SlotTime {
        SlotTime::parse(s).unwrap()
    }

    #[test]
    fn add_slot_rejects_duplicate_key() {
        let store = SlotStore::new();
        let doctor = DoctorId::generate();

        let slots = store
            .add_slot(doctor, date("2025-06-01"), time("10:00"))
            .expect("first add");
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].booked_count, 0);

        match store.add_slot(doctor, date("2025-06-01"), time("10:00")) {
            Err(BookingError::DuplicateSlot { date: d, time: t }) => {
                assert_eq!(d.to_string(), "2025-06-01");
                assert_eq!(t.to_string(), "10:00");
            }
            other => panic!("expected DuplicateSlot, got {other:?}"),
        }

        // Same date and time for a different doctor is a different slot.
        store
            .add_slot(DoctorId::generate(), date("2025-06-01"), time("10:00"))
            .expect("other doctor");
    }

    #[test]
    fn remove_slot_is_unconditional_and_returns_remaining() {
        let store = SlotStore::new();
        let doctor = DoctorId::generate();
        store.add_slot(doctor, date("2025-06-01"), time("10:00")).unwrap();
        store.add_slot(doctor, date("2025-06-01"), time("11:00")).unwrap();

        let remaining = store.remove_slot(doctor, date("2025-06-01"), time("10:00"));
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].time.to_string(), "11:00");

        // Removing something that is not there is not an error.
        let remaining = store.remove_slot(doctor, date("2025-06-02"), time("10:00"));
        assert_eq!(remaining.len(), 1);
        assert!(store
            .remove_slot(DoctorId::generate(), date("2025-06-01"), time("10:00"))
            .is_empty());
    }

    #[test]
    fn list_available_applies_window_bounds_inclusively() {
        let store = SlotStore::new();
        let doctor = DoctorId::generate();
        for d in ["2025-05-31", "2025-06-01", "2025-06-08", "2025-06-09"] {
            store.add_slot(doctor, date(d), time("10:00")).unwrap();
        }

        let available = store.list_available(&doctor, date("2025-06-01"), 7);
        let dates: Vec<String> = available.iter().map(|s| s.date.to_string()).collect();
        assert_eq!(dates, vec!["2025-06-01", "2025-06-08"]);
        assert!(available.iter().all(|s| s.available_spots == SLOT_CAPACITY));
    }

    #[test]
    fn list_available_for_date_is_sorted_by_time() {
        let store = SlotStore::new();
        let doctor = DoctorId::generate();
        store.add_slot(doctor, date("2025-06-01"), time("18:30")).unwrap();
        store.add_slot(doctor, date("2025-06-01"), time("09:00")).unwrap();
        store.add_slot(doctor, date("2025-06-02"), time("09:00")).unwrap();

        let times: Vec<String> = store
            .list_available_for_date(&doctor, date("2025-06-01"))
            .iter()
            .map(|s| s.time.to_string())
            .collect();
        assert_eq!(times, vec!["09:00", "18:30"]);
    }

    #[test]
    fn replace_all_rejects_over_capacity_and_duplicates() {
        let store = SlotStore::new();
        let doctor = DoctorId::generate();
        let slot = |t: &str, n| Slot {
            date: date("2025-06-01"),
            time: time(t),
            generation: 3,
            booked_count: n,
        };

        assert!(matches!(
            store.replace_all(vec![(doctor, vec![slot("10:00", SLOT_CAPACITY + 1)])], 0),
            Err(BookingError::SnapshotSchema(_))
        ));
        assert!(matches!(
            store.replace_all(vec![(doctor, vec![slot("10:00", 1), slot("10:00", 2)])], 0),
            Err(BookingError::SnapshotSchema(_))
        ));

        store
            .replace_all(vec![(doctor, vec![slot("10:00", 3)])], 0)
            .expect("valid records");
        let key = SlotKey::new(doctor, date("2025-06-01"), time("10:00"));
        assert_eq!(store.booked_count(&key), Some(3));
        assert_eq!(store.generation(&key), Some(3));
    }

    #[test]
    fn republished_slot_gets_a_new_generation() {
        let store = SlotStore::new();
        let doctor = DoctorId::generate();
        let key = SlotKey::new(doctor, date("2025-06-01"), time("10:00"));

        store.add_slot(doctor, key.date, key.time).unwrap();
        let first = store.generation(&key).unwrap();
        store.remove_slot(doctor, key.date, key.time);
        store.add_slot(doctor, key.date, key.time).unwrap();
        assert!(store.generation(&key).unwrap() > first);
    }

    #[test]
    fn restored_store_continues_above_every_known_generation() {
        let store = SlotStore::new();
        let doctor = DoctorId::generate();
        let restored = Slot {
            date: date("2025-06-01"),
            time: time("10:00"),
            generation: 4,
            booked_count: 0,
        };
        // An appointment from a since-removed slot referred to generation 9.
        store.replace_all(vec![(doctor, vec![restored])], 9).unwrap();

        store.add_slot(doctor, date("2025-06-01"), time("11:00")).unwrap();
        let key = SlotKey::new(doctor, date("2025-06-01"), time("11:00"));
        assert_eq!(store.generation(&key), Some(10));
    }

    #[test]
    fn detach_then_put_back_restores_the_same_slot() {
        let store = SlotStore::new();
        let doctor = DoctorId::generate();
        let key = SlotKey::new(doctor, date("2025-06-01"), time("10:00"));
        store.add_slot(doctor, key.date, key.time).unwrap();
        let generation = store.generation(&key);

        let (counter, remaining) = store.detach(key);
        assert!(remaining.is_empty());
        store.put_back(key, counter.expect("slot existed"));
        assert_eq!(store.generation(&key), generation);
    }
}
