//! Capacity Invariant Enforcer.
//!
//! Invariant: `0 <= booked_count <= SLOT_CAPACITY` for every slot, under any interleaving of
//! concurrent reservations and releases.
//!
//! `reserve` is a compare-and-increment on the slot's atomic counter: the increment only lands if
//! the value observed is still below capacity, so two callers racing on the last free place can
//! never both succeed. `release` is the matching compare-and-decrement floored at zero.
//!
//! Every slot instance carries a generation. A slot that is removed and published again at the
//! same date and time gets a fresh generation, and a release only lands on the generation it was
//! reserved from.

use crate::constants::SLOT_CAPACITY;
use crate::slots::{SlotKey, SlotStore};
use crate::{BookingError, BookingResult};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Booking counter owned by a single slot instance.
#[derive(Debug)]
pub struct SlotCounter {
    generation: u64,
    booked: AtomicU32,
}

impl SlotCounter {
    pub(crate) fn new(generation: u64, booked: u32) -> Self {
        Self {
            generation,
            booked: AtomicU32::new(booked),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn booked(&self) -> u32 {
        self.booked.load(Ordering::Acquire)
    }

    /// Returns the new count, or the unchanged count when already at `capacity`.
    fn try_increment(&self, capacity: u32) -> Result<u32, u32> {
        self.booked
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < capacity).then_some(current + 1)
            })
            .map(|previous| previous + 1)
    }

    /// Returns the new count, or `None` when the counter was already zero.
    fn decrement_floor(&self) -> Option<u32> {
        self.booked
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(1)
            })
            .ok()
            .map(|previous| previous - 1)
    }
}

/// A place taken by [`CapacityEnforcer::reserve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reservation {
    /// Generation of the slot instance the place was taken from.
    pub generation: u64,
    /// Booking count after the increment.
    pub booked: u32,
}

/// Outcome of a [`CapacityEnforcer::release`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Release {
    /// The counter was decremented to the contained value.
    Released(u32),
    /// The counter was already zero.
    AlreadyEmpty,
    /// The slot no longer exists.
    SlotMissing,
    /// The slot was removed and published again since the place was taken.
    SlotReplaced,
}

/// The only code path that changes a slot's booking count.
#[derive(Debug, Clone)]
pub struct CapacityEnforcer {
    slots: Arc<SlotStore>,
    capacity: u32,
}

impl CapacityEnforcer {
    pub fn new(slots: Arc<SlotStore>) -> Self {
        Self {
            slots,
            capacity: SLOT_CAPACITY,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Takes one place in the slot.
    ///
    /// # Errors
    ///
    /// - [`BookingError::SlotNotFound`] if the slot does not exist.
    /// - [`BookingError::SlotFull`] if the slot is already at capacity.
    pub fn reserve(&self, key: &SlotKey) -> BookingResult<Reservation> {
        let counter = self.slots.counter(key).ok_or(BookingError::SlotNotFound {
            date: key.date,
            time: key.time,
        })?;

        let booked = counter
            .try_increment(self.capacity)
            .map_err(|_| BookingError::SlotFull {
                date: key.date,
                time: key.time,
            })?;
        Ok(Reservation {
            generation: counter.generation(),
            booked,
        })
    }

    /// Gives back one place taken from `generation` of the slot.
    ///
    /// Never fails: a missing or replaced slot and an empty counter are no-ops.
    pub fn release(&self, key: &SlotKey, generation: u64) -> Release {
        let Some(counter) = self.slots.counter(key) else {
            return Release::SlotMissing;
        };
        if counter.generation() != generation {
            return Release::SlotReplaced;
        }

        match counter.decrement_floor() {
            Some(booked) => Release::Released(booked),
            None => Release::AlreadyEmpty,
        }
    }

    /// Takes back a place that was just released from `generation`, undoing that release.
    ///
    /// Returns whether the place was taken.
    pub(crate) fn reclaim(&self, key: &SlotKey, generation: u64) -> bool {
        self.slots
            .counter(key)
            .filter(|counter| counter.generation() == generation)
            .is_some_and(|counter| counter.try_increment(self.capacity).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careslot_ids::DoctorId;
    use careslot_types::{SlotDate, SlotTime};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;

    fn store_with_slot() -> (Arc<SlotStore>, SlotKey) {
        let store = Arc::new(SlotStore::new());
        let key = SlotKey::new(
            DoctorId::generate(),
            SlotDate::parse("2025-06-01").unwrap(),
            SlotTime::parse("10:00").unwrap(),
        );
        store.add_slot(key.doctor_id, key.date, key.time).unwrap();
        (store, key)
    }

    #[test]
    fn reserve_fills_to_capacity_then_rejects() {
        let (store, key) = store_with_slot();
        let enforcer = CapacityEnforcer::new(store.clone());

        for expected in 1..=SLOT_CAPACITY {
            assert_eq!(enforcer.reserve(&key).expect("room left").booked, expected);
        }
        match enforcer.reserve(&key) {
            Err(BookingError::SlotFull { .. }) => {}
            other => panic!("expected SlotFull, got {other:?}"),
        }
        assert_eq!(store.booked_count(&key), Some(SLOT_CAPACITY));
    }

    #[test]
    fn reserve_unknown_slot_is_not_found() {
        let (store, key) = store_with_slot();
        let enforcer = CapacityEnforcer::new(store);
        let other = SlotKey::new(key.doctor_id, key.date, SlotTime::parse("11:00").unwrap());

        match enforcer.reserve(&other) {
            Err(BookingError::SlotNotFound { time, .. }) => assert_eq!(time.to_string(), "11:00"),
            other => panic!("expected SlotNotFound, got {other:?}"),
        }
    }

    #[test]
    fn release_floors_at_zero_and_tolerates_missing_slot() {
        let (store, key) = store_with_slot();
        let enforcer = CapacityEnforcer::new(store.clone());

        let generation = enforcer.reserve(&key).unwrap().generation;
        assert_eq!(enforcer.release(&key, generation), Release::Released(0));
        assert_eq!(enforcer.release(&key, generation), Release::AlreadyEmpty);
        assert_eq!(store.booked_count(&key), Some(0));

        store.remove_slot(key.doctor_id, key.date, key.time);
        assert_eq!(enforcer.release(&key, generation), Release::SlotMissing);
    }

    #[test]
    fn release_ignores_a_republished_slot() {
        let (store, key) = store_with_slot();
        let enforcer = CapacityEnforcer::new(store.clone());
        let old = enforcer.reserve(&key).unwrap();

        store.remove_slot(key.doctor_id, key.date, key.time);
        store.add_slot(key.doctor_id, key.date, key.time).unwrap();
        let new = enforcer.reserve(&key).unwrap();
        assert_ne!(old.generation, new.generation);
        assert_eq!(new.booked, 1);

        assert_eq!(enforcer.release(&key, old.generation), Release::SlotReplaced);
        assert_eq!(store.booked_count(&key), Some(1));
        assert!(!enforcer.reclaim(&key, old.generation));
        assert!(enforcer.reclaim(&key, new.generation));
        assert_eq!(store.booked_count(&key), Some(2));
    }

    #[test]
    fn concurrent_reserves_never_exceed_capacity() {
        const THREADS: usize = 32;

        for _ in 0..50 {
            let (store, key) = store_with_slot();
            let enforcer = CapacityEnforcer::new(store.clone());
            let barrier = Barrier::new(THREADS);
            let successes = AtomicUsize::new(0);

            std::thread::scope(|scope| {
                for _ in 0..THREADS {
                    scope.spawn(|| {
                        barrier.wait();
                        if enforcer.reserve(&key).is_ok() {
                            successes.fetch_add(1, Ordering::SeqCst);
                        }
                    });
                }
            });

            assert_eq!(successes.load(Ordering::SeqCst), SLOT_CAPACITY as usize);
            assert_eq!(store.booked_count(&key), Some(SLOT_CAPACITY));
        }
    }

    #[test]
    fn concurrent_reserve_and_release_stay_in_bounds() {
        let (store, key) = store_with_slot();
        let enforcer = CapacityEnforcer::new(store.clone());
        let barrier = Barrier::new(16);

        std::thread::scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|| {
                    barrier.wait();
                    for _ in 0..200 {
                        if let Ok(reservation) = enforcer.reserve(&key) {
                            let booked = store.booked_count(&key).unwrap();
                            assert!((1..=SLOT_CAPACITY).contains(&booked));
                            assert!(matches!(
                                enforcer.release(&key, reservation.generation),
                                Release::Released(_)
                            ));
                        }
                    }
                });
            }
        });

        assert_eq!(store.booked_count(&key), Some(0));
    }
}
