//! Booking Coordinator.
//!
//! Composes the capacity enforcer and the appointment ledger into single logical operations.
//!
//! Booking:
//! 1. reject early if the patient already holds a live appointment for the slot;
//! 2. reserve one place in the slot (`SlotNotFound` / `SlotFull` abort with no side effects);
//! 3. record the appointment; if that fails the reservation is released before the error is
//!    returned, so a failed booking never leaks capacity.
//!
//! Cancellation:
//! 1. cancel in the ledger (ownership and state checks fail fast);
//! 2. release the slot. A slot removed, or removed and published again, since the booking makes
//!    this a no-op.

use crate::capacity::{CapacityEnforcer, Release};
use crate::doctors::DoctorDirectory;
use crate::ledger::{Appointment, AppointmentLedger};
use crate::slots::SlotKey;
use crate::{BookingError, BookingResult};
use careslot_ids::{AppointmentId, PatientId};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct BookingCoordinator {
    doctors: Arc<DoctorDirectory>,
    capacity: CapacityEnforcer,
    ledger: Arc<AppointmentLedger>,
}

impl BookingCoordinator {
    pub fn new(
        doctors: Arc<DoctorDirectory>,
        capacity: CapacityEnforcer,
        ledger: Arc<AppointmentLedger>,
    ) -> Self {
        Self {
            doctors,
            capacity,
            ledger,
        }
    }

    /// Books one place in `key` for `patient_id`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::DoctorNotFound`] if the doctor has no profile.
    /// - [`BookingError::DuplicateBooking`] if the patient already holds the slot.
    /// - [`BookingError::SlotNotFound`] / [`BookingError::SlotFull`] from the reservation.
    pub fn book(&self, patient_id: PatientId, key: SlotKey) -> BookingResult<Appointment> {
        if !self.doctors.exists(&key.doctor_id) {
            tracing::warn!(doctor = %key.doctor_id, "booking rejected: unknown doctor");
            return Err(BookingError::DoctorNotFound(key.doctor_id));
        }

        if self.ledger.has_live_booking(patient_id, &key) {
            tracing::warn!(
                patient = %patient_id,
                doctor = %key.doctor_id,
                date = %key.date,
                time = %key.time,
                "booking rejected: duplicate"
            );
            return Err(BookingError::DuplicateBooking {
                date: key.date,
                time: key.time,
            });
        }

        self.reserve_and_record(patient_id, key)
    }

    /// Steps 2 and 3 of a booking: reserve, record, and undo the reservation if recording fails.
    pub(crate) fn reserve_and_record(
        &self,
        patient_id: PatientId,
        key: SlotKey,
    ) -> BookingResult<Appointment> {
        let reservation = self.capacity.reserve(&key).inspect_err(|e| {
            tracing::warn!(
                patient = %patient_id,
                doctor = %key.doctor_id,
                date = %key.date,
                time = %key.time,
                "booking rejected: {e}"
            );
        })?;

        match self.ledger.create(patient_id, key, reservation.generation) {
            Ok(appointment) => {
                tracing::info!(
                    appointment = %appointment.id,
                    patient = %patient_id,
                    doctor = %key.doctor_id,
                    date = %key.date,
                    time = %key.time,
                    booked = reservation.booked,
                    "appointment booked"
                );
                Ok(appointment)
            }
            Err(err) => {
                let release = self.capacity.release(&key, reservation.generation);
                tracing::warn!(
                    patient = %patient_id,
                    doctor = %key.doctor_id,
                    date = %key.date,
                    time = %key.time,
                    ?release,
                    "rolled back reservation: {err}"
                );
                Err(err)
            }
        }
    }

    /// Cancels an appointment owned by `patient_id` and gives its place back.
    ///
    /// # Errors
    ///
    /// - [`BookingError::AppointmentNotFound`] if no such appointment exists.
    /// - [`BookingError::Forbidden`] if the patient does not own it.
    /// - [`BookingError::AlreadyCancelled`] if it was already cancelled.
    pub fn cancel(
        &self,
        appointment_id: AppointmentId,
        patient_id: PatientId,
    ) -> BookingResult<Appointment> {
        self.cancel_releasing(appointment_id, patient_id)
            .map(|(cancelled, _)| cancelled)
    }

    /// [`BookingCoordinator::cancel`], also reporting what happened to the slot's place.
    pub(crate) fn cancel_releasing(
        &self,
        appointment_id: AppointmentId,
        patient_id: PatientId,
    ) -> BookingResult<(Appointment, Release)> {
        let cancelled = self
            .ledger
            .cancel(appointment_id, patient_id)
            .inspect_err(|e| {
                tracing::warn!(
                    appointment = %appointment_id,
                    patient = %patient_id,
                    "cancellation rejected: {e}"
                );
            })?;

        let key = cancelled.slot_key();
        let release = self.capacity.release(&key, cancelled.slot_generation);
        match release {
            Release::Released(booked) => tracing::info!(
                appointment = %appointment_id,
                doctor = %key.doctor_id,
                date = %key.date,
                time = %key.time,
                booked,
                "appointment cancelled"
            ),
            outcome => tracing::warn!(
                appointment = %appointment_id,
                doctor = %key.doctor_id,
                date = %key.date,
                time = %key.time,
                ?outcome,
                "appointment cancelled without releasing a place"
            ),
        }

        Ok((cancelled, release))
    }

    /// Reverts a successful [`BookingCoordinator::book`].
    pub(crate) fn undo_book(&self, appointment: &Appointment) {
        self.ledger.discard(&appointment.id);
        self.capacity
            .release(&appointment.slot_key(), appointment.slot_generation);
    }

    /// Reverts a successful cancellation. `before` is the appointment as it was beforehand.
    pub(crate) fn undo_cancel(&self, before: &Appointment, release: Release) {
        if let Release::Released(_) = release {
            self.capacity
                .reclaim(&before.slot_key(), before.slot_generation);
        }
        self.ledger.reinstate(before.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SLOT_CAPACITY;
    use crate::ledger::AppointmentStatus;
    use crate::slots::SlotStore;
    use careslot_ids::DoctorId;
    use careslot_types::{NonEmptyText, SlotDate, SlotTime};
    use std::sync::Barrier;

    struct Fixture {
        slots: Arc<SlotStore>,
        ledger: Arc<AppointmentLedger>,
        coordinator: BookingCoordinator,
        key: SlotKey,
    }

    impl Fixture {
        fn generation(&self) -> u64 {
            self.slots.generation(&self.key).expect("slot is published")
        }
    }

    fn fixture() -> Fixture {
        let doctors = Arc::new(DoctorDirectory::new());
        let slots = Arc::new(SlotStore::new());
        let ledger = Arc::new(AppointmentLedger::new());
        let doctor = DoctorId::generate();
        doctors.set_specialization(doctor, NonEmptyText::new("General").unwrap());

        let key = SlotKey::new(
            doctor,
            SlotDate::parse("2025-06-01").unwrap(),
            SlotTime::parse("10:00").unwrap(),
        );
        slots.add_slot(doctor, key.date, key.time).unwrap();

        let coordinator = BookingCoordinator::new(
            doctors,
            CapacityEnforcer::new(slots.clone()),
            ledger.clone(),
        );
        Fixture {
            slots,
            ledger,
            coordinator,
            key,
        }
    }

    #[test]
    fn fills_slot_then_reports_full() {
        let f = fixture();
        for _ in 0..SLOT_CAPACITY {
            f.coordinator
                .book(PatientId::generate(), f.key)
                .expect("room left");
        }
        assert!(f.slots.list_available_for_date(&f.key.doctor_id, f.key.date).is_empty());

        match f.coordinator.book(PatientId::generate(), f.key) {
            Err(BookingError::SlotFull { .. }) => {}
            other => panic!("expected SlotFull, got {other:?}"),
        }
        assert_eq!(f.ledger.live_count(&f.key, f.generation()), SLOT_CAPACITY);
    }

    #[test]
    fn unknown_doctor_and_slot_have_no_side_effects() {
        let f = fixture();
        let patient = PatientId::generate();

        let stranger = SlotKey::new(DoctorId::generate(), f.key.date, f.key.time);
        assert!(matches!(
            f.coordinator.book(patient, stranger),
            Err(BookingError::DoctorNotFound(_))
        ));

        let missing = SlotKey::new(f.key.doctor_id, f.key.date, SlotTime::parse("11:00").unwrap());
        assert!(matches!(
            f.coordinator.book(patient, missing),
            Err(BookingError::SlotNotFound { .. })
        ));
        assert!(f.ledger.for_patient(patient).is_empty());
    }

    #[test]
    fn duplicate_booking_leaves_count_unchanged() {
        let f = fixture();
        let patient = PatientId::generate();
        f.coordinator.book(patient, f.key).unwrap();

        match f.coordinator.book(patient, f.key) {
            Err(BookingError::DuplicateBooking { .. }) => {}
            other => panic!("expected DuplicateBooking, got {other:?}"),
        }
        assert_eq!(f.slots.booked_count(&f.key), Some(1));
    }

    #[test]
    fn failed_record_rolls_back_reservation() {
        let f = fixture();
        let patient = PatientId::generate();
        f.coordinator.book(patient, f.key).unwrap();
        assert_eq!(f.slots.booked_count(&f.key), Some(1));

        // Skip the early duplicate check to reach the ledger with a duplicate, as a racing
        // request would.
        match f.coordinator.reserve_and_record(patient, f.key) {
            Err(BookingError::DuplicateBooking { .. }) => {}
            other => panic!("expected DuplicateBooking, got {other:?}"),
        }
        assert_eq!(f.slots.booked_count(&f.key), Some(1));
    }

    #[test]
    fn cancel_restores_available_spots_once() {
        let f = fixture();
        let patient = PatientId::generate();
        let before = f.slots.list_available_for_date(&f.key.doctor_id, f.key.date)[0].available_spots;

        let appt = f.coordinator.book(patient, f.key).unwrap();
        let cancelled = f.coordinator.cancel(appt.id, patient).expect("cancel");
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

        let after = f.slots.list_available_for_date(&f.key.doctor_id, f.key.date)[0].available_spots;
        assert_eq!(before, after);

        assert!(matches!(
            f.coordinator.cancel(appt.id, patient),
            Err(BookingError::AlreadyCancelled(_))
        ));
        assert_eq!(f.slots.booked_count(&f.key), Some(0));
    }

    #[test]
    fn cancel_by_other_patient_is_forbidden() {
        let f = fixture();
        let owner = PatientId::generate();
        let appt = f.coordinator.book(owner, f.key).unwrap();

        assert!(matches!(
            f.coordinator.cancel(appt.id, PatientId::generate()),
            Err(BookingError::Forbidden(_))
        ));
        assert_eq!(f.slots.booked_count(&f.key), Some(1));
    }

    #[test]
    fn cancel_after_slot_removed_is_tolerated() {
        let f = fixture();
        let patient = PatientId::generate();
        let appt = f.coordinator.book(patient, f.key).unwrap();
        f.slots.remove_slot(f.key.doctor_id, f.key.date, f.key.time);

        let cancelled = f.coordinator.cancel(appt.id, patient).expect("cancel");
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    }

    #[test]
    fn stale_cancel_does_not_free_a_place_in_a_republished_slot() {
        let f = fixture();
        let early = PatientId::generate();
        let stale = f.coordinator.book(early, f.key).unwrap();

        f.slots.remove_slot(f.key.doctor_id, f.key.date, f.key.time);
        f.slots.add_slot(f.key.doctor_id, f.key.date, f.key.time).unwrap();
        for _ in 0..SLOT_CAPACITY {
            f.coordinator.book(PatientId::generate(), f.key).unwrap();
        }

        let (cancelled, release) = f.coordinator.cancel_releasing(stale.id, early).unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert_eq!(release, Release::SlotReplaced);

        match f.coordinator.book(PatientId::generate(), f.key) {
            Err(BookingError::SlotFull { .. }) => {}
            other => panic!("expected SlotFull, got {other:?}"),
        }
        assert_eq!(f.slots.booked_count(&f.key), Some(SLOT_CAPACITY));
        assert_eq!(f.ledger.live_count(&f.key, f.generation()), SLOT_CAPACITY);
    }

    #[test]
    fn undo_restores_count_and_record() {
        let f = fixture();
        let patient = PatientId::generate();

        let appt = f.coordinator.book(patient, f.key).unwrap();
        f.coordinator.undo_book(&appt);
        assert_eq!(f.slots.booked_count(&f.key), Some(0));
        assert!(f.ledger.get(&appt.id).is_none());

        let appt = f.coordinator.book(patient, f.key).unwrap();
        let (_, release) = f.coordinator.cancel_releasing(appt.id, patient).unwrap();
        assert_eq!(f.slots.booked_count(&f.key), Some(0));
        f.coordinator.undo_cancel(&appt, release);
        assert_eq!(f.slots.booked_count(&f.key), Some(1));
        assert_eq!(f.ledger.get(&appt.id), Some(appt));
        assert_eq!(f.ledger.live_count(&f.key, f.generation()), 1);
    }

    #[test]
    fn racing_for_last_place_admits_exactly_one() {
        for _ in 0..50 {
            let f = fixture();
            for _ in 0..SLOT_CAPACITY - 1 {
                f.coordinator.book(PatientId::generate(), f.key).unwrap();
            }

            let barrier = Barrier::new(2);
            let results: Vec<BookingResult<Appointment>> = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..2)
                    .map(|_| {
                        scope.spawn(|| {
                            barrier.wait();
                            f.coordinator.book(PatientId::generate(), f.key)
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });

            let ok = results.iter().filter(|r| r.is_ok()).count();
            let full = results
                .iter()
                .filter(|r| matches!(r, Err(BookingError::SlotFull { .. })))
                .count();
            assert_eq!((ok, full), (1, 1));
            assert_eq!(f.slots.booked_count(&f.key), Some(SLOT_CAPACITY));
        }
    }

    #[test]
    fn same_patient_racing_keeps_count_conserved() {
        for _ in 0..50 {
            let f = fixture();
            let patient = PatientId::generate();
            let barrier = Barrier::new(8);

            std::thread::scope(|scope| {
                for _ in 0..8 {
                    scope.spawn(|| {
                        barrier.wait();
                        let _ = f.coordinator.book(patient, f.key);
                    });
                }
            });

            assert_eq!(f.ledger.live_count(&f.key, f.generation()), 1);
            assert_eq!(f.slots.booked_count(&f.key), Some(1));
        }
    }
}
