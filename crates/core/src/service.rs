//! `BookingService`: the facade the API and CLI layers talk to.
//!
//! It owns the stores, validates raw inputs into domain types, checks doctor existence, and
//! writes the snapshot after every successful mutation when a data directory is configured.
//! Mutations run one at a time under a write guard; if the snapshot cannot be written the
//! mutation is undone before the error is returned, so memory never runs ahead of disk.

use crate::capacity::CapacityEnforcer;
use crate::config::{validate_lookahead_days, validate_window_days, CoreConfig};
use crate::coordinator::BookingCoordinator;
use crate::doctors::{DoctorDirectory, DoctorProfile};
use crate::ledger::{Appointment, AppointmentLedger};
use crate::seed;
use crate::slots::{AvailableSlot, Slot, SlotKey, SlotStore};
use crate::snapshot::{DoctorSlots, Snapshot};
use crate::{locks, BookingError, BookingResult};
use careslot_ids::{AppointmentId, DoctorId, PatientId};
use careslot_types::{NonEmptyText, SlotDate, SlotTime};
use std::sync::{Arc, Mutex};

/// Everything a doctor sees on their dashboard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DoctorDashboard {
    pub profile: DoctorProfile,
    pub slots: Vec<Slot>,
    pub appointments: Vec<Appointment>,
}

#[derive(Clone, Debug)]
pub struct BookingService {
    cfg: Arc<CoreConfig>,
    doctors: Arc<DoctorDirectory>,
    slots: Arc<SlotStore>,
    ledger: Arc<AppointmentLedger>,
    coordinator: BookingCoordinator,
    write_lock: Arc<Mutex<()>>,
}

impl BookingService {
    /// Creates a service with empty stores.
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        let doctors = Arc::new(DoctorDirectory::new());
        let slots = Arc::new(SlotStore::new());
        let ledger = Arc::new(AppointmentLedger::new());
        let coordinator = BookingCoordinator::new(
            doctors.clone(),
            CapacityEnforcer::new(slots.clone()),
            ledger.clone(),
        );

        Self {
            cfg,
            doctors,
            slots,
            ledger,
            coordinator,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Creates a service and restores the snapshot from the data directory, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be read, parsed or applied.
    pub fn open(cfg: Arc<CoreConfig>) -> BookingResult<Self> {
        let service = Self::new(cfg);
        if let Some(path) = service.cfg.snapshot_path() {
            match Snapshot::read(&path)? {
                Some(snapshot) => {
                    service.restore(snapshot)?;
                    tracing::info!("restored booking state from {}", path.display());
                }
                None => tracing::info!("no snapshot at {}, starting empty", path.display()),
            }
        }
        Ok(service)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    // ------------------------------------------------------------------
    // Doctors
    // ------------------------------------------------------------------

    /// Sets a doctor's specialization, creating the profile on first use.
    pub fn set_specialization(
        &self,
        doctor_id: DoctorId,
        specialization: &str,
    ) -> BookingResult<DoctorProfile> {
        let specialization = NonEmptyText::new(specialization)
            .map_err(|_| BookingError::InvalidInput("specialization is required".into()))?;

        let (profile, previous) = self.commit(
            || {
                let previous = self.doctors.get(&doctor_id);
                let (profile, _) = self.doctors.set_specialization(doctor_id, specialization);
                Ok((profile, previous))
            },
            |(_, previous)| self.doctors.restore_profile(doctor_id, previous.clone()),
        )?;
        if previous.is_none() {
            tracing::info!(doctor = %doctor_id, "created doctor profile");
        }
        Ok(profile)
    }

    pub fn specialties(&self) -> Vec<String> {
        self.doctors.specialties()
    }

    pub fn doctors_by_specialty(&self, specialty: &str) -> Vec<DoctorProfile> {
        self.doctors.by_specialty(specialty)
    }

    /// Profile, slots and appointments for one doctor.
    pub fn doctor_dashboard(&self, doctor_id: DoctorId) -> BookingResult<DoctorDashboard> {
        let profile = self
            .doctors
            .get(&doctor_id)
            .ok_or(BookingError::DoctorNotFound(doctor_id))?;

        Ok(DoctorDashboard {
            profile,
            slots: self.slots.slots_for(&doctor_id),
            appointments: self.ledger.for_doctor(doctor_id),
        })
    }

    // ------------------------------------------------------------------
    // Slots
    // ------------------------------------------------------------------

    /// Publishes a slot and returns the doctor's updated slot list.
    pub fn add_slot(&self, doctor_id: DoctorId, date: &str, time: &str) -> BookingResult<Vec<Slot>> {
        let (date, time) = parse_slot(date, time)?;
        self.require_doctor(doctor_id)?;

        let key = SlotKey::new(doctor_id, date, time);
        let slots = self.commit(
            || self.slots.add_slot(doctor_id, date, time),
            |_| {
                self.slots.detach(key);
            },
        )?;
        tracing::info!(doctor = %doctor_id, %date, %time, "slot added");
        Ok(slots)
    }

    /// Withdraws a slot and returns the doctor's remaining slots.
    pub fn remove_slot(
        &self,
        doctor_id: DoctorId,
        date: &str,
        time: &str,
    ) -> BookingResult<Vec<Slot>> {
        let (date, time) = parse_slot(date, time)?;
        self.require_doctor(doctor_id)?;

        let key = SlotKey::new(doctor_id, date, time);
        let (_, slots) = self.commit(
            || Ok(self.slots.detach(key)),
            |(removed, _)| {
                if let Some(counter) = removed {
                    self.slots.put_back(key, counter.clone());
                }
            },
        )?;
        tracing::info!(doctor = %doctor_id, %date, %time, "slot removed");
        Ok(slots)
    }

    /// Bookable slots from `today` through `today + within_days`.
    ///
    /// `within_days` of `None` uses the configured booking window; `Some(0)` means today only.
    pub fn available_slots(
        &self,
        doctor_id: DoctorId,
        today: SlotDate,
        within_days: Option<u32>,
    ) -> BookingResult<Vec<AvailableSlot>> {
        let within_days = within_days.unwrap_or(self.cfg.booking_window_days());
        validate_lookahead_days(within_days)?;
        self.require_doctor(doctor_id)?;

        Ok(self.slots.list_available(&doctor_id, today, within_days))
    }

    /// Bookable slots on a single date.
    pub fn available_slots_on(
        &self,
        doctor_id: DoctorId,
        date: &str,
    ) -> BookingResult<Vec<AvailableSlot>> {
        let date = SlotDate::parse(date)?;
        self.require_doctor(doctor_id)?;

        Ok(self.slots.list_available_for_date(&doctor_id, date))
    }

    /// Publishes the evening clinic on each of the `days` days after `from`.
    pub fn seed_slots(&self, doctor_id: DoctorId, from: SlotDate, days: u32) -> BookingResult<usize> {
        validate_window_days(days)?;
        self.require_doctor(doctor_id)?;

        let added = self.commit(
            || seed::seed_slots(&self.slots, doctor_id, from, days),
            |added| {
                for key in added {
                    self.slots.detach(*key);
                }
            },
        )?;
        Ok(added.len())
    }

    // ------------------------------------------------------------------
    // Appointments
    // ------------------------------------------------------------------

    pub fn book(
        &self,
        patient_id: PatientId,
        doctor_id: DoctorId,
        date: &str,
        time: &str,
    ) -> BookingResult<Appointment> {
        let (date, time) = parse_slot(date, time)?;
        self.commit(
            || self.coordinator.book(patient_id, SlotKey::new(doctor_id, date, time)),
            |appointment| self.coordinator.undo_book(appointment),
        )
    }

    pub fn cancel(
        &self,
        appointment_id: AppointmentId,
        patient_id: PatientId,
    ) -> BookingResult<Appointment> {
        let (cancelled, _, _) = self.commit(
            || {
                let before = self.ledger.get(&appointment_id);
                let (cancelled, release) =
                    self.coordinator.cancel_releasing(appointment_id, patient_id)?;
                Ok((cancelled, before, release))
            },
            |(_, before, release)| {
                if let Some(before) = before {
                    self.coordinator.undo_cancel(before, *release);
                }
            },
        )?;
        Ok(cancelled)
    }

    /// Marks an appointment treated on behalf of the doctor it was booked with.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Forbidden`] when `doctor_id` is not the appointment's doctor, plus
    /// the ledger's own errors.
    pub fn mark_treated(
        &self,
        doctor_id: DoctorId,
        appointment_id: AppointmentId,
    ) -> BookingResult<Appointment> {
        let (treated, _) = self.commit(
            || {
                let before = self
                    .ledger
                    .get(&appointment_id)
                    .ok_or(BookingError::AppointmentNotFound(appointment_id))?;
                if before.doctor_id != doctor_id {
                    return Err(BookingError::Forbidden(appointment_id));
                }
                Ok((self.ledger.mark_treated(appointment_id)?, before))
            },
            |(_, before)| self.ledger.reinstate(before.clone()),
        )?;
        tracing::info!(appointment = %appointment_id, doctor = %doctor_id, "appointment treated");
        Ok(treated)
    }

    pub fn appointments_for_patient(&self, patient_id: PatientId) -> Vec<Appointment> {
        self.ledger.for_patient(patient_id)
    }

    pub fn appointment(&self, appointment_id: &AppointmentId) -> Option<Appointment> {
        self.ledger.get(appointment_id)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Captures the current state of all stores.
    ///
    /// Waits for any mutation in flight, so slot counts and appointments agree.
    pub fn snapshot(&self) -> Snapshot {
        let _guard = locks::lock(&self.write_lock);
        self.capture()
    }

    /// Replaces all state with `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::SnapshotSchema`] if the snapshot violates a store invariant
    /// (capacity bound, booked count disagreeing with live appointments, duplicate slot,
    /// duplicate live booking, duplicate id). A disagreeing count is caught before any store is
    /// touched; for the other cases the stores may be partially replaced, so the service should
    /// be discarded.
    pub fn restore(&self, snapshot: Snapshot) -> BookingResult<()> {
        snapshot.check_booked_counts()?;
        let seen_generation = snapshot.highest_appointment_generation();

        let _guard = locks::lock(&self.write_lock);
        self.slots.replace_all(
            snapshot
                .slots
                .into_iter()
                .map(|s| (s.doctor_id, s.slots))
                .collect(),
            seen_generation,
        )?;
        self.ledger.replace_all(snapshot.appointments)?;
        self.doctors.replace_all(snapshot.doctors);
        Ok(())
    }

    /// Applies a mutation and writes the snapshot, calling `revert` if the write fails.
    fn commit<T>(
        &self,
        apply: impl FnOnce() -> BookingResult<T>,
        revert: impl FnOnce(&T),
    ) -> BookingResult<T> {
        let _guard = locks::lock(&self.write_lock);
        let applied = apply()?;
        if let Err(err) = self.persist() {
            revert(&applied);
            tracing::warn!("undid change that could not be persisted");
            return Err(err);
        }
        Ok(applied)
    }

    fn capture(&self) -> Snapshot {
        Snapshot {
            doctors: self.doctors.all(),
            slots: self
                .slots
                .all()
                .into_iter()
                .map(|(doctor_id, slots)| DoctorSlots { doctor_id, slots })
                .collect(),
            appointments: self.ledger.all(),
            ..Snapshot::default()
        }
    }

    /// Writes the snapshot. Callers hold the write guard.
    fn persist(&self) -> BookingResult<()> {
        let Some(path) = self.cfg.snapshot_path() else {
            return Ok(());
        };

        self.capture().write(&path).inspect_err(|e| {
            tracing::error!("failed to persist snapshot to {}: {e}", path.display());
        })
    }

    fn require_doctor(&self, doctor_id: DoctorId) -> BookingResult<()> {
        if self.doctors.exists(&doctor_id) {
            Ok(())
        } else {
            Err(BookingError::DoctorNotFound(doctor_id))
        }
    }
}

fn parse_slot(date: &str, time: &str) -> BookingResult<(SlotDate, SlotTime)> {
    Ok((SlotDate::parse(date)?, SlotTime::parse(time)?))
}

/// Today's calendar date in the server's local time zone.
pub fn today() -> SlotDate {
    SlotDate::from_naive(chrono::Local::now().date_naive())
}
