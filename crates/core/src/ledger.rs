//! Appointment Ledger.
//!
//! The ledger is the authoritative record of who booked what and where each appointment is in
//! its lifecycle. It knows nothing about slot capacity.
//!
//! Lifecycle:
//!
//! ```text
//! booked ──► treated
//!   │           │
//!   └─────┬─────┘
//!         ▼
//!     cancelled
//! ```
//!
//! `completed` is accepted when restoring older records but no operation here produces it.
//!
//! A patient holds at most one *live* (non-cancelled) appointment per doctor/date/time. The
//! uniqueness check and the insert happen under the same lock, so `create` is atomic with
//! respect to concurrent `create` calls.

use crate::slots::SlotKey;
use crate::{locks, BookingError, BookingResult};
use careslot_ids::{AppointmentId, DoctorId, PatientId};
use careslot_types::{SlotDate, SlotTime};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Booked,
    Treated,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// Whether the appointment still counts as a claim on its slot.
    pub fn is_live(self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Treated => "treated",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Appointment {
    pub id: AppointmentId,
    pub doctor_id: DoctorId,
    pub patient_id: PatientId,
    pub date: SlotDate,
    pub time: SlotTime,
    /// Generation of the slot the place was taken from.
    pub slot_generation: u64,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(self.doctor_id, self.date, self.time)
    }

    fn live_key(&self) -> (PatientId, SlotKey) {
        (self.patient_id, self.slot_key())
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    records: HashMap<AppointmentId, Appointment>,
    live: HashSet<(PatientId, SlotKey)>,
}

#[derive(Debug, Default)]
pub struct AppointmentLedger {
    state: Mutex<LedgerState>,
}

impl AppointmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `patient_id` already holds a live appointment for `key`.
    pub fn has_live_booking(&self, patient_id: PatientId, key: &SlotKey) -> bool {
        locks::lock(&self.state).live.contains(&(patient_id, *key))
    }

    /// Records a new appointment in status `booked` against `slot_generation` of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::DuplicateBooking`] if the patient already holds a live appointment
    /// for the same doctor, date and time.
    pub fn create(
        &self,
        patient_id: PatientId,
        key: SlotKey,
        slot_generation: u64,
    ) -> BookingResult<Appointment> {
        let mut state = locks::lock(&self.state);
        if !state.live.insert((patient_id, key)) {
            return Err(BookingError::DuplicateBooking {
                date: key.date,
                time: key.time,
            });
        }

        let now = Utc::now();
        let appointment = Appointment {
            id: AppointmentId::generate(),
            doctor_id: key.doctor_id,
            patient_id,
            date: key.date,
            time: key.time,
            slot_generation,
            status: AppointmentStatus::Booked,
            created_at: now,
            updated_at: now,
        };
        state.records.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    /// Cancels an appointment on behalf of its patient.
    ///
    /// # Errors
    ///
    /// - [`BookingError::AppointmentNotFound`] if no such appointment exists.
    /// - [`BookingError::Forbidden`] if `by_patient` does not own it.
    /// - [`BookingError::AlreadyCancelled`] if it is already cancelled.
    pub fn cancel(&self, id: AppointmentId, by_patient: PatientId) -> BookingResult<Appointment> {
        let mut state = locks::lock(&self.state);
        let appointment = state
            .records
            .get_mut(&id)
            .ok_or(BookingError::AppointmentNotFound(id))?;

        if appointment.patient_id != by_patient {
            return Err(BookingError::Forbidden(id));
        }
        if appointment.status == AppointmentStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled(id));
        }

        appointment.status = AppointmentStatus::Cancelled;
        appointment.updated_at = Utc::now();
        let cancelled = appointment.clone();
        state.live.remove(&cancelled.live_key());
        Ok(cancelled)
    }

    /// Marks an appointment as treated once a prescription has been recorded.
    ///
    /// Marking an already treated appointment again is a no-op.
    ///
    /// # Errors
    ///
    /// - [`BookingError::AppointmentNotFound`] if no such appointment exists.
    /// - [`BookingError::AlreadyCancelled`] if it was cancelled.
    /// - [`BookingError::InvalidTransition`] if it is completed.
    pub fn mark_treated(&self, id: AppointmentId) -> BookingResult<Appointment> {
        let mut state = locks::lock(&self.state);
        let appointment = state
            .records
            .get_mut(&id)
            .ok_or(BookingError::AppointmentNotFound(id))?;

        match appointment.status {
            AppointmentStatus::Booked => {
                appointment.status = AppointmentStatus::Treated;
                appointment.updated_at = Utc::now();
            }
            AppointmentStatus::Treated => {}
            AppointmentStatus::Cancelled => return Err(BookingError::AlreadyCancelled(id)),
            AppointmentStatus::Completed => {
                return Err(BookingError::InvalidTransition {
                    id,
                    from: AppointmentStatus::Completed,
                    to: AppointmentStatus::Treated,
                })
            }
        }
        Ok(appointment.clone())
    }

    pub fn get(&self, id: &AppointmentId) -> Option<Appointment> {
        locks::lock(&self.state).records.get(id).cloned()
    }

    /// The patient's appointments, ordered by date then time.
    pub fn for_patient(&self, patient_id: PatientId) -> Vec<Appointment> {
        self.collect_sorted(|a| a.patient_id == patient_id)
    }

    /// The doctor's appointments, ordered by date then time.
    pub fn for_doctor(&self, doctor_id: DoctorId) -> Vec<Appointment> {
        self.collect_sorted(|a| a.doctor_id == doctor_id)
    }

    /// Number of live appointments holding a place in `slot_generation` of `key`.
    pub fn live_count(&self, key: &SlotKey, slot_generation: u64) -> u32 {
        let state = locks::lock(&self.state);
        let count = state
            .records
            .values()
            .filter(|a| {
                a.status.is_live() && a.slot_key() == *key && a.slot_generation == slot_generation
            })
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    pub(crate) fn all(&self) -> Vec<Appointment> {
        self.collect_sorted(|_| true)
    }

    /// Drops a record entirely, as if it had never been created.
    pub(crate) fn discard(&self, id: &AppointmentId) {
        let mut state = locks::lock(&self.state);
        if let Some(removed) = state.records.remove(id) {
            if removed.status.is_live() {
                state.live.remove(&removed.live_key());
            }
        }
    }

    /// Puts a record back exactly as given, replacing the current version.
    pub(crate) fn reinstate(&self, appointment: Appointment) {
        let mut state = locks::lock(&self.state);
        if appointment.status.is_live() {
            state.live.insert(appointment.live_key());
        } else {
            state.live.remove(&appointment.live_key());
        }
        state.records.insert(appointment.id, appointment);
    }

    /// Replaces every record.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::SnapshotSchema`] for a repeated id or two live appointments held
    /// by the same patient on the same slot. The ledger is left untouched on error.
    pub(crate) fn replace_all(&self, records: Vec<Appointment>) -> BookingResult<()> {
        let mut rebuilt = LedgerState::default();
        for appointment in records {
            if appointment.status.is_live() && !rebuilt.live.insert(appointment.live_key()) {
                return Err(BookingError::SnapshotSchema(format!(
                    "patient {} holds two live appointments at {} {}",
                    appointment.patient_id, appointment.date, appointment.time
                )));
            }
            let id = appointment.id;
            if rebuilt.records.insert(id, appointment).is_some() {
                return Err(BookingError::SnapshotSchema(format!(
                    "duplicate appointment id {id}"
                )));
            }
        }

        *locks::lock(&self.state) = rebuilt;
        Ok(())
    }

    fn collect_sorted(&self, keep: impl Fn(&Appointment) -> bool) -> Vec<Appointment> {
        let mut found: Vec<Appointment> = locks::lock(&self.state)
            .records
            .values()
            .filter(|a| keep(a))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            (a.date, a.time, a.created_at, a.id).cmp(&(b.date, b.time, b.created_at, b.id))
        });
        found
    }
}
