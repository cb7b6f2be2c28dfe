//! Request and response bodies for the careslot HTTP surface.
//!
//! Dates travel as `YYYY-MM-DD`, times as `HH:MM`, ids as 32 lowercase hex characters and
//! timestamps as RFC 3339 strings.

use careslot_core::{
    Appointment, AvailableSlot, BookingError, DoctorDashboard, DoctorProfile, Slot,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

// ----------------------------------------------------------------------
// Errors
// ----------------------------------------------------------------------

/// Machine-readable error category returned in every error body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ErrorKind {
    InvalidInput,
    Unauthorized,
    DoctorNotFound,
    SlotNotFound,
    SlotFull,
    DuplicateSlot,
    DuplicateBooking,
    NotFound,
    Forbidden,
    AlreadyCancelled,
    InvalidTransition,
    Internal,
}

impl From<&BookingError> for ErrorKind {
    fn from(err: &BookingError) -> Self {
        match err {
            BookingError::InvalidInput(_) => Self::InvalidInput,
            BookingError::DoctorNotFound(_) => Self::DoctorNotFound,
            BookingError::SlotNotFound { .. } => Self::SlotNotFound,
            BookingError::SlotFull { .. } => Self::SlotFull,
            BookingError::DuplicateSlot { .. } => Self::DuplicateSlot,
            BookingError::DuplicateBooking { .. } => Self::DuplicateBooking,
            BookingError::AppointmentNotFound(_) => Self::NotFound,
            BookingError::Forbidden(_) => Self::Forbidden,
            BookingError::AlreadyCancelled(_) => Self::AlreadyCancelled,
            BookingError::InvalidTransition { .. } => Self::InvalidTransition,
            BookingError::DataDirCreation(_)
            | BookingError::FileRead(_)
            | BookingError::FileWrite(_)
            | BookingError::SnapshotSerialization(_)
            | BookingError::SnapshotSchema(_) => Self::Internal,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorRes {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&BookingError> for ErrorRes {
    /// Storage failures are reported without their detail.
    fn from(err: &BookingError) -> Self {
        let kind = ErrorKind::from(err);
        let message = match kind {
            ErrorKind::Internal => "internal error".to_owned(),
            _ => err.to_string(),
        };
        Self { kind, message }
    }
}

// ----------------------------------------------------------------------
// Doctors
// ----------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SetSpecializationReq {
    pub specialization: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DoctorRes {
    pub id: String,
    pub specialization: String,
}

impl From<DoctorProfile> for DoctorRes {
    fn from(profile: DoctorProfile) -> Self {
        Self {
            id: profile.id.to_string(),
            specialization: profile.specialization.as_str().to_owned(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SpecialtiesRes {
    pub specialties: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DoctorListRes {
    pub doctors: Vec<DoctorRes>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardRes {
    pub doctor: DoctorRes,
    pub slots: Vec<SlotRes>,
    pub appointments: Vec<AppointmentRes>,
}

impl From<DoctorDashboard> for DashboardRes {
    fn from(dashboard: DoctorDashboard) -> Self {
        Self {
            doctor: dashboard.profile.into(),
            slots: dashboard.slots.into_iter().map(Into::into).collect(),
            appointments: dashboard.appointments.into_iter().map(Into::into).collect(),
        }
    }
}

// ----------------------------------------------------------------------
// Slots
// ----------------------------------------------------------------------

/// Body of `POST /slots` and `DELETE /slots`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SlotReq {
    pub date: String,
    pub time: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SlotRes {
    pub date: String,
    pub time: String,
    pub booked_count: u32,
}

impl From<Slot> for SlotRes {
    fn from(slot: Slot) -> Self {
        Self {
            date: slot.date.to_string(),
            time: slot.time.to_string(),
            booked_count: slot.booked_count,
        }
    }
}

/// The doctor's slot list after an add or remove.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SlotListRes {
    pub slots: Vec<SlotRes>,
}

impl From<Vec<Slot>> for SlotListRes {
    fn from(slots: Vec<Slot>) -> Self {
        Self {
            slots: slots.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AvailableSlotRes {
    pub date: String,
    pub time: String,
    pub available_spots: u32,
}

impl From<AvailableSlot> for AvailableSlotRes {
    fn from(slot: AvailableSlot) -> Self {
        Self {
            date: slot.date.to_string(),
            time: slot.time.to_string(),
            available_spots: slot.available_spots,
        }
    }
}

/// Query string of `GET /slots`.
#[derive(Clone, Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailableSlotsQuery {
    /// Doctor id.
    pub doctor: String,
    /// Days ahead of today to include. Defaults to the configured booking window.
    pub within_days: Option<u32>,
}

// ----------------------------------------------------------------------
// Appointments
// ----------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BookAppointmentReq {
    pub doctor_id: String,
    pub date: String,
    pub time: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppointmentRes {
    pub id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub date: String,
    pub time: String,
    /// One of `booked`, `treated`, `cancelled`, `completed`.
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Appointment> for AppointmentRes {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id.to_string(),
            doctor_id: a.doctor_id.to_string(),
            patient_id: a.patient_id.to_string(),
            date: a.date.to_string(),
            time: a.time.to_string(),
            status: a.status.as_str().to_owned(),
            created_at: a.created_at.to_rfc3339(),
            updated_at: a.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AppointmentListRes {
    pub appointments: Vec<AppointmentRes>,
}
