use crate::ledger::AppointmentStatus;
use careslot_ids::{AppointmentId, DoctorId, IdError};
use careslot_types::{SlotDate, SlotTime, TextError};

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("doctor not found: {0}")]
    DoctorNotFound(DoctorId),
    #[error("slot {date} {time} not found")]
    SlotNotFound { date: SlotDate, time: SlotTime },
    #[error("slot {date} {time} is fully booked")]
    SlotFull { date: SlotDate, time: SlotTime },
    #[error("slot {date} {time} already exists")]
    DuplicateSlot { date: SlotDate, time: SlotTime },

    #[error("patient already holds an appointment at {date} {time} with this doctor")]
    DuplicateBooking { date: SlotDate, time: SlotTime },
    #[error("appointment not found: {0}")]
    AppointmentNotFound(AppointmentId),
    #[error("caller does not own appointment {0}")]
    Forbidden(AppointmentId),
    #[error("appointment {0} is already cancelled")]
    AlreadyCancelled(AppointmentId),
    #[error("appointment {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: AppointmentId,
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("failed to create data directory: {0}")]
    DataDirCreation(std::io::Error),
    #[error("failed to read snapshot: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write snapshot: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize snapshot: {0}")]
    SnapshotSerialization(serde_yaml::Error),
    #[error("snapshot schema mismatch: {0}")]
    SnapshotSchema(String),
}

impl From<TextError> for BookingError {
    fn from(err: TextError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<IdError> for BookingError {
    fn from(err: IdError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

pub type BookingResult<T> = std::result::Result<T, BookingError>;
