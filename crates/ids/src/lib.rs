//! Canonical identifiers for doctors, patients and appointments.
//!
//! Every identifier careslot hands out or accepts is a v4 UUID rendered in *canonical* form:
//! **32 lowercase hexadecimal characters** with no hyphens, e.g.
//! `550e8400e29b41d4a716446655440000`.
//!
//! Canonical form is required for externally supplied identifiers (path segments, the
//! `x-user-id` header, CLI arguments). Hyphenated or uppercase forms are rejected rather than
//! normalised so that the same entity can never appear under two spellings in the stores.
//!
//! Each entity gets its own newtype ([`DoctorId`], [`PatientId`], [`AppointmentId`]) so a patient
//! id can never be passed where a doctor id is expected.

mod id;

pub use id::{AppointmentId, CanonicalId, DoctorId, PatientId};

/// Error type for identifier parsing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdError {
    /// Input was not a canonical identifier
    #[error("invalid {kind} id: expected 32 lowercase hex characters without hyphens, got '{input}'")]
    InvalidInput { kind: &'static str, input: String },
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;
