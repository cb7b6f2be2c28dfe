//! # careslot Core
//!
//! Core business logic for doctor appointment slot booking.
//!
//! This crate contains pure domain operations and their persistence:
//! - [`slots`]: per-doctor slot records keyed by `(date, time)`
//! - [`capacity`]: the only code that changes a slot's booking count
//! - [`ledger`]: appointment records and their lifecycle
//! - [`coordinator`]: booking and cancellation spanning capacity and ledger
//! - [`doctors`]: doctor profiles and specializations
//! - [`snapshot`]: YAML persistence of all of the above
//!
//! **No API concerns**: authentication, HTTP servers, and wire DTOs belong in `api-rest` and
//! `api-shared`.

pub mod capacity;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod doctors;
pub mod error;
pub mod ledger;
mod locks;
pub mod seed;
pub mod service;
pub mod slots;
pub mod snapshot;

pub use config::CoreConfig;
pub use constants::{DEFAULT_DATA_DIR, SLOT_CAPACITY};
pub use doctors::DoctorProfile;
pub use error::{BookingError, BookingResult};
pub use ledger::{Appointment, AppointmentStatus};
pub use service::{today, BookingService, DoctorDashboard};
pub use slots::{AvailableSlot, Slot, SlotKey};

pub use careslot_ids::{AppointmentId, DoctorId, PatientId};
pub use careslot_types::{SlotDate, SlotTime};
