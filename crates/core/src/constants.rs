//! Constants used throughout the careslot core crate.

/// Maximum number of live appointments a single slot can hold.
pub const SLOT_CAPACITY: u32 = 4;

/// Default look-ahead, in days, when listing bookable slots.
pub const DEFAULT_BOOKING_WINDOW_DAYS: u32 = 7;

/// Upper bound accepted for any look-ahead window.
pub const MAX_BOOKING_WINDOW_DAYS: u32 = 365;

/// Default directory for the persisted snapshot when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "booking_data";

/// Filename of the YAML snapshot inside the data directory.
pub const SNAPSHOT_FILENAME: &str = "careslot.yaml";

/// Schema version written into every snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Number of days ahead that slot seeding covers by default.
pub const DEFAULT_SEED_DAYS: u32 = 30;

/// First evening clinic slot (hour, minute).
pub const CLINIC_FIRST_SLOT: (u32, u32) = (17, 0);

/// Last evening clinic slot (hour, minute).
pub const CLINIC_LAST_SLOT: (u32, u32) = (22, 0);

/// Spacing between seeded clinic slots.
pub const CLINIC_SLOT_MINUTES: u32 = 30;
