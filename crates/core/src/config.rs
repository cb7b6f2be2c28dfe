//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. Request
//! handling never reads environment variables.

use crate::constants::{
    DEFAULT_BOOKING_WINDOW_DAYS, MAX_BOOKING_WINDOW_DAYS, SNAPSHOT_FILENAME,
};
use crate::{BookingError, BookingResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: Option<PathBuf>,
    booking_window_days: u32,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `data_dir` of `None` keeps all state in memory; nothing is written to disk.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidInput`] if `booking_window_days` is zero or larger than
    /// [`MAX_BOOKING_WINDOW_DAYS`].
    pub fn new(data_dir: Option<PathBuf>, booking_window_days: u32) -> BookingResult<Self> {
        validate_window_days(booking_window_days)?;

        Ok(Self {
            data_dir,
            booking_window_days,
        })
    }

    /// In-memory configuration with the default booking window.
    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            booking_window_days: DEFAULT_BOOKING_WINDOW_DAYS,
        }
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(SNAPSHOT_FILENAME))
    }

    pub fn booking_window_days(&self) -> u32 {
        self.booking_window_days
    }
}

/// Checks a look-ahead window against the accepted range.
pub fn validate_window_days(days: u32) -> BookingResult<()> {
    if days == 0 || days > MAX_BOOKING_WINDOW_DAYS {
        return Err(BookingError::InvalidInput(format!(
            "booking window must be between 1 and {MAX_BOOKING_WINDOW_DAYS} days, got {days}"
        )));
    }
    Ok(())
}

/// Checks a caller-supplied look-ahead. Zero means today only.
pub fn validate_lookahead_days(days: u32) -> BookingResult<()> {
    if days > MAX_BOOKING_WINDOW_DAYS {
        return Err(BookingError::InvalidInput(format!(
            "look-ahead must be at most {MAX_BOOKING_WINDOW_DAYS} days, got {days}"
        )));
    }
    Ok(())
}

/// Parse the booking window from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_BOOKING_WINDOW_DAYS`].
pub fn booking_window_days_from_env_value(value: Option<String>) -> BookingResult<u32> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let days = match value {
        Some(v) => v.parse::<u32>().map_err(|_| {
            BookingError::InvalidInput(format!("booking window is not a whole number: '{v}'"))
        })?,
        None => DEFAULT_BOOKING_WINDOW_DAYS,
    };

    validate_window_days(days)?;
    Ok(days)
}

/// Make sure the data directory exists, creating it when missing.
///
/// # Errors
///
/// Returns [`BookingError::InvalidInput`] if the path exists but is not a directory, or
/// [`BookingError::DataDirCreation`] if it cannot be created.
pub fn prepare_data_dir(path: &Path) -> BookingResult<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(BookingError::InvalidInput(format!(
                "data path is not a directory: {}",
                path.display()
            )));
        }
        return Ok(());
    }

    std::fs::create_dir_all(path).map_err(BookingError::DataDirCreation)?;
    tracing::info!("created data directory {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_defaults_when_unset_or_blank() {
        assert_eq!(booking_window_days_from_env_value(None).unwrap(), 7);
        assert_eq!(
            booking_window_days_from_env_value(Some("  ".into())).unwrap(),
            7
        );
        assert_eq!(
            booking_window_days_from_env_value(Some(" 14 ".into())).unwrap(),
            14
        );
    }

    #[test]
    fn window_rejects_out_of_range_and_garbage() {
        for bad in ["0", "366", "-1", "week"] {
            match booking_window_days_from_env_value(Some(bad.into())) {
                Err(BookingError::InvalidInput(_)) => {}
                other => panic!("expected InvalidInput for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn lookahead_accepts_today_only() {
        assert!(validate_lookahead_days(0).is_ok());
        assert!(validate_lookahead_days(MAX_BOOKING_WINDOW_DAYS).is_ok());
        assert!(matches!(
            validate_lookahead_days(MAX_BOOKING_WINDOW_DAYS + 1),
            Err(BookingError::InvalidInput(_))
        ));
        assert!(validate_window_days(0).is_err());
    }

    #[test]
    fn snapshot_path_only_when_data_dir_set() {
        assert!(CoreConfig::in_memory().snapshot_path().is_none());

        let cfg = CoreConfig::new(Some(PathBuf::from("/tmp/x")), 7).unwrap();
        assert_eq!(
            cfg.snapshot_path().unwrap(),
            PathBuf::from("/tmp/x").join(SNAPSHOT_FILENAME)
        );
    }

    #[test]
    fn prepare_data_dir_creates_and_rejects_files() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        prepare_data_dir(&nested).expect("create nested dir");
        assert!(nested.is_dir());

        let file = tmp.path().join("file");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(
            prepare_data_dir(&file),
            Err(BookingError::InvalidInput(_))
        ));
    }
}
