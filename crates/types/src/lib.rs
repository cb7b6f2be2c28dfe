//! Validated text types shared across careslot.
//!
//! Slot keys arrive as strings from HTTP bodies, path segments and CLI arguments. The types in
//! this crate parse them once at the boundary so that the core never has to re-check a date or a
//! time.

use chrono::{NaiveDate, NaiveTime, Weekday};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input was not a calendar date in `YYYY-MM-DD` form
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    /// The input was not a wall-clock time in `HH:MM` form
    #[error("invalid time '{0}', expected HH:MM")]
    InvalidTime(String),
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Calendar day of a slot, always rendered as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotDate(NaiveDate);

impl SlotDate {
    const FORMAT: &'static str = "%Y-%m-%d";

    /// Parses a zero-padded `YYYY-MM-DD` string.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::InvalidDate`] for anything else, including unpadded forms such as
    /// `2025-6-1` which chrono would otherwise accept.
    pub fn parse(input: &str) -> Result<Self, TextError> {
        let input = input.trim();
        if input.len() != 10 {
            return Err(TextError::InvalidDate(input.to_owned()));
        }
        NaiveDate::parse_from_str(input, Self::FORMAT)
            .map(Self)
            .map_err(|_| TextError::InvalidDate(input.to_owned()))
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn naive(&self) -> NaiveDate {
        self.0
    }

    pub fn weekday(&self) -> Weekday {
        use chrono::Datelike;
        self.0.weekday()
    }

    /// Returns the date `days` calendar days later, or `None` on overflow.
    pub fn plus_days(&self, days: u32) -> Option<Self> {
        self.0
            .checked_add_days(chrono::Days::new(u64::from(days)))
            .map(Self)
    }
}

impl fmt::Display for SlotDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl FromStr for SlotDate {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Wall-clock start time of a slot, always rendered as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    const FORMAT: &'static str = "%H:%M";

    /// Parses a zero-padded 24-hour `HH:MM` string.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::InvalidTime`] if the input is not exactly five characters or does not
    /// name a valid time of day.
    pub fn parse(input: &str) -> Result<Self, TextError> {
        let input = input.trim();
        if input.len() != 5 {
            return Err(TextError::InvalidTime(input.to_owned()));
        }
        NaiveTime::parse_from_str(input, Self::FORMAT)
            .map(Self)
            .map_err(|_| TextError::InvalidTime(input.to_owned()))
    }

    /// Builds a time from an hour and minute pair.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::InvalidTime`] when `hour > 23` or `minute > 59`.
    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, TextError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(|| TextError::InvalidTime(format!("{hour}:{minute}")))
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl FromStr for SlotTime {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(SlotDate);
string_serde!(SlotTime);

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_and_rejects_blank() {
        assert_eq!(NonEmptyText::new("  cardiology ").unwrap().as_str(), "cardiology");
        assert_eq!(NonEmptyText::new("   ").unwrap_err(), TextError::Empty);
    }

    #[test]
    fn slot_date_requires_padded_iso_form() {
        let date = SlotDate::parse("2025-06-01").expect("valid date");
        assert_eq!(date.to_string(), "2025-06-01");

        for bad in ["2025-6-1", "2025/06/01", "2025-02-30", "", "tomorrow"] {
            match SlotDate::parse(bad) {
                Err(TextError::InvalidDate(_)) => {}
                other => panic!("expected InvalidDate for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn slot_date_orders_chronologically_and_adds_days() {
        let a = SlotDate::parse("2025-06-30").unwrap();
        let b = a.plus_days(1).unwrap();
        assert_eq!(b.to_string(), "2025-07-01");
        assert!(a < b);
    }

    #[test]
    fn slot_time_requires_padded_24h_form() {
        assert_eq!(SlotTime::parse("09:30").unwrap().to_string(), "09:30");
        assert_eq!(SlotTime::from_hm(17, 0).unwrap().to_string(), "17:00");

        for bad in ["9:30", "24:00", "10:60", "10:00:00", "noon"] {
            match SlotTime::parse(bad) {
                Err(TextError::InvalidTime(_)) => {}
                other => panic!("expected InvalidTime for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn serde_uses_string_forms() {
        let json = serde_json::to_string(&SlotTime::parse("22:00").unwrap()).unwrap();
        assert_eq!(json, "\"22:00\"");

        let parsed: SlotDate = serde_json::from_str("\"2025-12-31\"").unwrap();
        assert_eq!(parsed.to_string(), "2025-12-31");

        let err = serde_json::from_str::<SlotDate>("\"31-12-2025\"").unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }
}
