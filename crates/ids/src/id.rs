use crate::{IdError, IdResult};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// A UUID that is guaranteed to render in canonical form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalId(Uuid);

impl CanonicalId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns true if `input` is 32 bytes of `0-9a-f`.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    fn parse_as(kind: &'static str, input: &str) -> IdResult<Self> {
        let invalid = || IdError::InvalidInput {
            kind,
            input: input.to_owned(),
        };
        if !Self::is_canonical(input) {
            return Err(invalid());
        }
        Uuid::parse_str(input).map(Self).map_err(|_| invalid())
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(CanonicalId);

        impl $name {
            /// Allocates a new identifier.
            pub fn generate() -> Self {
                Self(CanonicalId::generate())
            }

            /// Validates an externally supplied identifier.
            ///
            /// # Errors
            ///
            /// Returns [`IdError::InvalidInput`] if `input` is not canonical.
            pub fn parse(input: &str) -> IdResult<Self> {
                CanonicalId::parse_as($kind, input).map(Self)
            }

            pub fn canonical(&self) -> CanonicalId {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        #[cfg(feature = "serde")]
        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.collect_str(self)
            }
        }

        #[cfg(feature = "serde")]
        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

typed_id!(
    /// Identifier of a doctor profile.
    DoctorId,
    "doctor"
);
typed_id!(
    /// Identifier of a patient, as resolved by the upstream auth layer.
    PatientId,
    "patient"
);
typed_id!(
    /// Identifier of an appointment record.
    AppointmentId,
    "appointment"
);
