//! API key checks and caller identity.
//!
//! Identity is issued by an upstream auth layer. By the time a request reaches careslot the
//! caller is already authenticated; all that is left is to read who they are and, optionally,
//! check the shared API key that fronts the service.

use careslot_core::{DoctorId, PatientId};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing x-api-key header")]
    MissingApiKey,
    #[error("invalid API key")]
    InvalidApiKey,
    #[error("missing x-user-id header")]
    MissingCaller,
    #[error("invalid caller id: {0}")]
    InvalidCaller(String),
}

/// Validates the provided API key against the expected one.
///
/// When no key is configured every request is accepted.
pub fn validate_api_key(expected: Option<&str>, provided: Option<&str>) -> Result<(), AuthError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    match provided {
        None => Err(AuthError::MissingApiKey),
        Some(key) if key == expected => Ok(()),
        Some(_) => Err(AuthError::InvalidApiKey),
    }
}

/// The authenticated caller, as a canonical id string from the `x-user-id` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller(String);

impl Caller {
    pub fn from_header(value: Option<&str>) -> Result<Self, AuthError> {
        let value = value.map(str::trim).filter(|v| !v.is_empty());
        value
            .map(|v| Self(v.to_owned()))
            .ok_or(AuthError::MissingCaller)
    }

    pub fn as_patient(&self) -> Result<PatientId, AuthError> {
        PatientId::parse(&self.0).map_err(|e| AuthError::InvalidCaller(e.to_string()))
    }

    pub fn as_doctor(&self) -> Result<DoctorId, AuthError> {
        DoctorId::parse(&self.0).map_err(|e| AuthError::InvalidCaller(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_is_optional_until_configured() {
        assert_eq!(validate_api_key(None, None), Ok(()));
        assert_eq!(validate_api_key(Some("k"), Some("k")), Ok(()));
        assert_eq!(
            validate_api_key(Some("k"), None),
            Err(AuthError::MissingApiKey)
        );
        assert_eq!(
            validate_api_key(Some("k"), Some("nope")),
            Err(AuthError::InvalidApiKey)
        );
    }

    #[test]
    fn caller_requires_header_and_canonical_id() {
        assert_eq!(Caller::from_header(None), Err(AuthError::MissingCaller));
        assert_eq!(Caller::from_header(Some("  ")), Err(AuthError::MissingCaller));

        let caller = Caller::from_header(Some("550e8400e29b41d4a716446655440000")).unwrap();
        assert!(caller.as_patient().is_ok());
        assert!(caller.as_doctor().is_ok());

        let bad = Caller::from_header(Some("550e8400-e29b-41d4-a716-446655440000")).unwrap();
        assert!(matches!(bad.as_patient(), Err(AuthError::InvalidCaller(_))));
    }
}
