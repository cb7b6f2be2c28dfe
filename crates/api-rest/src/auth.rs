//! Request guards: the shared API key and the caller's identity headers.

use crate::{error::ApiError, AppState};
use api_shared::auth::{validate_api_key, Caller};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use careslot_core::{DoctorId, PatientId};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const USER_ID_HEADER: &str = "x-user-id";

/// Rejects the request unless it carries the configured API key.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    validate_api_key(state.api_key.as_deref(), provided)?;
    Ok(next.run(req).await)
}

fn caller(parts: &Parts) -> Result<Caller, ApiError> {
    let header = parts
        .headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok());
    Ok(Caller::from_header(header)?)
}

/// The calling patient.
pub struct PatientCaller(pub PatientId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for PatientCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(caller(parts)?.as_patient()?))
    }
}

/// The calling doctor.
pub struct DoctorCaller(pub DoctorId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for DoctorCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(caller(parts)?.as_doctor()?))
    }
}
