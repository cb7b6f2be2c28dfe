use api_shared::{AuthError, ErrorKind, ErrorRes};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use careslot_core::BookingError;

/// Failure of a REST handler, rendered as a status code and an [`ErrorRes`] body.
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    Booking(BookingError),
    /// A blocking service call panicked or was cancelled.
    Join(tokio::task::JoinError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join(err)
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        Self::Booking(err)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput
        | ErrorKind::DuplicateSlot
        | ErrorKind::DuplicateBooking
        | ErrorKind::AlreadyCancelled
        | ErrorKind::InvalidTransition => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::DoctorNotFound | ErrorKind::SlotNotFound | ErrorKind::NotFound => {
            StatusCode::NOT_FOUND
        }
        ErrorKind::SlotFull => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::Auth(e) => ErrorRes::new(ErrorKind::Unauthorized, e.to_string()),
            ApiError::Booking(e) => {
                let body = ErrorRes::from(e);
                if body.kind == ErrorKind::Internal {
                    tracing::error!("request failed: {e:?}");
                } else {
                    tracing::debug!("request rejected: {e}");
                }
                body
            }
            ApiError::Join(e) => {
                tracing::error!("service call did not complete: {e}");
                ErrorRes::new(ErrorKind::Internal, "internal error")
            }
        };
        (status_for(body.kind), Json(body)).into_response()
    }
}
