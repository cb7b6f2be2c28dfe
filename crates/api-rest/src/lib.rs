//! # API REST
//!
//! REST API implementation for careslot.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, identity headers)
//!
//! Uses `api-shared` for wire types and `careslot-core` for every booking rule.

#![warn(rust_2018_idioms)]

pub mod auth;
pub mod error;

use api_shared::{
    AppointmentListRes, AppointmentRes, AvailableSlotRes, AvailableSlotsQuery,
    BookAppointmentReq, DashboardRes, DoctorListRes, DoctorRes, ErrorKind, ErrorRes,
    HealthRes, HealthService, SetSpecializationReq, SlotListRes, SlotReq, SlotRes,
    SpecialtiesRes,
};
use auth::{DoctorCaller, PatientCaller};
use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post, put},
    Router,
};
use careslot_core::{AppointmentId, BookingError, BookingService, DoctorId};
use error::ApiError;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: BookingService,
    /// Key expected in `x-api-key`; `None` disables the check.
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(service: BookingService, api_key: Option<String>) -> Self {
        Self {
            service,
            api_key: api_key.filter(|k| !k.is_empty()).map(Arc::from),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        set_specialization,
        list_specialties,
        doctors_by_specialty,
        doctor_dashboard,
        add_slot,
        remove_slot,
        available_slots,
        available_slots_on,
        book_appointment,
        my_appointments,
        cancel_appointment,
        mark_treated,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        ErrorKind,
        SetSpecializationReq,
        DoctorRes,
        DoctorListRes,
        SpecialtiesRes,
        DashboardRes,
        SlotReq,
        SlotRes,
        SlotListRes,
        AvailableSlotRes,
        BookAppointmentReq,
        AppointmentRes,
        AppointmentListRes,
    ))
)]
pub struct ApiDoc;

/// Builds the full REST application.
///
/// `/health` and the OpenAPI documents are open; every other route sits behind the API key check
/// when a key is configured.
pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/doctors/specialization", put(set_specialization))
        .route("/doctors/specialties", get(list_specialties))
        .route("/doctors/specialty/:specialty", get(doctors_by_specialty))
        .route("/doctors/dashboard", get(doctor_dashboard))
        .route(
            "/slots",
            get(available_slots).post(add_slot).delete(remove_slot),
        )
        .route("/slots/:doctor_id/:date", get(available_slots_on))
        .route("/appointments", post(book_appointment))
        .route("/appointments/mine", get(my_appointments))
        .route("/appointments/:id/cancel", put(cancel_appointment))
        .route("/appointments/:id/treated", put(mark_treated))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Runs a service call on the blocking pool; mutations write the snapshot to disk.
async fn blocking<T, F>(state: &AppState, call: F) -> Result<T, ApiError>
where
    F: FnOnce(&BookingService) -> Result<T, BookingError> + Send + 'static,
    T: Send + 'static,
{
    let service = state.service.clone();
    Ok(tokio::task::spawn_blocking(move || call(&service)).await??)
}

fn parse_appointment_id(id: &str) -> Result<AppointmentId, ApiError> {
    Ok(AppointmentId::parse(id).map_err(BookingError::from)?)
}

fn parse_doctor_id(id: &str) -> Result<DoctorId, ApiError> {
    Ok(DoctorId::parse(id).map_err(BookingError::from)?)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint, used by monitoring and load balancers.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

// ----------------------------------------------------------------------
// Doctors
// ----------------------------------------------------------------------

#[utoipa::path(
    put,
    path = "/doctors/specialization",
    request_body = SetSpecializationReq,
    responses(
        (status = 200, description = "Doctor profile created or updated", body = DoctorRes),
        (status = 400, description = "Empty specialization", body = ErrorRes),
        (status = 401, description = "Missing caller identity", body = ErrorRes)
    )
)]
/// Sets the calling doctor's specialization, creating their profile on first use.
#[axum::debug_handler]
async fn set_specialization(
    State(state): State<AppState>,
    DoctorCaller(doctor_id): DoctorCaller,
    Json(req): Json<SetSpecializationReq>,
) -> Result<Json<DoctorRes>, ApiError> {
    let profile = blocking(&state, move |service| {
        service.set_specialization(doctor_id, &req.specialization)
    })
    .await?;
    Ok(Json(profile.into()))
}

#[utoipa::path(
    get,
    path = "/doctors/specialties",
    responses(
        (status = 200, description = "Distinct specialties", body = SpecialtiesRes)
    )
)]
#[axum::debug_handler]
async fn list_specialties(State(state): State<AppState>) -> Json<SpecialtiesRes> {
    Json(SpecialtiesRes {
        specialties: state.service.specialties(),
    })
}

#[utoipa::path(
    get,
    path = "/doctors/specialty/{specialty}",
    params(("specialty" = String, Path, description = "Specialty name")),
    responses(
        (status = 200, description = "Doctors with that specialty", body = DoctorListRes)
    )
)]
#[axum::debug_handler]
async fn doctors_by_specialty(
    State(state): State<AppState>,
    AxumPath(specialty): AxumPath<String>,
) -> Json<DoctorListRes> {
    let doctors = state.service.doctors_by_specialty(&specialty);
    Json(DoctorListRes {
        doctors: doctors.into_iter().map(Into::into).collect(),
    })
}

#[utoipa::path(
    get,
    path = "/doctors/dashboard",
    responses(
        (status = 200, description = "Profile, slots and appointments", body = DashboardRes),
        (status = 401, description = "Missing caller identity", body = ErrorRes),
        (status = 404, description = "Doctor has no profile", body = ErrorRes)
    )
)]
/// The calling doctor's profile, every published slot and every appointment.
#[axum::debug_handler]
async fn doctor_dashboard(
    State(state): State<AppState>,
    DoctorCaller(doctor_id): DoctorCaller,
) -> Result<Json<DashboardRes>, ApiError> {
    let dashboard = state.service.doctor_dashboard(doctor_id)?;
    Ok(Json(dashboard.into()))
}

// ----------------------------------------------------------------------
// Slots
// ----------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/slots",
    request_body = SlotReq,
    responses(
        (status = 201, description = "Slot added; the doctor's updated slot list", body = SlotListRes),
        (status = 400, description = "Invalid date or time, or duplicate slot", body = ErrorRes),
        (status = 401, description = "Missing caller identity", body = ErrorRes),
        (status = 404, description = "Doctor has no profile", body = ErrorRes)
    )
)]
/// Publishes a slot for the calling doctor.
#[axum::debug_handler]
async fn add_slot(
    State(state): State<AppState>,
    DoctorCaller(doctor_id): DoctorCaller,
    Json(req): Json<SlotReq>,
) -> Result<(StatusCode, Json<SlotListRes>), ApiError> {
    let slots = blocking(&state, move |service| {
        service.add_slot(doctor_id, &req.date, &req.time)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(slots.into())))
}

#[utoipa::path(
    delete,
    path = "/slots",
    request_body = SlotReq,
    responses(
        (status = 200, description = "Slot removed; the doctor's remaining slots", body = SlotListRes),
        (status = 400, description = "Invalid date or time", body = ErrorRes),
        (status = 401, description = "Missing caller identity", body = ErrorRes),
        (status = 404, description = "Doctor has no profile", body = ErrorRes)
    )
)]
/// Withdraws one of the calling doctor's slots.
///
/// Removing a slot that does not exist is not an error. Appointments already booked on the slot
/// are left untouched.
#[axum::debug_handler]
async fn remove_slot(
    State(state): State<AppState>,
    DoctorCaller(doctor_id): DoctorCaller,
    Json(req): Json<SlotReq>,
) -> Result<Json<SlotListRes>, ApiError> {
    let slots = blocking(&state, move |service| {
        service.remove_slot(doctor_id, &req.date, &req.time)
    })
    .await?;
    Ok(Json(slots.into()))
}

#[utoipa::path(
    get,
    path = "/slots",
    params(AvailableSlotsQuery),
    responses(
        (status = 200, description = "Slots with spare capacity", body = [AvailableSlotRes]),
        (status = 400, description = "Invalid doctor id or window", body = ErrorRes),
        (status = 404, description = "Unknown doctor", body = ErrorRes)
    )
)]
/// Bookable slots for a doctor from today through `within_days` days ahead.
#[axum::debug_handler]
async fn available_slots(
    State(state): State<AppState>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Vec<AvailableSlotRes>>, ApiError> {
    let doctor_id = parse_doctor_id(&query.doctor)?;
    let today = careslot_core::today();
    let slots = state
        .service
        .available_slots(doctor_id, today, query.within_days)?;
    Ok(Json(slots.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/slots/{doctor_id}/{date}",
    params(
        ("doctor_id" = String, Path, description = "Doctor id"),
        ("date" = String, Path, description = "Date as YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Slots with spare capacity on that date", body = [AvailableSlotRes]),
        (status = 400, description = "Invalid doctor id or date", body = ErrorRes),
        (status = 404, description = "Unknown doctor", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn available_slots_on(
    State(state): State<AppState>,
    AxumPath((doctor_id, date)): AxumPath<(String, String)>,
) -> Result<Json<Vec<AvailableSlotRes>>, ApiError> {
    let doctor_id = parse_doctor_id(&doctor_id)?;
    let slots = state.service.available_slots_on(doctor_id, &date)?;
    Ok(Json(slots.into_iter().map(Into::into).collect()))
}

// ----------------------------------------------------------------------
// Appointments
// ----------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/appointments",
    request_body = BookAppointmentReq,
    responses(
        (status = 201, description = "Appointment booked", body = AppointmentRes),
        (status = 400, description = "Invalid input or duplicate booking", body = ErrorRes),
        (status = 401, description = "Missing caller identity", body = ErrorRes),
        (status = 404, description = "Unknown doctor or slot", body = ErrorRes),
        (status = 409, description = "Slot is fully booked", body = ErrorRes)
    )
)]
/// Books a place on a slot for the calling patient.
#[axum::debug_handler]
async fn book_appointment(
    State(state): State<AppState>,
    PatientCaller(patient_id): PatientCaller,
    Json(req): Json<BookAppointmentReq>,
) -> Result<(StatusCode, Json<AppointmentRes>), ApiError> {
    let doctor_id = parse_doctor_id(&req.doctor_id)?;
    let appointment = blocking(&state, move |service| {
        service.book(patient_id, doctor_id, &req.date, &req.time)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(appointment.into())))
}

#[utoipa::path(
    get,
    path = "/appointments/mine",
    responses(
        (status = 200, description = "The caller's appointments", body = AppointmentListRes),
        (status = 401, description = "Missing caller identity", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn my_appointments(
    State(state): State<AppState>,
    PatientCaller(patient_id): PatientCaller,
) -> Json<AppointmentListRes> {
    let appointments = state.service.appointments_for_patient(patient_id);
    Json(AppointmentListRes {
        appointments: appointments.into_iter().map(Into::into).collect(),
    })
}

#[utoipa::path(
    put,
    path = "/appointments/{id}/cancel",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment cancelled", body = AppointmentRes),
        (status = 400, description = "Already cancelled", body = ErrorRes),
        (status = 401, description = "Missing caller identity", body = ErrorRes),
        (status = 403, description = "Caller does not own the appointment", body = ErrorRes),
        (status = 404, description = "Unknown appointment", body = ErrorRes)
    )
)]
/// Cancels one of the calling patient's appointments and frees its place.
#[axum::debug_handler]
async fn cancel_appointment(
    State(state): State<AppState>,
    PatientCaller(patient_id): PatientCaller,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<AppointmentRes>, ApiError> {
    let appointment_id = parse_appointment_id(&id)?;
    let appointment =
        blocking(&state, move |service| service.cancel(appointment_id, patient_id)).await?;
    Ok(Json(appointment.into()))
}

#[utoipa::path(
    put,
    path = "/appointments/{id}/treated",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment marked treated", body = AppointmentRes),
        (status = 400, description = "Cancelled or completed appointment", body = ErrorRes),
        (status = 401, description = "Missing caller identity", body = ErrorRes),
        (status = 403, description = "Appointment belongs to another doctor", body = ErrorRes),
        (status = 404, description = "Unknown appointment", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn mark_treated(
    State(state): State<AppState>,
    DoctorCaller(doctor_id): DoctorCaller,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<AppointmentRes>, ApiError> {
    let appointment_id = parse_appointment_id(&id)?;
    let appointment = blocking(&state, move |service| {
        service.mark_treated(doctor_id, appointment_id)
    })
    .await?;
    Ok(Json(appointment.into()))
}
