use crate::dto::HealthRes;

/// Liveness answer served by the REST API.
pub struct HealthService;

impl HealthService {
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "careslot is alive".into(),
        }
    }
}
