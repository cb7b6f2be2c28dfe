//! # API Shared
//!
//! Shared utilities and definitions for careslot APIs.
//!
//! Contains:
//! - Wire DTOs (`dto` module) with OpenAPI schemas
//! - Shared services like `HealthService`
//! - Authentication utilities (API key and caller identity)
//!
//! Used by `api-rest`.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{AuthError, Caller};
pub use dto::*;
pub use health::HealthService;
