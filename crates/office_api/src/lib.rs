//! Request boundary for the office registry.
//!
//! Wraps `office_core::OfficeRegistry` with JSON payload parsing,
//! credential presence checks and HTTP status mapping.

pub mod api;
pub mod auth;
pub mod wire;

pub use api::{ApiErrorBody, ApiParameterError, ApiResponse, OfficeApi};
pub use auth::{AuthError, AuthScheme, RequestContext};
pub use wire::OfficePayload;

pub use http::StatusCode;
