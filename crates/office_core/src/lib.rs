//! Core domain logic for the office registry.
//! This crate is the single source of truth for office invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod registry;
pub mod repo;
pub mod service;

pub use config::RegistryConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::hierarchy::{Hierarchy, HierarchyParseError};
pub use model::office::{
    CreateOfficeRequest, NewOffice, Office, OfficeChanges, OfficeField, OfficeId,
    OfficeValidationError, EXTERNAL_ID_MAX_CHARS, NAME_MAX_CHARS,
};
pub use registry::{system_today, Clock, OfficeRegistry};
pub use repo::office_repo::{
    OfficeRepository, RepoError, RepoResult, SqliteOfficeRepository, UniqueKey,
};
pub use service::office_service::{
    OfficeLookup, OfficeResult, OfficeService, OfficeServiceError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
