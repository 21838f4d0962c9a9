//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into office use-cases.
//! - Keep the request boundary decoupled from storage details.

pub mod office_service;
