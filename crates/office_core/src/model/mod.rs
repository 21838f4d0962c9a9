//! Office domain model.
//!
//! # Responsibility
//! - Define the canonical office record and hierarchy path types.
//! - Keep field validation independent from storage and transport.
//!
//! # Invariants
//! - Every office is identified by a storage-assigned `OfficeId`.
//! - Offices are never deleted; there is no tombstone state.

pub mod hierarchy;
pub mod office;
