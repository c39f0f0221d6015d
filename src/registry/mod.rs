//! Entity & relationship registry.
//!
//! Callers import registry types from here; storage and resolution live in
//! the private `core` module, the audit trail in `audit`.

pub mod audit;
mod core;

pub use audit::{AuditAction, AuditEntry, AuditEntryBuilder};
pub use core::{EntityRegistry, FUZZY_THRESHOLD, similarity};
