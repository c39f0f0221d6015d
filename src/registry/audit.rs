//! Append-only audit trail for registry mutations.
//!
//! Entries carry an action tag plus structured payload so callers can replay,
//! log, or inspect the registry's history. Nothing here ever prunes.

use std::time::SystemTime;

use serde::Serialize;
use serde_json::{Map, Value};

/// Registry mutation recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    /// An element was stored (new or re-registered).
    Register,
    /// An element's fields or description changed.
    Update,
    /// A new symmetric relationship edge was added.
    Relate,
    /// An element and its edges were removed.
    Remove,
    /// The whole registry was emptied.
    Clear,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Register => "register",
            AuditAction::Update => "update",
            AuditAction::Relate => "relate",
            AuditAction::Remove => "remove",
            AuditAction::Clear => "clear",
        }
    }
}

/// Structured audit entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub payload: Value,
    #[serde(skip)]
    pub timestamp: SystemTime,
}

/// Builder helper to append payload fields ergonomically.
pub struct AuditEntryBuilder {
    action: AuditAction,
    payload: Map<String, Value>,
}

impl AuditEntryBuilder {
    pub fn new(action: AuditAction) -> Self {
        Self {
            action,
            payload: Map::new(),
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn finish(self) -> AuditEntry {
        AuditEntry {
            action: self.action,
            payload: Value::Object(self.payload),
            timestamp: SystemTime::now(),
        }
    }
}
