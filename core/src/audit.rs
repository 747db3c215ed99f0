//! Audit trail types.
//!
//! The audit recorder is a pure sink: privileged state changes append one
//! immutable entry each, within the same transaction as the change they
//! describe. Entries are never mutated or deleted.

use crate::state::{Actor, Provenance};
use serde_json::Value;
use uuid::Uuid;

/// Audit action tags.
pub mod actions {
    /// An event was created.
    pub const EVENT_CREATED: &str = "event_created";
    /// An event was updated.
    pub const EVENT_UPDATED: &str = "event_updated";
    /// A stored participant counter was repaired against a recount.
    pub const CAPACITY_RECONCILED: &str = "capacity_reconciled";

    /// Tag for a regular registration transition, e.g.
    /// `registration_accepted`.
    #[must_use]
    pub fn registration_transition(status: crate::state::RegistrationStatus) -> String {
        format!("registration_{}", status.as_str())
    }

    /// Tag for a developer override transition, e.g.
    /// `registration_override_accepted`.
    #[must_use]
    pub fn registration_override(status: crate::state::RegistrationStatus) -> String {
        format!("registration_override_{}", status.as_str())
    }
}

/// Target entity kinds.
pub mod targets {
    /// An event.
    pub const EVENT: &str = "event";
    /// A registration.
    pub const REGISTRATION: &str = "registration";
}

/// A not-yet-persisted audit entry.
///
/// Built by the services and handed to the store, which assigns the id and
/// timestamp when it persists the entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    /// The acting admin or developer.
    pub actor_id: crate::state::UserId,

    /// Free-form action tag.
    pub action: String,

    /// Kind of the target entity.
    pub target_type: &'static str,

    /// Id of the target entity.
    pub target_id: Uuid,

    /// Structured detail payload.
    pub details: Value,

    /// Request provenance.
    pub provenance: Provenance,
}

impl NewAuditEntry {
    /// Create an entry for `actor` acting on the given target.
    #[must_use]
    pub fn new(
        actor: Actor,
        action: impl Into<String>,
        target_type: &'static str,
        target_id: Uuid,
    ) -> Self {
        Self {
            actor_id: actor.user_id,
            action: action.into(),
            target_type,
            target_id,
            details: Value::Object(serde_json::Map::new()),
            provenance: Provenance::default(),
        }
    }

    /// Attach a structured detail payload.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Attach request provenance.
    #[must_use]
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }
}

/// Filter for querying the audit trail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditFilter {
    /// Only entries by this actor.
    pub actor_id: Option<crate::state::UserId>,

    /// Only entries with this action tag.
    pub action: Option<String>,

    /// Only entries on this target kind.
    pub target_type: Option<String>,

    /// Maximum number of entries returned, newest first.
    pub limit: Option<u32>,
}
