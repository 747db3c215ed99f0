//! Event management.
//!
//! Straightforward data access with audit entries: admins create events as
//! drafts, publish them to open registration, and may cancel or complete
//! them. No capacity logic lives here; the ledger owns the counter.

use crate::audit::{actions, targets, NewAuditEntry};
use crate::error::{CoreError, Result};
use crate::providers::{Clock, RegistrationStore};
use crate::services::registrations::require;
use crate::state::{
    Actor, Capability, Event, EventId, EventStatus, Money, Provenance, Role,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

/// Fields of a new event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventDraft {
    /// Title.
    pub title: String,
    /// Optional long description.
    pub description: Option<String>,
    /// When the event takes place.
    pub event_date: DateTime<Utc>,
    /// Registration cut-off.
    pub registration_deadline: DateTime<Utc>,
    /// Whether accepted registrations require payment.
    #[serde(default)]
    pub is_paid: bool,
    /// Price per participant, minor units.
    #[serde(default)]
    pub price: Money,
    /// Participant cap; `None` means unlimited.
    pub max_participants: Option<u32>,
    /// Registration form schema; opaque to the core.
    pub form_schema: Option<serde_json::Value>,
}

/// Partial update of an event; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EventPatch {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New event date.
    pub event_date: Option<DateTime<Utc>>,
    /// New registration cut-off.
    pub registration_deadline: Option<DateTime<Utc>>,
    /// New paid flag.
    pub is_paid: Option<bool>,
    /// New price.
    pub price: Option<Money>,
    /// New participant cap.
    pub max_participants: Option<u32>,
    /// New form schema.
    pub form_schema: Option<serde_json::Value>,
    /// New lifecycle status.
    pub status: Option<EventStatus>,
}

/// Event management service.
#[derive(Debug, Clone)]
pub struct EventService<S, C> {
    store: S,
    clock: C,
}

impl<S, C> EventService<S, C>
where
    S: RegistrationStore,
    C: Clock,
{
    /// Create the service.
    #[must_use]
    pub const fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Create a draft event owned by `actor`.
    ///
    /// # Errors
    ///
    /// `Forbidden` or `Storage`.
    pub async fn create_event(
        &self,
        actor: Actor,
        draft: EventDraft,
        provenance: Provenance,
    ) -> Result<Event> {
        require(actor, Capability::ManageEvents)?;

        let now = self.clock.now();
        let event = Event {
            id: EventId::new(),
            title: draft.title,
            description: draft.description,
            event_date: draft.event_date,
            registration_deadline: draft.registration_deadline,
            is_paid: draft.is_paid,
            price: draft.price,
            max_participants: draft.max_participants,
            current_participants: 0,
            status: EventStatus::Draft,
            created_by: actor.user_id,
            form_schema: draft.form_schema,
            created_at: now,
            updated_at: now,
        };

        let audit = NewAuditEntry::new(actor, actions::EVENT_CREATED, targets::EVENT, event.id.0)
            .with_details(json!({ "title": event.title }))
            .with_provenance(provenance);

        let event = self.store.insert_event(&event, audit).await?;
        tracing::info!(event_id = %event.id, owner = %actor.user_id, "event created");
        Ok(event)
    }

    /// Update an event's fields and lifecycle status.
    ///
    /// Admins may update only events they own; developers may update any.
    /// Status moves are validated: `Draft → Published | Cancelled`,
    /// `Published → Cancelled | Completed`; cancelled and completed events
    /// are final.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `NotFound`, `InvalidState`, or `Storage`.
    pub async fn update_event(
        &self,
        actor: Actor,
        event_id: EventId,
        patch: EventPatch,
        provenance: Provenance,
    ) -> Result<Event> {
        require(actor, Capability::ManageEvents)?;

        let mut event = self
            .store
            .event(event_id)
            .await?
            .ok_or_else(|| CoreError::not_found("event", event_id))?;

        if actor.role == Role::Admin && event.created_by != actor.user_id {
            return Err(CoreError::Forbidden {
                required: Capability::ManageEvents.name(),
            });
        }

        if let Some(status) = patch.status {
            if status != event.status && !status_move_allowed(event.status, status) {
                return Err(CoreError::invalid_state(format!(
                    "cannot move event from {} to {}",
                    event.status.as_str(),
                    status.as_str()
                )));
            }
        }

        let changed = apply_patch(&mut event, &patch);
        event.updated_at = self.clock.now();

        let audit = NewAuditEntry::new(actor, actions::EVENT_UPDATED, targets::EVENT, event.id.0)
            .with_details(serde_json::Value::Object(changed))
            .with_provenance(provenance);

        let event = self.store.update_event(&event, audit).await?;
        tracing::info!(event_id = %event.id, actor = %actor.user_id, "event updated");
        Ok(event)
    }
}

/// Whether the lifecycle move is legal (same-status moves are filtered out
/// by the caller).
const fn status_move_allowed(from: EventStatus, to: EventStatus) -> bool {
    matches!(
        (from, to),
        (
            EventStatus::Draft,
            EventStatus::Published | EventStatus::Cancelled
        ) | (
            EventStatus::Published,
            EventStatus::Cancelled | EventStatus::Completed
        )
    )
}

/// Apply the patch, returning the changed fields for the audit payload.
fn apply_patch(event: &mut Event, patch: &EventPatch) -> serde_json::Map<String, serde_json::Value> {
    let mut changed = serde_json::Map::new();
    if let Some(title) = &patch.title {
        event.title = title.clone();
        changed.insert("title".into(), json!(title));
    }
    if let Some(description) = &patch.description {
        event.description = Some(description.clone());
        changed.insert("description".into(), json!(description));
    }
    if let Some(event_date) = patch.event_date {
        event.event_date = event_date;
        changed.insert("event_date".into(), json!(event_date));
    }
    if let Some(deadline) = patch.registration_deadline {
        event.registration_deadline = deadline;
        changed.insert("registration_deadline".into(), json!(deadline));
    }
    if let Some(is_paid) = patch.is_paid {
        event.is_paid = is_paid;
        changed.insert("is_paid".into(), json!(is_paid));
    }
    if let Some(price) = patch.price {
        event.price = price;
        changed.insert("price".into(), json!(price.minor_units()));
    }
    if let Some(max) = patch.max_participants {
        event.max_participants = Some(max);
        changed.insert("max_participants".into(), json!(max));
    }
    if let Some(schema) = &patch.form_schema {
        event.form_schema = Some(schema.clone());
        changed.insert("form_schema".into(), schema.clone());
    }
    if let Some(status) = patch.status {
        event.status = status;
        changed.insert("status".into(), json!(status.as_str()));
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_publishes_but_never_unpublishes() {
        assert!(status_move_allowed(
            EventStatus::Draft,
            EventStatus::Published
        ));
        assert!(status_move_allowed(
            EventStatus::Published,
            EventStatus::Completed
        ));
        assert!(status_move_allowed(
            EventStatus::Published,
            EventStatus::Cancelled
        ));
        assert!(!status_move_allowed(
            EventStatus::Published,
            EventStatus::Draft
        ));
        assert!(!status_move_allowed(
            EventStatus::Cancelled,
            EventStatus::Published
        ));
        assert!(!status_move_allowed(
            EventStatus::Completed,
            EventStatus::Published
        ));
    }
}
