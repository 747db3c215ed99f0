//! In-memory store.
//!
//! Implements [`RegistrationStore`] over a single mutex. Every trait
//! method runs entirely under the lock, so the contract's atomic units
//! (constraint-backed insert, transition + capacity + audit, attempt
//! convergence, confirm CAS) hold under concurrent test load.

use chrono::Utc;
use rsvp_core::audit::{AuditFilter, NewAuditEntry};
use rsvp_core::providers::{
    CapacityReconciliation, ConfirmOutcome, Confirmation, RegistrationStore, TransitionOutcome,
};
use rsvp_core::{
    AttemptStatus, AuditEntry, AuditEntryId, ConfirmationChannel, CoreError, Event, EventId,
    PaymentAttempt, PaymentAttemptId, PaymentStatus, Registration, RegistrationId,
    RegistrationStatus, Result,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    events: HashMap<EventId, Event>,
    registrations: HashMap<RegistrationId, Registration>,
    attempts: HashMap<PaymentAttemptId, PaymentAttempt>,
    audit: Vec<AuditEntry>,
}

/// In-memory [`RegistrationStore`]; clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event directly, bypassing the audited create path.
    pub fn seed_event(&self, event: Event) {
        self.lock().events.insert(event.id, event);
    }

    /// All audit entries, in insertion order.
    #[must_use]
    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.lock().audit.clone()
    }

    /// Number of audit entries with the given action tag.
    #[must_use]
    pub fn audit_count(&self, action: &str) -> usize {
        self.lock().audit.iter().filter(|e| e.action == action).count()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn materialize(entry: NewAuditEntry) -> AuditEntry {
    AuditEntry {
        id: AuditEntryId::new(),
        actor_id: entry.actor_id,
        action: entry.action,
        target_type: entry.target_type.to_string(),
        target_id: entry.target_id,
        details: entry.details,
        ip_address: entry.provenance.ip_address,
        user_agent: entry.provenance.user_agent,
        created_at: Utc::now(),
    }
}

fn clamped_add(current: u32, delta: i32) -> u32 {
    let next = i64::from(current) + i64::from(delta);
    u32::try_from(next.max(0)).unwrap_or(u32::MAX)
}

impl RegistrationStore for InMemoryStore {
    async fn event(&self, id: EventId) -> Result<Option<Event>> {
        Ok(self.lock().events.get(&id).cloned())
    }

    async fn insert_event(&self, event: &Event, audit: NewAuditEntry) -> Result<Event> {
        let mut inner = self.lock();
        inner.events.insert(event.id, event.clone());
        inner.audit.push(materialize(audit));
        Ok(event.clone())
    }

    async fn update_event(&self, event: &Event, audit: NewAuditEntry) -> Result<Event> {
        let mut inner = self.lock();
        let stored = inner
            .events
            .get_mut(&event.id)
            .ok_or_else(|| CoreError::not_found("event", event.id))?;
        // The ledger owns the counter; an event update never writes it.
        let current_participants = stored.current_participants;
        *stored = event.clone();
        stored.current_participants = current_participants;
        let updated = stored.clone();
        inner.audit.push(materialize(audit));
        Ok(updated)
    }

    async fn registration(&self, id: RegistrationId) -> Result<Option<Registration>> {
        Ok(self.lock().registrations.get(&id).cloned())
    }

    async fn insert_registration(&self, registration: &Registration) -> Result<Registration> {
        let mut inner = self.lock();
        let duplicate = inner
            .registrations
            .values()
            .any(|r| r.event_id == registration.event_id && r.user_id == registration.user_id);
        if duplicate {
            return Err(CoreError::conflict("already registered for this event"));
        }
        inner
            .registrations
            .insert(registration.id, registration.clone());
        Ok(registration.clone())
    }

    async fn transition_registration(
        &self,
        id: RegistrationId,
        new_status: RegistrationStatus,
        payment_status: Option<PaymentStatus>,
        audit: NewAuditEntry,
    ) -> Result<TransitionOutcome> {
        let mut inner = self.lock();
        let registration = inner
            .registrations
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("registration", id))?;

        let old_status = registration.status;
        registration.status = new_status;
        if let Some(payment_status) = payment_status {
            registration.payment_status = payment_status;
        }
        registration.updated_at = Utc::now();
        let event_id = registration.event_id;
        let updated = registration.clone();

        let was_accepted = old_status == RegistrationStatus::Accepted;
        let now_accepted = new_status == RegistrationStatus::Accepted;
        if was_accepted != now_accepted {
            let delta = if now_accepted { 1 } else { -1 };
            if let Some(event) = inner.events.get_mut(&event_id) {
                event.current_participants = clamped_add(event.current_participants, delta);
                event.updated_at = Utc::now();
            }
        }

        inner.audit.push(materialize(audit));
        Ok(TransitionOutcome {
            registration: updated,
            old_status,
        })
    }

    async fn active_attempt(
        &self,
        registration_id: RegistrationId,
    ) -> Result<Option<PaymentAttempt>> {
        Ok(self
            .lock()
            .attempts
            .values()
            .find(|a| a.registration_id == registration_id && a.status.is_active())
            .cloned())
    }

    async fn insert_attempt(&self, attempt: &PaymentAttempt) -> Result<PaymentAttempt> {
        let mut inner = self.lock();

        // Mirror of the partial unique index: a concurrent create for the
        // same registration converges on the surviving active attempt.
        if let Some(existing) = inner
            .attempts
            .values()
            .find(|a| a.registration_id == attempt.registration_id && a.status.is_active())
        {
            return Ok(existing.clone());
        }
        if inner.attempts.values().any(|a| a.order_id == attempt.order_id) {
            return Err(CoreError::conflict("order id already exists"));
        }

        inner.attempts.insert(attempt.id, attempt.clone());
        if let Some(registration) = inner.registrations.get_mut(&attempt.registration_id) {
            registration.payment_order_id = Some(attempt.order_id.clone());
            registration.payment_status = PaymentStatus::Pending;
            registration.updated_at = Utc::now();
        }
        Ok(attempt.clone())
    }

    async fn confirm_attempt(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: Option<&str>,
        channel: ConfirmationChannel,
    ) -> Result<Confirmation> {
        let mut inner = self.lock();
        let attempt = inner
            .attempts
            .values_mut()
            .find(|a| a.order_id == order_id)
            .ok_or_else(|| CoreError::not_found("payment attempt", order_id))?;

        let outcome = match attempt.status {
            AttemptStatus::Created => {
                attempt.status = AttemptStatus::Paid;
                attempt.payment_id = Some(payment_id.to_string());
                if let Some(signature) = signature {
                    attempt.signature = Some(signature.to_string());
                }
                ConfirmOutcome::Applied
            }
            AttemptStatus::Paid => ConfirmOutcome::AlreadyPaid,
            AttemptStatus::Failed | AttemptStatus::Refunded => {
                return Err(CoreError::invalid_state(
                    "payment attempt is no longer confirmable",
                ));
            }
        };

        if channel == ConfirmationChannel::Webhook {
            attempt.webhook_received = true;
            attempt.webhook_verified = true;
        }
        attempt.updated_at = Utc::now();
        let registration_id = attempt.registration_id;
        let confirmed_payment_id = attempt.payment_id.clone();
        let confirmed = attempt.clone();

        if let Some(registration) = inner.registrations.get_mut(&registration_id) {
            registration.payment_status = PaymentStatus::Completed;
            registration.payment_id = confirmed_payment_id;
            registration.updated_at = Utc::now();
        }

        Ok(Confirmation {
            attempt: confirmed,
            outcome,
        })
    }

    async fn adjust_capacity(&self, event_id: EventId, delta: i32) -> Result<u32> {
        let mut inner = self.lock();
        let event = inner
            .events
            .get_mut(&event_id)
            .ok_or_else(|| CoreError::not_found("event", event_id))?;
        event.current_participants = clamped_add(event.current_participants, delta);
        Ok(event.current_participants)
    }

    async fn recount_accepted(&self, event_id: EventId) -> Result<u32> {
        let inner = self.lock();
        let count = inner
            .registrations
            .values()
            .filter(|r| r.event_id == event_id && r.status == RegistrationStatus::Accepted)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn reconcile_capacity(
        &self,
        event_id: EventId,
        audit: NewAuditEntry,
    ) -> Result<CapacityReconciliation> {
        let mut inner = self.lock();
        let actual = inner
            .registrations
            .values()
            .filter(|r| r.event_id == event_id && r.status == RegistrationStatus::Accepted)
            .count();
        let actual = u32::try_from(actual).unwrap_or(u32::MAX);
        let event = inner
            .events
            .get_mut(&event_id)
            .ok_or_else(|| CoreError::not_found("event", event_id))?;
        let stored = event.current_participants;
        let repaired = stored != actual;
        if repaired {
            event.current_participants = actual;
            event.updated_at = Utc::now();
            let mut entry = materialize(audit);
            if let Some(details) = entry.details.as_object_mut() {
                details.insert("stored".into(), serde_json::json!(stored));
                details.insert("actual".into(), serde_json::json!(actual));
            }
            inner.audit.push(entry);
        }
        Ok(CapacityReconciliation {
            stored,
            actual,
            repaired,
        })
    }

    async fn record_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry> {
        let mut inner = self.lock();
        let entry = materialize(entry);
        inner.audit.push(entry.clone());
        Ok(entry)
    }

    async fn audit_entries(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let inner = self.lock();
        let mut entries: Vec<AuditEntry> = inner
            .audit
            .iter()
            .filter(|e| filter.actor_id.is_none_or(|a| e.actor_id == a))
            .filter(|e| filter.action.as_ref().is_none_or(|a| &e.action == a))
            .filter(|e| {
                filter
                    .target_type
                    .as_ref()
                    .is_none_or(|t| &e.target_type == t)
            })
            .cloned()
            .collect();
        entries.reverse();
        if let Some(limit) = filter.limit {
            entries.truncate(limit as usize);
        }
        Ok(entries)
    }
}
