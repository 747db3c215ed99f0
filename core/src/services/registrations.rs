//! Registration state machine.
//!
//! Owns the lifecycle of a registration: creation under the published/
//! deadline/capacity rules, and admin or developer transitions between
//! `Pending`, `Accepted` and `Rejected`. Every status is reachable from
//! every other; what matters is the accepted boundary, which is the only
//! crossing that moves the event's participant counter.
//!
//! Authorization beyond the capability check (event ownership, listing
//! visibility) belongs to the external collaborator; the actor flows
//! through here for audit attribution.

use crate::audit::{actions, targets, NewAuditEntry};
use crate::error::{CoreError, Result};
use crate::providers::{CapacityReconciliation, Clock, RegistrationStore, TransitionOutcome};
use crate::state::{
    Actor, Capability, Event, EventId, EventStatus, PaymentStatus, Provenance, Registration,
    RegistrationId, RegistrationStatus,
};
use serde_json::json;

/// Registration lifecycle service.
#[derive(Debug, Clone)]
pub struct RegistrationService<S, C> {
    store: S,
    clock: C,
}

impl<S, C> RegistrationService<S, C>
where
    S: RegistrationStore,
    C: Clock,
{
    /// Create the service.
    #[must_use]
    pub const fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Register `actor` for an event.
    ///
    /// Checks run in order: event exists, event is published, the deadline
    /// has not passed, a slot is free. The duplicate-registration check is
    /// not performed here: the storage constraint closes that race, so two
    /// concurrent identical requests yield exactly one registration and
    /// one [`CoreError::Conflict`].
    ///
    /// New registrations start `Pending` with `payment_status =
    /// NotRequired`; paid events move to `Pending` payment on acceptance.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidState`, `DeadlinePassed`, `CapacityExhausted`,
    /// `Conflict`, or `Storage`.
    pub async fn register(
        &self,
        actor: Actor,
        event_id: EventId,
        form_data: serde_json::Value,
    ) -> Result<Registration> {
        require(actor, Capability::Register)?;

        let event = self
            .store
            .event(event_id)
            .await?
            .ok_or_else(|| CoreError::not_found("event", event_id))?;

        if event.status != EventStatus::Published {
            return Err(CoreError::invalid_state(
                "event is not open for registration",
            ));
        }
        if self.clock.now() > event.registration_deadline {
            return Err(CoreError::DeadlinePassed);
        }
        if event.is_full() {
            return Err(CoreError::CapacityExhausted);
        }

        let now = self.clock.now();
        let registration = Registration {
            id: RegistrationId::new(),
            event_id,
            user_id: actor.user_id,
            status: RegistrationStatus::Pending,
            payment_status: PaymentStatus::NotRequired,
            form_data,
            payment_order_id: None,
            payment_id: None,
            created_at: now,
            updated_at: now,
        };

        let registration = self.store.insert_registration(&registration).await?;
        tracing::info!(
            registration_id = %registration.id,
            event_id = %event_id,
            user_id = %actor.user_id,
            "registration created"
        );
        Ok(registration)
    }

    /// Accept, reject, or reset a registration (admin path).
    ///
    /// No-op-safe: transitioning to the current status is legal and still
    /// audited, but never adjusts capacity. Capacity moves exactly when
    /// the accepted boundary is crossed.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `NotFound`, or `Storage`.
    pub async fn transition(
        &self,
        actor: Actor,
        id: RegistrationId,
        new_status: RegistrationStatus,
        provenance: Provenance,
    ) -> Result<TransitionOutcome> {
        require(actor, Capability::ManageRegistrations)?;
        self.apply_transition(actor, id, new_status, provenance, false)
            .await
    }

    /// Force a registration into any status (developer path).
    ///
    /// Bypasses capacity checks entirely: overbooking via override is
    /// permitted, the counter still moves on boundary crossings.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `NotFound`, or `Storage`.
    pub async fn override_transition(
        &self,
        actor: Actor,
        id: RegistrationId,
        new_status: RegistrationStatus,
        provenance: Provenance,
    ) -> Result<TransitionOutcome> {
        require(actor, Capability::OverrideRegistrations)?;
        self.apply_transition(actor, id, new_status, provenance, true)
            .await
    }

    async fn apply_transition(
        &self,
        actor: Actor,
        id: RegistrationId,
        new_status: RegistrationStatus,
        provenance: Provenance,
        is_override: bool,
    ) -> Result<TransitionOutcome> {
        let registration = self
            .store
            .registration(id)
            .await?
            .ok_or_else(|| CoreError::not_found("registration", id))?;
        let event = self
            .store
            .event(registration.event_id)
            .await?
            .ok_or_else(|| CoreError::not_found("event", registration.event_id))?;

        let payment_status = payment_side_effect(&event, &registration, new_status);

        let action = if is_override {
            actions::registration_override(new_status)
        } else {
            actions::registration_transition(new_status)
        };
        let mut details = json!({
            "old_status": registration.status.as_str(),
            "new_status": new_status.as_str(),
        });
        if is_override {
            details["override"] = json!(true);
        }
        let audit = NewAuditEntry::new(actor, action, targets::REGISTRATION, id.0)
            .with_details(details)
            .with_provenance(provenance);

        let outcome = self
            .store
            .transition_registration(id, new_status, payment_status, audit)
            .await?;
        tracing::info!(
            registration_id = %id,
            old_status = outcome.old_status.as_str(),
            new_status = new_status.as_str(),
            is_override,
            "registration transitioned"
        );
        Ok(outcome)
    }

    /// Recount accepted registrations and repair the stored counter.
    ///
    /// Safety net against drift between `current_participants` and the
    /// actual accepted count; audited only when a repair happened.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `NotFound`, or `Storage`.
    pub async fn reconcile_capacity(
        &self,
        actor: Actor,
        event_id: EventId,
        provenance: Provenance,
    ) -> Result<CapacityReconciliation> {
        require(actor, Capability::ReconcileCapacity)?;

        let audit = NewAuditEntry::new(
            actor,
            actions::CAPACITY_RECONCILED,
            targets::EVENT,
            event_id.0,
        )
        .with_provenance(provenance);

        let report = self.store.reconcile_capacity(event_id, audit).await?;
        if report.repaired {
            tracing::warn!(
                event_id = %event_id,
                stored = report.stored,
                actual = report.actual,
                "participant counter drift repaired"
            );
        }
        Ok(report)
    }
}

/// Capability gate, evaluated once per operation.
pub(crate) fn require(actor: Actor, capability: Capability) -> Result<()> {
    if actor.role.allows(capability) {
        Ok(())
    } else {
        Err(CoreError::Forbidden {
            required: capability.name(),
        })
    }
}

/// Payment-status side effect of a status transition.
///
/// Entering `Accepted` on a paid event opens the payment window
/// (`NotRequired → Pending`); leaving `Accepted` with payment still due
/// closes it (`Pending → NotRequired`). A confirmed, failed, or refunded
/// payment is never touched by status transitions.
fn payment_side_effect(
    event: &Event,
    registration: &Registration,
    new_status: RegistrationStatus,
) -> Option<PaymentStatus> {
    let was_accepted = registration.status == RegistrationStatus::Accepted;
    let now_accepted = new_status == RegistrationStatus::Accepted;

    if now_accepted
        && !was_accepted
        && event.is_paid
        && registration.payment_status == PaymentStatus::NotRequired
    {
        Some(PaymentStatus::Pending)
    } else if was_accepted
        && !now_accepted
        && registration.payment_status == PaymentStatus::Pending
    {
        Some(PaymentStatus::NotRequired)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Money, UserId};
    use chrono::Utc;

    fn paid_event() -> Event {
        let now = Utc::now();
        Event {
            id: EventId::new(),
            title: "Conf".to_string(),
            description: None,
            event_date: now,
            registration_deadline: now,
            is_paid: true,
            price: Money::from_major(100),
            max_participants: None,
            current_participants: 0,
            status: EventStatus::Published,
            created_by: UserId::new(),
            form_schema: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn registration(
        event: &Event,
        status: RegistrationStatus,
        payment_status: PaymentStatus,
    ) -> Registration {
        let now = Utc::now();
        Registration {
            id: RegistrationId::new(),
            event_id: event.id,
            user_id: UserId::new(),
            status,
            payment_status,
            form_data: serde_json::Value::Null,
            payment_order_id: None,
            payment_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn accepting_a_paid_registration_opens_payment() {
        let event = paid_event();
        let reg = registration(&event, RegistrationStatus::Pending, PaymentStatus::NotRequired);
        assert_eq!(
            payment_side_effect(&event, &reg, RegistrationStatus::Accepted),
            Some(PaymentStatus::Pending)
        );
    }

    #[test]
    fn accepting_an_unpaid_registration_changes_nothing() {
        let mut event = paid_event();
        event.is_paid = false;
        let reg = registration(&event, RegistrationStatus::Pending, PaymentStatus::NotRequired);
        assert_eq!(
            payment_side_effect(&event, &reg, RegistrationStatus::Accepted),
            None
        );
    }

    #[test]
    fn rejecting_with_payment_due_closes_the_window() {
        let event = paid_event();
        let reg = registration(&event, RegistrationStatus::Accepted, PaymentStatus::Pending);
        assert_eq!(
            payment_side_effect(&event, &reg, RegistrationStatus::Rejected),
            Some(PaymentStatus::NotRequired)
        );
    }

    #[test]
    fn completed_payment_survives_any_transition() {
        let event = paid_event();
        let reg = registration(&event, RegistrationStatus::Accepted, PaymentStatus::Completed);
        for status in [
            RegistrationStatus::Pending,
            RegistrationStatus::Accepted,
            RegistrationStatus::Rejected,
        ] {
            assert_eq!(payment_side_effect(&event, &reg, status), None);
        }
    }

    #[test]
    fn same_status_transition_has_no_side_effect() {
        let event = paid_event();
        let reg = registration(&event, RegistrationStatus::Accepted, PaymentStatus::Pending);
        assert_eq!(
            payment_side_effect(&event, &reg, RegistrationStatus::Accepted),
            None
        );
    }
}
