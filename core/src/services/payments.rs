//! Payment reconciliation engine.
//!
//! Creates at most one active payment attempt per registration and merges
//! external confirmation signals into local state exactly once, whichever
//! of the two channels (post-checkout verification or gateway webhook)
//! delivers first, however often either is retried.

use crate::error::{CoreError, Result};
use crate::providers::{Clock, Confirmation, PaymentGateway, RegistrationStore};
use crate::state::{
    Actor, ConfirmationChannel, Money, PaymentAttempt, PaymentAttemptId, PaymentStatus,
    RegistrationId, RegistrationStatus, Role,
};
use serde::{Deserialize, Serialize};

/// The single supported settlement currency.
pub const CURRENCY: &str = "INR";

/// What a checkout client needs to open the gateway widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutOrder {
    /// Gateway order id.
    pub order_id: String,

    /// Amount due, minor units.
    pub amount: Money,

    /// ISO currency code.
    pub currency: String,

    /// Public gateway key id.
    pub key: String,
}

/// Result of processing a webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    /// A `payment.captured` notification was reconciled.
    Confirmed(Confirmation),
    /// The notification carried an event kind this engine does not model.
    Ignored,
}

/// Payment reconciliation service.
#[derive(Debug, Clone)]
pub struct PaymentService<S, G, C> {
    store: S,
    gateway: G,
    clock: C,
}

impl<S, G, C> PaymentService<S, G, C>
where
    S: RegistrationStore,
    G: PaymentGateway,
    C: Clock,
{
    /// Create the service.
    #[must_use]
    pub const fn new(store: S, gateway: G, clock: C) -> Self {
        Self {
            store,
            gateway,
            clock,
        }
    }

    /// Find or create the payment order for a registration.
    ///
    /// Idempotent: a retried request returns the existing active attempt
    /// unchanged and issues no second gateway order. A fresh order is
    /// requested from the gateway (amount = event price, receipt = the
    /// registration id) and persisted as a `Created` attempt atomically
    /// with the registration's move to `payment_status = Pending`. If the
    /// gateway call fails or times out, no local attempt exists afterwards.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the registration is absent.
    /// - `Forbidden` if a client acts on someone else's registration.
    /// - `InvalidState` unless the registration is `Accepted` and the
    ///   event is paid.
    /// - `Conflict` if payment is already completed.
    /// - `Gateway` if order creation failed.
    pub async fn create_order(
        &self,
        actor: Actor,
        registration_id: RegistrationId,
    ) -> Result<CheckoutOrder> {
        let registration = self
            .store
            .registration(registration_id)
            .await?
            .ok_or_else(|| CoreError::not_found("registration", registration_id))?;

        // Clients pay for their own registration only; admins and
        // developers may act on any.
        if actor.role == Role::Client && registration.user_id != actor.user_id {
            return Err(CoreError::Forbidden {
                required: "own registration",
            });
        }

        if registration.status != RegistrationStatus::Accepted {
            return Err(CoreError::invalid_state(
                "registration must be accepted before payment",
            ));
        }
        if registration.payment_status == PaymentStatus::Completed {
            return Err(CoreError::conflict("payment already completed"));
        }

        let event = self
            .store
            .event(registration.event_id)
            .await?
            .ok_or_else(|| CoreError::not_found("event", registration.event_id))?;
        if !event.is_paid {
            return Err(CoreError::invalid_state("event does not require payment"));
        }

        if let Some(existing) = self.store.active_attempt(registration_id).await? {
            return Ok(self.checkout_order(&existing));
        }

        let order = self
            .gateway
            .create_order(event.price, CURRENCY, &registration.id.to_string())
            .await?;

        let now = self.clock.now();
        let attempt = PaymentAttempt {
            id: PaymentAttemptId::new(),
            registration_id,
            order_id: order.order_id,
            payment_id: None,
            signature: None,
            amount: event.price,
            currency: CURRENCY.to_string(),
            status: crate::state::AttemptStatus::Created,
            webhook_received: false,
            webhook_verified: false,
            created_at: now,
            updated_at: now,
        };

        // A concurrent create for the same registration converges on the
        // surviving attempt; our gateway order is then simply abandoned.
        let attempt = self.store.insert_attempt(&attempt).await?;
        tracing::info!(
            registration_id = %registration_id,
            order_id = %attempt.order_id,
            actor = %actor.user_id,
            "payment order created"
        );
        Ok(self.checkout_order(&attempt))
    }

    /// Reconcile a synchronous post-checkout confirmation.
    ///
    /// Verifies the checkout signature over `(order_id, payment_id)`, then
    /// applies the idempotent `Created → Paid` confirmation. Re-verifying
    /// an already-paid order is a no-op success.
    ///
    /// # Errors
    ///
    /// `InvalidSignature`, `NotFound`, `InvalidState` (terminal attempt),
    /// or `Storage`.
    pub async fn verify_checkout(
        &self,
        actor: Actor,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<Confirmation> {
        if !self
            .gateway
            .verify_checkout_signature(order_id, payment_id, signature)
        {
            tracing::warn!(order_id, actor = %actor.user_id, "checkout signature rejected");
            return Err(CoreError::InvalidSignature);
        }

        let confirmation = self
            .store
            .confirm_attempt(
                order_id,
                payment_id,
                Some(signature),
                ConfirmationChannel::Checkout,
            )
            .await?;
        tracing::info!(
            order_id,
            outcome = ?confirmation.outcome,
            "checkout confirmation reconciled"
        );
        Ok(confirmation)
    }

    /// Reconcile an asynchronous gateway webhook.
    ///
    /// Verifies the body HMAC with the webhook secret, parses the
    /// envelope, and applies `payment.captured` notifications through the
    /// same idempotent confirmation as the checkout path, raising the
    /// `webhook_received`/`webhook_verified` provenance flags. Other
    /// notification kinds are acknowledged and ignored. Failures are
    /// logged and surfaced as rejections; the gateway may retry.
    ///
    /// # Errors
    ///
    /// `InvalidSignature` (bad HMAC or malformed body), `NotFound`
    /// (unknown order id), `InvalidState`, or `Storage`.
    pub async fn handle_webhook(&self, body: &[u8], signature: &str) -> Result<WebhookOutcome> {
        if !self.gateway.verify_webhook_signature(body, signature) {
            tracing::warn!("webhook signature rejected");
            return Err(CoreError::InvalidSignature);
        }

        let envelope: WebhookEnvelope = serde_json::from_slice(body).map_err(|e| {
            tracing::warn!(error = %e, "malformed webhook payload");
            CoreError::invalid_state("malformed webhook payload")
        })?;

        if envelope.event != "payment.captured" {
            tracing::debug!(event = %envelope.event, "webhook event ignored");
            return Ok(WebhookOutcome::Ignored);
        }

        let entity = envelope.payload.payment.entity;
        let confirmation = self
            .store
            .confirm_attempt(&entity.order_id, &entity.id, None, ConfirmationChannel::Webhook)
            .await
            .inspect_err(|e| {
                tracing::warn!(order_id = %entity.order_id, error = %e, "webhook not reconciled");
            })?;

        tracing::info!(
            order_id = %entity.order_id,
            outcome = ?confirmation.outcome,
            "webhook confirmation reconciled"
        );
        Ok(WebhookOutcome::Confirmed(confirmation))
    }

    fn checkout_order(&self, attempt: &PaymentAttempt) -> CheckoutOrder {
        CheckoutOrder {
            order_id: attempt.order_id.clone(),
            amount: attempt.amount,
            currency: attempt.currency.clone(),
            key: self.gateway.key_id().to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Webhook envelope
// ═══════════════════════════════════════════════════════════════════════

/// Gateway webhook envelope, as delivered on the wire.
#[derive(Debug, Clone, Deserialize)]
struct WebhookEnvelope {
    event: String,
    #[serde(default)]
    payload: WebhookPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    payment: WebhookPayment,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WebhookPayment {
    #[serde(default)]
    entity: WebhookEntity,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WebhookEntity {
    #[serde(default)]
    id: String,
    #[serde(default)]
    order_id: String,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn envelope_parses_captured_payment() {
        let body = br#"{
            "event": "payment.captured",
            "payload": {"payment": {"entity": {
                "id": "pay_123", "order_id": "order_456", "amount": 10000
            }}}
        }"#;
        let envelope: WebhookEnvelope = serde_json::from_slice(body).unwrap();
        assert_eq!(envelope.event, "payment.captured");
        assert_eq!(envelope.payload.payment.entity.id, "pay_123");
        assert_eq!(envelope.payload.payment.entity.order_id, "order_456");
    }

    #[test]
    fn envelope_tolerates_missing_payload() {
        let body = br#"{"event": "order.paid"}"#;
        let envelope: WebhookEnvelope = serde_json::from_slice(body).unwrap();
        assert_eq!(envelope.event, "order.paid");
        assert!(envelope.payload.payment.entity.order_id.is_empty());
    }
}
