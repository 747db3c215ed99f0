//! Deterministic mock payment gateway.

use rsvp_core::{CoreError, GatewayOrder, Money, PaymentGateway, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock gateway with predictable order ids and fake signatures.
///
/// Signatures use a readable scheme derived from the configured secrets
/// rather than real HMACs; [`MockGateway::sign_checkout`] and
/// [`MockGateway::sign_webhook`] produce signatures that verification
/// accepts, so tests can exercise both the valid and the tampered path.
///
/// Order-creation calls are counted, which lets tests assert that a
/// retried `create_order` issued exactly one external call.
#[derive(Debug, Clone)]
pub struct MockGateway {
    key_id: String,
    key_secret: String,
    webhook_secret: String,
    orders_created: Arc<AtomicUsize>,
    fail_orders: Arc<AtomicBool>,
}

impl MockGateway {
    /// Create a mock gateway with the given secrets.
    #[must_use]
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            webhook_secret: webhook_secret.into(),
            orders_created: Arc::new(AtomicUsize::new(0)),
            fail_orders: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Number of `create_order` calls that reached the gateway.
    #[must_use]
    pub fn orders_created(&self) -> usize {
        self.orders_created.load(Ordering::SeqCst)
    }

    /// Make subsequent `create_order` calls fail, simulating a gateway
    /// outage or timeout.
    pub fn fail_next_orders(&self, fail: bool) {
        self.fail_orders.store(fail, Ordering::SeqCst);
    }

    /// A checkout signature verification will accept.
    #[must_use]
    pub fn sign_checkout(&self, order_id: &str, payment_id: &str) -> String {
        format!("sig[{}|{}|{}]", order_id, payment_id, self.key_secret)
    }

    /// A webhook signature verification will accept.
    #[must_use]
    pub fn sign_webhook(&self, body: &[u8]) -> String {
        format!("whsig[{}|{}]", body.len(), self.webhook_secret)
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new("rzp_test_key", "test_secret", "test_webhook_secret")
    }
}

impl PaymentGateway for MockGateway {
    async fn create_order(
        &self,
        amount: Money,
        currency: &str,
        _receipt: &str,
    ) -> Result<GatewayOrder> {
        if self.fail_orders.load(Ordering::SeqCst) {
            return Err(CoreError::gateway("mock gateway outage"));
        }
        let n = self.orders_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayOrder {
            order_id: format!("order_mock_{n:06}"),
            amount,
            currency: currency.to_string(),
        })
    }

    fn verify_checkout_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> bool {
        signature == self.sign_checkout(order_id, payment_id)
    }

    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool {
        signature == self.sign_webhook(body)
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }
}
