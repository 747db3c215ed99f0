//! Payment gateway trait.

use crate::error::Result;
use crate::state::Money;

/// An order created at the external gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    /// Gateway-assigned order id; unique across all attempts.
    pub order_id: String,

    /// Amount in minor units, echoed by the gateway.
    pub amount: Money,

    /// ISO currency code.
    pub currency: String,
}

/// External payment gateway client.
///
/// The only unbounded-latency collaborator: implementations must bound
/// `create_order` with a timeout. A failed or timed-out order creation
/// leaves no local state behind; the caller retries from scratch.
///
/// Signature verification is local HMAC arithmetic over shared secrets and
/// therefore synchronous and infallible apart from its boolean outcome.
pub trait PaymentGateway: Send + Sync {
    /// Create an order for `amount` with an opaque `receipt` token.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Gateway`] if the call fails or times
    /// out.
    fn create_order(
        &self,
        amount: Money,
        currency: &str,
        receipt: &str,
    ) -> impl std::future::Future<Output = Result<GatewayOrder>> + Send;

    /// Verify a post-checkout signature over `(order_id, payment_id)`.
    fn verify_checkout_signature(&self, order_id: &str, payment_id: &str, signature: &str)
    -> bool;

    /// Verify a webhook signature over the raw request body.
    ///
    /// Uses the webhook secret, which is distinct from the checkout key
    /// secret.
    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool;

    /// The public key id handed to checkout clients.
    fn key_id(&self) -> &str;
}
