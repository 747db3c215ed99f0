//! Razorpay HTTP client.

use crate::config::GatewayConfig;
use crate::signature;
use rsvp_core::{CoreError, GatewayOrder, Money, PaymentGateway, Result};
use serde::Deserialize;
use serde_json::json;

/// Razorpay client.
///
/// Order creation is the only remote call and is bounded by the configured
/// timeout; on failure or timeout the caller sees a
/// [`CoreError::Gateway`] and no local state has been touched. Signature
/// verification is local HMAC arithmetic.
#[derive(Debug, Clone)]
pub struct RazorpayClient {
    http: reqwest::Client,
    config: GatewayConfig,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

impl RazorpayClient {
    /// Build a client from the config.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Gateway`] if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CoreError::gateway(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }
}

impl PaymentGateway for RazorpayClient {
    async fn create_order(
        &self,
        amount: Money,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder> {
        let url = format!("{}/v1/orders", self.config.api_base);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&json!({
                "amount": amount.minor_units(),
                "currency": currency,
                "receipt": receipt,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::gateway("order creation timed out")
                } else {
                    CoreError::gateway(format!("order creation failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body, "gateway rejected order creation");
            return Err(CoreError::gateway(format!(
                "order creation rejected with status {status}"
            )));
        }

        let order: OrderResponse = response
            .json()
            .await
            .map_err(|e| CoreError::gateway(format!("malformed order response: {e}")))?;
        tracing::debug!(order_id = %order.id, "gateway order created");
        Ok(GatewayOrder {
            order_id: order.id,
            amount: Money::from_minor(order.amount),
            currency: order.currency,
        })
    }

    fn verify_checkout_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> bool {
        let message = signature::checkout_message(order_id, payment_id);
        signature::verify(&self.config.key_secret, message.as_bytes(), signature)
    }

    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool {
        signature::verify(&self.config.webhook_secret, body, signature)
    }

    fn key_id(&self) -> &str {
        &self.config.key_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RazorpayClient {
        RazorpayClient::new(GatewayConfig::new("rzp_test_key", "key_secret", "wh_secret"))
            .unwrap_or_else(|_| unreachable!("client builds with default config"))
    }

    #[test]
    fn checkout_signature_round_trip() {
        let client = client();
        let sig = signature::sign("key_secret", b"order_abc|pay_def");
        assert!(client.verify_checkout_signature("order_abc", "pay_def", &sig));
        assert!(!client.verify_checkout_signature("order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn webhook_signature_uses_webhook_secret() {
        let client = client();
        let body = br#"{"event":"payment.captured"}"#;
        let good = signature::sign("wh_secret", body);
        let wrong_secret = signature::sign("key_secret", body);
        assert!(client.verify_webhook_signature(body, &good));
        assert!(!client.verify_webhook_signature(body, &wrong_secret));
    }
}
