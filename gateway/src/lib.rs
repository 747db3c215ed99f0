//! # RSVP Gateway
//!
//! Razorpay client implementing [`rsvp_core::PaymentGateway`]: order
//! creation over HTTPS with a bounded timeout, and local HMAC-SHA256
//! verification of the two confirmation signature schemes (checkout
//! signature over `"{order_id}|{payment_id}"` with the key secret, webhook
//! signature over the raw request body with the webhook secret).

mod client;
mod config;
pub mod signature;

pub use client::RazorpayClient;
pub use config::GatewayConfig;
