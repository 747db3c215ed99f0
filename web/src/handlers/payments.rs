//! Payment handlers.
//!
//! The webhook endpoint reads the raw body: the signature is an HMAC
//! over the exact bytes the gateway sent, so the body must not pass
//! through JSON extraction first.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use rsvp_core::{
    CheckoutOrder, Clock, PaymentAttempt, PaymentGateway, RegistrationId, RegistrationStore,
    WebhookOutcome,
};
use serde::{Deserialize, Serialize};

use crate::extractors::AuthenticatedActor;

/// Signature header on webhook deliveries.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

/// Body of `POST /api/v1/payments/create-order`.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Registration the payment is for.
    pub registration_id: RegistrationId,
}

/// Body of `POST /api/v1/payments/verify`, as the checkout widget
/// returns it.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Gateway order id.
    pub razorpay_order_id: String,
    /// Gateway payment id.
    pub razorpay_payment_id: String,
    /// Checkout signature over `(order_id, payment_id)`.
    pub razorpay_signature: String,
}

/// Acknowledgement body for the webhook endpoint.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    /// Always `"ok"`; the gateway only cares about the status code.
    pub status: &'static str,
}

/// `POST /api/v1/payments/create-order`
pub async fn create_order<S, G, C>(
    State(state): State<AppState<S, G, C>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<CheckoutOrder>, AppError>
where
    S: RegistrationStore + 'static,
    G: PaymentGateway + 'static,
    C: Clock + 'static,
{
    let order = state
        .payments
        .create_order(actor, req.registration_id)
        .await?;
    Ok(Json(order))
}

/// `POST /api/v1/payments/verify`
pub async fn verify_checkout<S, G, C>(
    State(state): State<AppState<S, G, C>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<PaymentAttempt>, AppError>
where
    S: RegistrationStore + 'static,
    G: PaymentGateway + 'static,
    C: Clock + 'static,
{
    let confirmation = state
        .payments
        .verify_checkout(
            actor,
            &req.razorpay_order_id,
            &req.razorpay_payment_id,
            &req.razorpay_signature,
        )
        .await?;
    Ok(Json(confirmation.attempt))
}

/// `POST /api/v1/payments/webhook`
///
/// Unauthenticated: the HMAC signature is the authentication. Ignored
/// notification kinds are acknowledged with 200 so the gateway stops
/// retrying them.
pub async fn webhook<S, G, C>(
    State(state): State<AppState<S, G, C>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookAck>), AppError>
where
    S: RegistrationStore + 'static,
    G: PaymentGateway + 'static,
    C: Clock + 'static,
{
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::bad_request("missing webhook signature"))?;

    match state.payments.handle_webhook(&body, signature).await? {
        WebhookOutcome::Confirmed(_) | WebhookOutcome::Ignored => {
            Ok((StatusCode::OK, Json(WebhookAck { status: "ok" })))
        }
    }
}
