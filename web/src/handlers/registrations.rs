//! Registration lifecycle handlers.

use crate::error::AppError;
use crate::extractors::{provenance, AuthenticatedActor, ClientIp, UserAgent};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rsvp_core::{
    Clock, EventId, PaymentGateway, Registration, RegistrationId, RegistrationStatus,
    RegistrationStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /api/v1/registrations`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Event to register for.
    pub event_id: EventId,
    /// Registration form answers.
    #[serde(default = "empty_object")]
    pub form_data: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Body of the transition and override endpoints.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    /// Target status.
    pub status: RegistrationStatus,
}

/// Report of `POST /api/v1/developer/events/:id/reconcile`.
#[derive(Debug, Serialize)]
pub struct ReconciliationResponse {
    /// Counter value before reconciliation.
    pub stored: u32,
    /// Recounted number of accepted registrations.
    pub actual: u32,
    /// Whether the stored counter was overwritten.
    pub repaired: bool,
}

/// `POST /api/v1/registrations`
pub async fn register<S, G, C>(
    State(state): State<AppState<S, G, C>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Registration>), AppError>
where
    S: RegistrationStore + 'static,
    G: PaymentGateway + 'static,
    C: Clock + 'static,
{
    let registration = state
        .registrations
        .register(actor, req.event_id, req.form_data)
        .await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// `PATCH /api/v1/admin/registrations/:id`
pub async fn transition<S, G, C>(
    State(state): State<AppState<S, G, C>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    ip: ClientIp,
    user_agent: UserAgent,
    Path(id): Path<Uuid>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<Registration>, AppError>
where
    S: RegistrationStore + 'static,
    G: PaymentGateway + 'static,
    C: Clock + 'static,
{
    let outcome = state
        .registrations
        .transition(
            actor,
            RegistrationId(id),
            req.status,
            provenance(ip, &user_agent),
        )
        .await?;
    Ok(Json(outcome.registration))
}

/// `PATCH /api/v1/developer/registrations/:id/override`
pub async fn override_transition<S, G, C>(
    State(state): State<AppState<S, G, C>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    ip: ClientIp,
    user_agent: UserAgent,
    Path(id): Path<Uuid>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<Registration>, AppError>
where
    S: RegistrationStore + 'static,
    G: PaymentGateway + 'static,
    C: Clock + 'static,
{
    let outcome = state
        .registrations
        .override_transition(
            actor,
            RegistrationId(id),
            req.status,
            provenance(ip, &user_agent),
        )
        .await?;
    Ok(Json(outcome.registration))
}

/// `POST /api/v1/developer/events/:id/reconcile`
pub async fn reconcile_capacity<S, G, C>(
    State(state): State<AppState<S, G, C>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    ip: ClientIp,
    user_agent: UserAgent,
    Path(id): Path<Uuid>,
) -> Result<Json<ReconciliationResponse>, AppError>
where
    S: RegistrationStore + 'static,
    G: PaymentGateway + 'static,
    C: Clock + 'static,
{
    let report = state
        .registrations
        .reconcile_capacity(actor, EventId(id), provenance(ip, &user_agent))
        .await?;
    Ok(Json(ReconciliationResponse {
        stored: report.stored,
        actual: report.actual,
        repaired: report.repaired,
    }))
}
