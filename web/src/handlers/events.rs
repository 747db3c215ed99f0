//! Event management handlers.

use crate::error::AppError;
use crate::extractors::{provenance, AuthenticatedActor, ClientIp, UserAgent};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rsvp_core::{
    Clock, Event, EventDraft, EventId, EventPatch, PaymentGateway, RegistrationStore,
};
use uuid::Uuid;

/// `POST /api/v1/admin/events`
pub async fn create_event<S, G, C>(
    State(state): State<AppState<S, G, C>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    ip: ClientIp,
    user_agent: UserAgent,
    Json(draft): Json<EventDraft>,
) -> Result<(StatusCode, Json<Event>), AppError>
where
    S: RegistrationStore + 'static,
    G: PaymentGateway + 'static,
    C: Clock + 'static,
{
    let event = state
        .events
        .create_event(actor, draft, provenance(ip, &user_agent))
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// `PUT /api/v1/admin/events/:id`
pub async fn update_event<S, G, C>(
    State(state): State<AppState<S, G, C>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    ip: ClientIp,
    user_agent: UserAgent,
    Path(id): Path<Uuid>,
    Json(patch): Json<EventPatch>,
) -> Result<Json<Event>, AppError>
where
    S: RegistrationStore + 'static,
    G: PaymentGateway + 'static,
    C: Clock + 'static,
{
    let event = state
        .events
        .update_event(actor, EventId(id), patch, provenance(ip, &user_agent))
        .await?;
    Ok(Json(event))
}
