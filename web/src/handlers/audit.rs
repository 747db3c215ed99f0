//! Audit trail handlers.

use crate::error::AppError;
use crate::extractors::AuthenticatedActor;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use rsvp_core::{AuditEntry, AuditFilter, Clock, PaymentGateway, RegistrationStore, UserId};
use serde::Deserialize;
use uuid::Uuid;

/// Query string of `GET /api/v1/developer/audit-logs`.
#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQuery {
    /// Only entries by this actor.
    pub actor_id: Option<Uuid>,
    /// Only entries with this action tag.
    pub action: Option<String>,
    /// Only entries on this target kind.
    pub target_type: Option<String>,
    /// Maximum number of entries, newest first.
    pub limit: Option<u32>,
}

/// `GET /api/v1/developer/audit-logs`
pub async fn audit_logs<S, G, C>(
    State(state): State<AppState<S, G, C>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Vec<AuditEntry>>, AppError>
where
    S: RegistrationStore + 'static,
    G: PaymentGateway + 'static,
    C: Clock + 'static,
{
    let filter = AuditFilter {
        actor_id: query.actor_id.map(UserId),
        action: query.action,
        target_type: query.target_type,
        limit: query.limit,
    };
    let entries = state.audit.trail(actor, filter).await?;
    Ok(Json(entries))
}
