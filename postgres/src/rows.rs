//! Row types and their conversions into domain types.
//!
//! Status columns are stored in their stable string forms; a row carrying
//! an unknown status is a storage-level corruption, not a caller error.

use chrono::{DateTime, Utc};
use rsvp_core::{
    AttemptStatus, AuditEntry, AuditEntryId, CoreError, Event, EventId, EventStatus, Money,
    PaymentAttempt, PaymentAttemptId, PaymentStatus, Registration, RegistrationId,
    RegistrationStatus, UserId,
};
use uuid::Uuid;

/// Column list matching [`EventRow`].
pub(crate) const EVENT_COLS: &str = "id, title, description, event_date, registration_deadline, \
     is_paid, price_minor, max_participants, current_participants, status, \
     created_by, form_schema, created_at, updated_at";

/// Column list matching [`RegistrationRow`].
pub(crate) const REGISTRATION_COLS: &str = "id, event_id, user_id, status, payment_status, \
     form_data, payment_order_id, payment_id, created_at, updated_at";

/// Column list matching [`PaymentRow`].
pub(crate) const PAYMENT_COLS: &str = "id, registration_id, order_id, payment_id, signature, \
     amount_minor, currency, status, webhook_received, webhook_verified, \
     created_at, updated_at";

/// Column list matching [`AuditRow`].
pub(crate) const AUDIT_COLS: &str =
    "id, actor_id, action, target_type, target_id, details, ip_address, user_agent, created_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EventRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub registration_deadline: DateTime<Utc>,
    pub is_paid: bool,
    pub price_minor: i64,
    pub max_participants: Option<i32>,
    pub current_participants: i32,
    pub status: String,
    pub created_by: Uuid,
    pub form_schema: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = CoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let status = EventStatus::parse(&row.status)
            .ok_or_else(|| CoreError::storage(format!("unknown event status {:?}", row.status)))?;
        Ok(Self {
            id: EventId(row.id),
            title: row.title,
            description: row.description,
            event_date: row.event_date,
            registration_deadline: row.registration_deadline,
            is_paid: row.is_paid,
            price: Money::from_minor(row.price_minor),
            max_participants: row
                .max_participants
                .map(|m| u32::try_from(m).unwrap_or(0)),
            current_participants: u32::try_from(row.current_participants).unwrap_or(0),
            status,
            created_by: UserId(row.created_by),
            form_schema: row.form_schema,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RegistrationRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub form_data: serde_json::Value,
    pub payment_order_id: Option<String>,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = CoreError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        let status = RegistrationStatus::parse(&row.status).ok_or_else(|| {
            CoreError::storage(format!("unknown registration status {:?}", row.status))
        })?;
        let payment_status = PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
            CoreError::storage(format!("unknown payment status {:?}", row.payment_status))
        })?;
        Ok(Self {
            id: RegistrationId(row.id),
            event_id: EventId(row.event_id),
            user_id: UserId(row.user_id),
            status,
            payment_status,
            form_data: row.form_data,
            payment_order_id: row.payment_order_id,
            payment_id: row.payment_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PaymentRow {
    pub id: Uuid,
    pub registration_id: Uuid,
    pub order_id: String,
    pub payment_id: Option<String>,
    pub signature: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub webhook_received: bool,
    pub webhook_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PaymentAttempt {
    type Error = CoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status = AttemptStatus::parse(&row.status).ok_or_else(|| {
            CoreError::storage(format!("unknown attempt status {:?}", row.status))
        })?;
        Ok(Self {
            id: PaymentAttemptId(row.id),
            registration_id: RegistrationId(row.registration_id),
            order_id: row.order_id,
            payment_id: row.payment_id,
            signature: row.signature,
            amount: Money::from_minor(row.amount_minor),
            currency: row.currency,
            status,
            webhook_received: row.webhook_received,
            webhook_verified: row.webhook_verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AuditRow {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub target_type: String,
    pub target_id: Uuid,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditRow> for AuditEntry {
    fn from(row: AuditRow) -> Self {
        Self {
            id: AuditEntryId(row.id),
            actor_id: UserId(row.actor_id),
            action: row.action,
            target_type: row.target_type,
            target_id: row.target_id,
            details: row.details,
            ip_address: row.ip_address.and_then(|ip| ip.parse().ok()),
            user_agent: row.user_agent,
            created_at: row.created_at,
        }
    }
}
