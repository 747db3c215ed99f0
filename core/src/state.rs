//! Domain state types.
//!
//! This module defines the entities owned by the registration and payment
//! core: events, registrations, payment attempts, and the actor/capability
//! model supplied by the external authorization layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub uuid::Uuid);

impl EventId {
    /// Generate a new random `EventId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a user (participant, admin, or developer).
///
/// User accounts themselves are owned by the external authentication
/// collaborator; the core only references them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub uuid::Uuid);

impl UserId {
    /// Generate a new random `UserId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistrationId(pub uuid::Uuid);

impl RegistrationId {
    /// Generate a new random `RegistrationId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RegistrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentAttemptId(pub uuid::Uuid);

impl PaymentAttemptId {
    /// Generate a new random `PaymentAttemptId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for PaymentAttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentAttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEntryId(pub uuid::Uuid);

impl AuditEntryId {
    /// Generate a new random `AuditEntryId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for AuditEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuditEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Money
// ═══════════════════════════════════════════════════════════════════════

/// An amount of money in integer minor units (two implied decimals).
///
/// The payment gateway's wire format is also minor units, so amounts cross
/// the boundary without conversion.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Money(i64);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Create from minor units (e.g. paise, cents).
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Create from whole major units (e.g. `from_major(100)` = 100.00).
    #[must_use]
    pub const fn from_major(major: i64) -> Self {
        Self(major * 100)
    }

    /// The amount in minor units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Events
// ═══════════════════════════════════════════════════════════════════════

/// Event lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Created but not yet open for registration.
    Draft,
    /// Open for registration.
    Published,
    /// Cancelled by the owner.
    Cancelled,
    /// The event took place.
    Completed,
}

impl EventStatus {
    /// Stable string form used in storage and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Parse the stable string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "cancelled" => Some(Self::Cancelled),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// An event participants can register for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event ID.
    pub id: EventId,

    /// Title.
    pub title: String,

    /// Optional long description.
    pub description: Option<String>,

    /// When the event takes place.
    pub event_date: DateTime<Utc>,

    /// Registrations are rejected after this instant.
    pub registration_deadline: DateTime<Utc>,

    /// Whether accepted registrations require payment.
    pub is_paid: bool,

    /// Price per participant (zero for unpaid events).
    pub price: Money,

    /// Maximum number of accepted participants; `None` means unlimited.
    pub max_participants: Option<u32>,

    /// Count of registrations currently in `Accepted` status.
    ///
    /// Written exclusively by the capacity ledger (the store's transition
    /// and reconcile operations); never mutated anywhere else.
    pub current_participants: u32,

    /// Lifecycle status.
    pub status: EventStatus,

    /// Owning admin.
    pub created_by: UserId,

    /// Event-defined registration form schema; opaque to the core.
    pub form_schema: Option<serde_json::Value>,

    /// Created timestamp.
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Whether the event has no free slot left.
    ///
    /// Unlimited events (no `max_participants`) are never full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.max_participants
            .is_some_and(|max| self.current_participants >= max)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registrations
// ═══════════════════════════════════════════════════════════════════════

/// Registration review status.
///
/// Any status is reachable from any other: admins may revisit decisions
/// and developers may override them, so no state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Awaiting admin review.
    Pending,
    /// Accepted; occupies a capacity slot.
    Accepted,
    /// Rejected.
    Rejected,
}

impl RegistrationStatus {
    /// Stable string form used in storage and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Parse the stable string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Payment progress of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No payment is due (unpaid event, or paid event before acceptance).
    NotRequired,
    /// Payment is due but not yet confirmed.
    Pending,
    /// Payment confirmed.
    Completed,
    /// Payment failed.
    Failed,
    /// Payment refunded.
    Refunded,
}

impl PaymentStatus {
    /// Stable string form used in storage and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotRequired => "not_required",
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// Parse the stable string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_required" => Some(Self::NotRequired),
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

/// A participant's registration for one event.
///
/// At most one registration exists per `(event, participant)` pair,
/// enforced by a storage constraint rather than an application check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Registration ID.
    pub id: RegistrationId,

    /// The event registered for.
    pub event_id: EventId,

    /// The registering participant.
    pub user_id: UserId,

    /// Review status. Mutated only by admin/developer transitions.
    pub status: RegistrationStatus,

    /// Payment progress. Mutated only by the reconciliation engine and by
    /// the accepted-boundary side effect of status transitions.
    pub payment_status: PaymentStatus,

    /// The participant's form submission; opaque to the core.
    pub form_data: serde_json::Value,

    /// External order id of the current payment attempt, if any.
    pub payment_order_id: Option<String>,

    /// External payment id once confirmed.
    pub payment_id: Option<String>,

    /// Created timestamp.
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp.
    pub updated_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════
// Payment Attempts
// ═══════════════════════════════════════════════════════════════════════

/// Lifecycle of a payment attempt.
///
/// `Created → Paid` via confirmation; `Paid`, `Failed` and `Refunded` are
/// terminal for the reconciliation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Order created at the gateway, awaiting confirmation.
    Created,
    /// Confirmed paid.
    Paid,
    /// Failed at the gateway.
    Failed,
    /// Refunded (out of scope for the engine; recorded only).
    Refunded,
}

impl AttemptStatus {
    /// Whether the attempt counts as the registration's active attempt.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Created | Self::Paid)
    }

    /// Stable string form used in storage and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// Parse the stable string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

/// One external-gateway order and its lifecycle, tied to one registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAttempt {
    /// Attempt ID.
    pub id: PaymentAttemptId,

    /// Owning registration.
    pub registration_id: RegistrationId,

    /// Gateway order id; unique system-wide.
    pub order_id: String,

    /// Gateway payment id once confirmed.
    pub payment_id: Option<String>,

    /// Checkout signature, when confirmation arrived via the client path.
    pub signature: Option<String>,

    /// Amount due.
    pub amount: Money,

    /// ISO currency code (fixed to "INR").
    pub currency: String,

    /// Attempt status.
    pub status: AttemptStatus,

    /// A webhook confirmation was received for this attempt.
    pub webhook_received: bool,

    /// The webhook confirmation's signature verified.
    pub webhook_verified: bool,

    /// Created timestamp.
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Which channel delivered a payment confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationChannel {
    /// Synchronous post-checkout verification call from the client.
    Checkout,
    /// Asynchronous server-to-server webhook from the gateway.
    Webhook,
}

// ═══════════════════════════════════════════════════════════════════════
// Actors & Capabilities
// ═══════════════════════════════════════════════════════════════════════

/// Role of an authenticated actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Participant.
    Client,
    /// Event owner.
    Admin,
    /// Super-admin with full visibility.
    Developer,
}

impl Role {
    /// Whether this role carries the given capability.
    ///
    /// Evaluated once per operation; the state machines never re-derive
    /// role logic internally.
    #[must_use]
    pub const fn allows(self, capability: Capability) -> bool {
        match capability {
            // Admins and developers register themselves like anyone else.
            Capability::Register => true,
            Capability::ManageEvents | Capability::ManageRegistrations => {
                matches!(self, Self::Admin | Self::Developer)
            }
            Capability::OverrideRegistrations
            | Capability::ViewAuditLog
            | Capability::ReconcileCapacity => matches!(self, Self::Developer),
        }
    }

    /// Stable string form used in storage and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Admin => "admin",
            Self::Developer => "developer",
        }
    }

    /// Parse the stable string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "client" => Some(Self::Client),
            "admin" => Some(Self::Admin),
            "developer" => Some(Self::Developer),
            _ => None,
        }
    }
}

/// Capabilities checked by core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Register for a published event.
    Register,
    /// Create and update events.
    ManageEvents,
    /// Accept or reject registrations.
    ManageRegistrations,
    /// Override registration decisions, bypassing capacity checks.
    OverrideRegistrations,
    /// Query the audit trail.
    ViewAuditLog,
    /// Run the capacity reconciliation safety net.
    ReconcileCapacity,
}

impl Capability {
    /// Human-readable capability name for error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::ManageEvents => "manage_events",
            Self::ManageRegistrations => "manage_registrations",
            Self::OverrideRegistrations => "override_registrations",
            Self::ViewAuditLog => "view_audit_log",
            Self::ReconcileCapacity => "reconcile_capacity",
        }
    }
}

/// An authenticated actor, supplied by the external authorization layer.
///
/// The core trusts this identity and does not re-derive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// The actor's user id.
    pub user_id: UserId,

    /// The actor's role.
    pub role: Role,
}

impl Actor {
    /// Create an actor.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Request provenance attached to audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Caller address.
    pub ip_address: Option<IpAddr>,

    /// Caller agent string.
    pub user_agent: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
// Audit Entries
// ═══════════════════════════════════════════════════════════════════════

/// One immutable record of a privileged state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry ID.
    pub id: AuditEntryId,

    /// The acting admin or developer.
    pub actor_id: UserId,

    /// Free-form action tag, e.g. `registration_accepted`.
    pub action: String,

    /// Kind of the target entity, e.g. `registration`.
    pub target_type: String,

    /// Id of the target entity.
    pub target_id: uuid::Uuid,

    /// Structured detail payload; opaque to the core.
    pub details: serde_json::Value,

    /// Caller address, when known.
    pub ip_address: Option<IpAddr>,

    /// Caller agent string, when known.
    pub user_agent: Option<String>,

    /// Recorded timestamp.
    pub created_at: DateTime<Utc>,
}
