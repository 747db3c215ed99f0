//! # RSVP Core
//!
//! Registration lifecycle and payment reconciliation for an
//! event-registration platform.
//!
//! Four components make up the core:
//!
//! - **Registration State Machine** ([`services::RegistrationService`]) —
//!   creation under the published/deadline/capacity rules and admin or
//!   developer transitions between `Pending`, `Accepted` and `Rejected`.
//! - **Event Capacity Ledger** — the participant counter, written only
//!   through the store's transition/adjust/reconcile operations, moved
//!   exactly when a transition crosses the accepted boundary.
//! - **Payment Reconciliation Engine** ([`services::PaymentService`]) —
//!   at most one active payment attempt per registration, confirmed
//!   exactly once no matter which channel (checkout verification or
//!   webhook) arrives first or how often either is retried.
//! - **Audit Recorder** ([`audit`]) — one immutable entry per privileged
//!   state change, committed in the same transaction as the change.
//!
//! Everything else — HTTP, authentication, the concrete database, the
//! concrete gateway — enters through the [`providers`] traits.

pub mod audit;
pub mod error;
pub mod providers;
pub mod services;
pub mod state;

pub use audit::{AuditFilter, NewAuditEntry};
pub use error::{CoreError, Result};
pub use providers::{
    CapacityReconciliation, Clock, ConfirmOutcome, Confirmation, GatewayOrder, PaymentGateway,
    RegistrationStore, SystemClock, TransitionOutcome,
};
pub use services::{
    AuditService, CheckoutOrder, EventDraft, EventPatch, EventService, PaymentService,
    RegistrationService, WebhookOutcome, CURRENCY,
};
pub use state::{
    Actor, AttemptStatus, AuditEntry, AuditEntryId, Capability, ConfirmationChannel, Event,
    EventId, EventStatus, Money, PaymentAttempt, PaymentAttemptId, PaymentStatus, Provenance,
    Registration, RegistrationId, RegistrationStatus, Role, UserId,
};
