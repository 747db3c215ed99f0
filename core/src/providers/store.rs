//! Transactional store trait.
//!
//! Every method is one atomic unit: implementations own the transaction
//! boundaries, the uniqueness constraints, and the row-level locking the
//! concurrency model requires. The services never compose storage calls
//! into a larger critical section; anything that must be atomic is a
//! single trait method.

use crate::audit::{AuditFilter, NewAuditEntry};
use crate::error::Result;
use crate::state::{
    AuditEntry, ConfirmationChannel, Event, EventId, PaymentAttempt, PaymentStatus, Registration,
    RegistrationId, RegistrationStatus,
};

/// Outcome of a registration status transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    /// The registration after the transition.
    pub registration: Registration,

    /// Status before the transition. Equal to the new status for no-op
    /// transitions, which still produce an audit entry but never adjust
    /// capacity.
    pub old_status: RegistrationStatus,
}

/// How a confirmation landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// This call moved the attempt `Created → Paid`.
    Applied,
    /// The attempt was already `Paid`; the call was a no-op re-confirm.
    AlreadyPaid,
}

/// Result of an idempotent confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    /// The attempt after the confirmation.
    pub attempt: PaymentAttempt,

    /// Whether this call applied the confirmation or re-confirmed.
    pub outcome: ConfirmOutcome,
}

/// Report from the capacity reconciliation safety net.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityReconciliation {
    /// Counter value before reconciliation.
    pub stored: u32,

    /// Recounted number of accepted registrations.
    pub actual: u32,

    /// Whether the stored counter was overwritten.
    pub repaired: bool,
}

/// Transactional persistence for events, registrations, payment attempts
/// and audit entries.
///
/// # Atomicity contract
///
/// - [`insert_registration`](Self::insert_registration) is atomic with the
///   `(event, participant)` uniqueness check: the constraint closes the
///   race between concurrent duplicate requests.
/// - [`transition_registration`](Self::transition_registration) serializes
///   on the registration row; the capacity adjustment is a single atomic
///   storage-level update, clamped at zero, applied exactly when the
///   accepted boundary is crossed; the audit entry commits with the
///   change or not at all.
/// - [`insert_attempt`](Self::insert_attempt) converges concurrent inserts
///   for the same registration onto the single surviving active attempt.
/// - [`confirm_attempt`](Self::confirm_attempt) is an atomic
///   `Created → Paid` compare-and-set keyed by order id; safe to apply
///   twice from either confirmation channel and across process instances.
pub trait RegistrationStore: Send + Sync {
    // ═══════════════════════════════════════════════════════════
    // Events
    // ═══════════════════════════════════════════════════════════

    /// Fetch an event.
    fn event(&self, id: EventId) -> impl std::future::Future<Output = Result<Option<Event>>> + Send;

    /// Persist a new event together with its audit entry.
    fn insert_event(
        &self,
        event: &Event,
        audit: NewAuditEntry,
    ) -> impl std::future::Future<Output = Result<Event>> + Send;

    /// Overwrite an event's mutable fields together with its audit entry.
    ///
    /// `current_participants` is not written here; the ledger owns it.
    fn update_event(
        &self,
        event: &Event,
        audit: NewAuditEntry,
    ) -> impl std::future::Future<Output = Result<Event>> + Send;

    // ═══════════════════════════════════════════════════════════
    // Registrations
    // ═══════════════════════════════════════════════════════════

    /// Fetch a registration.
    fn registration(
        &self,
        id: RegistrationId,
    ) -> impl std::future::Future<Output = Result<Option<Registration>>> + Send;

    /// Persist a new registration.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::Conflict`] if a registration for the same
    /// `(event, participant)` pair already exists (constraint-backed).
    fn insert_registration(
        &self,
        registration: &Registration,
    ) -> impl std::future::Future<Output = Result<Registration>> + Send;

    /// Transition a registration's status in one transaction.
    ///
    /// Applies `payment_status` when given, crosses the capacity boundary
    /// exactly when accepted-ness changes (increment on enter, clamped
    /// decrement on leave), and records exactly one audit entry. Same-status
    /// transitions are legal: audited, never capacity-adjusted.
    fn transition_registration(
        &self,
        id: RegistrationId,
        new_status: RegistrationStatus,
        payment_status: Option<PaymentStatus>,
        audit: NewAuditEntry,
    ) -> impl std::future::Future<Output = Result<TransitionOutcome>> + Send;

    // ═══════════════════════════════════════════════════════════
    // Payment attempts
    // ═══════════════════════════════════════════════════════════

    /// Fetch the active (`Created` or `Paid`) attempt of a registration.
    fn active_attempt(
        &self,
        registration_id: RegistrationId,
    ) -> impl std::future::Future<Output = Result<Option<PaymentAttempt>>> + Send;

    /// Persist a new attempt and mark the owning registration as awaiting
    /// payment (`payment_status = Pending`, `payment_order_id` set), in one
    /// transaction.
    ///
    /// If another active attempt for the same registration won a concurrent
    /// race, returns that surviving attempt instead of inserting.
    fn insert_attempt(
        &self,
        attempt: &PaymentAttempt,
    ) -> impl std::future::Future<Output = Result<PaymentAttempt>> + Send;

    /// Idempotently confirm the attempt with the given order id.
    ///
    /// First confirmation moves the attempt `Created → Paid`, stores the
    /// external payment id (and checkout signature when present), marks the
    /// owning registration `payment_status = Completed`, and, for the
    /// webhook channel, raises the provenance flags. Re-confirmation of a
    /// `Paid` attempt is a no-op success that may still raise the webhook
    /// flags. One transaction either way.
    ///
    /// # Errors
    ///
    /// - [`crate::CoreError::NotFound`] if no attempt matches the order id.
    /// - [`crate::CoreError::InvalidState`] if the attempt is `Failed` or
    ///   `Refunded`.
    fn confirm_attempt(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: Option<&str>,
        channel: ConfirmationChannel,
    ) -> impl std::future::Future<Output = Result<Confirmation>> + Send;

    // ═══════════════════════════════════════════════════════════
    // Capacity ledger
    // ═══════════════════════════════════════════════════════════

    /// Adjust an event's participant counter by `delta`, clamped at zero.
    ///
    /// The single writer of `current_participants` outside transitions.
    /// No upper clamp: the override path may overbook.
    fn adjust_capacity(
        &self,
        event_id: EventId,
        delta: i32,
    ) -> impl std::future::Future<Output = Result<u32>> + Send;

    /// Recount the registrations currently in `Accepted` status.
    fn recount_accepted(
        &self,
        event_id: EventId,
    ) -> impl std::future::Future<Output = Result<u32>> + Send;

    /// Recount and repair the stored counter in one transaction.
    ///
    /// The audit entry is persisted (with the stored/actual counts merged
    /// into its details) only when a repair happened.
    fn reconcile_capacity(
        &self,
        event_id: EventId,
        audit: NewAuditEntry,
    ) -> impl std::future::Future<Output = Result<CapacityReconciliation>> + Send;

    // ═══════════════════════════════════════════════════════════
    // Audit trail
    // ═══════════════════════════════════════════════════════════

    /// Append a standalone audit entry.
    fn record_audit(
        &self,
        entry: NewAuditEntry,
    ) -> impl std::future::Future<Output = Result<AuditEntry>> + Send;

    /// Query the audit trail, newest first.
    fn audit_entries(
        &self,
        filter: &AuditFilter,
    ) -> impl std::future::Future<Output = Result<Vec<AuditEntry>>> + Send;
}
