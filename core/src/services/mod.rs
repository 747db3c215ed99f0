//! Core services.
//!
//! Three services own the business rules: the registration state machine
//! (with the capacity ledger behind it), the payment reconciliation
//! engine, and the supplementary event management. Each is generic over
//! the provider traits so the same logic runs against any store.

pub mod audit;
pub mod events;
pub mod payments;
pub mod registrations;

pub use audit::AuditService;
pub use events::{EventDraft, EventPatch, EventService};
pub use payments::{CheckoutOrder, PaymentService, WebhookOutcome, CURRENCY};
pub use registrations::RegistrationService;
