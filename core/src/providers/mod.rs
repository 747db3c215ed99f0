//! Provider traits.
//!
//! This module defines traits for the external collaborators the core
//! depends on: transactional persistence, the payment gateway, and the
//! clock. The services depend on these traits only, so the same logic runs
//! against PostgreSQL in production and against in-memory mocks in tests.

pub mod clock;
pub mod gateway;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use gateway::{GatewayOrder, PaymentGateway};
pub use store::{
    CapacityReconciliation, ConfirmOutcome, Confirmation, RegistrationStore, TransitionOutcome,
};
