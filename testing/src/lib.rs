//! # RSVP Testing
//!
//! Test doubles for the RSVP core: an in-memory store implementing the
//! full [`rsvp_core::RegistrationStore`] atomicity contract, a
//! deterministic mock payment gateway that counts order-creation calls,
//! and a fixed clock.
//!
//! The in-memory store guards all state with a single mutex, so every
//! trait method is atomic exactly as the contract requires; tests that
//! interleave concurrent operations observe the same convergence behavior
//! as the PostgreSQL store.

mod clock;
mod gateway;
mod store;

pub use clock::FixedClock;
pub use gateway::MockGateway;
pub use store::InMemoryStore;
