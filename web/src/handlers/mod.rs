//! HTTP handlers, one module per resource.

pub mod audit;
pub mod events;
pub mod health;
pub mod payments;
pub mod registrations;
