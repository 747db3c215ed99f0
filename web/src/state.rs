//! Application state for Axum handlers.

use rsvp_core::{
    AuditService, Clock, EventService, PaymentGateway, PaymentService, RegistrationService,
    RegistrationStore,
};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Generic over the providers so the same router serves the Postgres
/// store and Razorpay client in production and the in-memory mocks in
/// tests.
pub struct AppState<S, G, C> {
    /// Registration lifecycle service.
    pub registrations: Arc<RegistrationService<S, C>>,
    /// Payment reconciliation service.
    pub payments: Arc<PaymentService<S, G, C>>,
    /// Event management service.
    pub events: Arc<EventService<S, C>>,
    /// Audit trail queries.
    pub audit: Arc<AuditService<S>>,
}

impl<S, G, C> AppState<S, G, C>
where
    S: RegistrationStore + Clone,
    G: PaymentGateway,
    C: Clock + Clone,
{
    /// Wire all services over the given providers.
    pub fn new(store: S, gateway: G, clock: C) -> Self {
        Self {
            registrations: Arc::new(RegistrationService::new(store.clone(), clock.clone())),
            payments: Arc::new(PaymentService::new(store.clone(), gateway, clock.clone())),
            events: Arc::new(EventService::new(store.clone(), clock)),
            audit: Arc::new(AuditService::new(store)),
        }
    }
}

// Manual impl: a derive would put Clone bounds on S, G and C.
impl<S, G, C> Clone for AppState<S, G, C> {
    fn clone(&self) -> Self {
        Self {
            registrations: Arc::clone(&self.registrations),
            payments: Arc::clone(&self.payments),
            events: Arc::clone(&self.events),
            audit: Arc::clone(&self.audit),
        }
    }
}
