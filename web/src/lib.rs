//! # RSVP Web
//!
//! Thin Axum surface over the core services. Handlers extract identity
//! and provenance, call exactly one service operation, and map the
//! domain error onto a status code; no business rules live here.
//!
//! # Request flow
//!
//! 1. The correlation middleware tags the request and its tracing span.
//! 2. Extractors produce the [`Actor`](rsvp_core::Actor) (from request
//!    extensions or the stand-in identity headers) and the audit
//!    provenance (client IP, user agent).
//! 3. The handler dispatches into [`AppState`]'s services.
//! 4. [`AppError`] converts the outcome into JSON plus a status code.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use error::AppError;
pub use extractors::{AuthenticatedActor, ClientIp, UserAgent};
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};
pub use state::AppState;

use axum::routing::{get, patch, post, put};
use axum::Router;
use rsvp_core::{Clock, PaymentGateway, RegistrationStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

/// Build the full application router over the given state.
pub fn router<S, G, C>(state: AppState<S, G, C>) -> Router
where
    S: RegistrationStore + 'static,
    G: PaymentGateway + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/v1/registrations",
            post(handlers::registrations::register::<S, G, C>),
        )
        .route(
            "/api/v1/admin/registrations/:id",
            patch(handlers::registrations::transition::<S, G, C>),
        )
        .route(
            "/api/v1/developer/registrations/:id/override",
            patch(handlers::registrations::override_transition::<S, G, C>),
        )
        .route(
            "/api/v1/payments/create-order",
            post(handlers::payments::create_order::<S, G, C>),
        )
        .route(
            "/api/v1/payments/verify",
            post(handlers::payments::verify_checkout::<S, G, C>),
        )
        .route(
            "/api/v1/payments/webhook",
            post(handlers::payments::webhook::<S, G, C>),
        )
        .route(
            "/api/v1/admin/events",
            post(handlers::events::create_event::<S, G, C>),
        )
        .route(
            "/api/v1/admin/events/:id",
            put(handlers::events::update_event::<S, G, C>),
        )
        .route(
            "/api/v1/developer/audit-logs",
            get(handlers::audit::audit_logs::<S, G, C>),
        )
        .route(
            "/api/v1/developer/events/:id/reconcile",
            post(handlers::registrations::reconcile_capacity::<S, G, C>),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(correlation_id_layer())
        .with_state(state)
}
