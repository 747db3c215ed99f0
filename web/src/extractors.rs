//! Custom Axum extractors.
//!
//! - [`AuthenticatedActor`]: the acting identity. An upstream auth
//!   middleware is expected to insert an [`Actor`] into the request
//!   extensions; absent that, the `X-User-Id`/`X-User-Role` header pair
//!   stands in.
//! - [`ClientIp`]: caller address from the usual proxy headers.
//! - [`UserAgent`]: the `User-Agent` header, when present.

use crate::error::AppError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use rsvp_core::{Actor, Provenance, Role, UserId};
use std::net::{IpAddr, Ipv4Addr};
use uuid::Uuid;

/// The authenticated actor behind a request.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(actor) = parts.extensions.get::<Actor>() {
            return Ok(Self(*actor));
        }

        let user_id = header_str(&parts.headers, "X-User-Id")
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(UserId);
        let role = header_str(&parts.headers, "X-User-Role").and_then(Role::parse);

        match (user_id, role) {
            (Some(user_id), Some(role)) => Ok(Self(Actor::new(user_id, role))),
            _ => Err(AppError::unauthorized("missing or invalid identity")),
        }
    }
}

/// Client IP address.
///
/// Priority: first entry of `X-Forwarded-For`, then `X-Real-IP`, then
/// the loopback fallback.
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub IpAddr);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(extract_client_ip(&parts.headers)))
    }
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn extract_client_ip(headers: &HeaderMap) -> IpAddr {
    if let Some(ip) = header_str(headers, "X-Forwarded-For")
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok())
    {
        return ip;
    }
    if let Some(ip) = header_str(headers, "X-Real-IP").and_then(|v| v.parse().ok()) {
        return ip;
    }
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

/// `User-Agent` header.
#[derive(Debug, Clone)]
pub struct UserAgent(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for UserAgent
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            header_str(&parts.headers, "User-Agent").map(str::to_owned),
        ))
    }
}

/// Combine the caller extractors into audit provenance.
#[must_use]
pub fn provenance(ip: ClientIp, user_agent: &UserAgent) -> Provenance {
    Provenance {
        ip_address: Some(ip.0),
        user_agent: user_agent.0.clone(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use axum::http::Request;

    fn parts_of(req: Request<()>) -> Parts {
        req.into_parts().0
    }

    #[tokio::test]
    async fn actor_from_headers() {
        let user_id = Uuid::new_v4();
        let req = Request::builder()
            .header("X-User-Id", user_id.to_string())
            .header("X-User-Role", "admin")
            .body(())
            .unwrap();

        let actor = AuthenticatedActor::from_request_parts(&mut parts_of(req), &())
            .await
            .unwrap();

        assert_eq!(actor.0.user_id.0, user_id);
        assert_eq!(actor.0.role, Role::Admin);
    }

    #[tokio::test]
    async fn actor_from_extensions_wins() {
        let injected = Actor::new(UserId::new(), Role::Developer);
        let mut req = Request::builder().body(()).unwrap();
        req.extensions_mut().insert(injected);

        let actor = AuthenticatedActor::from_request_parts(&mut parts_of(req), &())
            .await
            .unwrap();

        assert_eq!(actor.0, injected);
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized() {
        let req = Request::builder().body(()).unwrap();
        let err = AuthenticatedActor::from_request_parts(&mut parts_of(req), &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_role_is_unauthorized() {
        let req = Request::builder()
            .header("X-User-Id", Uuid::new_v4().to_string())
            .header("X-User-Role", "superuser")
            .body(())
            .unwrap();
        let err = AuthenticatedActor::from_request_parts(&mut parts_of(req), &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn client_ip_from_x_forwarded_for() {
        let req = Request::builder()
            .header("X-Forwarded-For", "203.0.113.1, 198.51.100.1")
            .body(())
            .unwrap();
        let ip = ClientIp::from_request_parts(&mut parts_of(req), &())
            .await
            .unwrap();
        assert_eq!(ip.0.to_string(), "203.0.113.1");
    }

    #[tokio::test]
    async fn client_ip_from_x_real_ip() {
        let req = Request::builder()
            .header("X-Real-IP", "198.51.100.42")
            .body(())
            .unwrap();
        let ip = ClientIp::from_request_parts(&mut parts_of(req), &())
            .await
            .unwrap();
        assert_eq!(ip.0.to_string(), "198.51.100.42");
    }

    #[tokio::test]
    async fn client_ip_falls_back_to_loopback() {
        let req = Request::builder().body(()).unwrap();
        let ip = ClientIp::from_request_parts(&mut parts_of(req), &())
            .await
            .unwrap();
        assert_eq!(ip.0, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn user_agent_absent_is_none() {
        let req = Request::builder().body(()).unwrap();
        let ua = UserAgent::from_request_parts(&mut parts_of(req), &())
            .await
            .unwrap();
        assert!(ua.0.is_none());
    }
}
