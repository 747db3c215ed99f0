//! Server entry point: Postgres store, Razorpay gateway, system clock.

use anyhow::Context;
use rsvp_core::SystemClock;
use rsvp_gateway::{GatewayConfig, RazorpayClient};
use rsvp_postgres::PostgresStore;
use rsvp_web::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let store = PostgresStore::connect(&database_url).await?;
    store.migrate().await?;

    let gateway = RazorpayClient::new(GatewayConfig::from_env()?)?;
    let state = AppState::new(store, gateway, SystemClock);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, rsvp_web::router(state))
        .await
        .context("server error")?;
    Ok(())
}
