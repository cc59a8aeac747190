//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own, for development and debugging. The workspace's main
//! `icr-run` binary serves the same router.

use api_rest::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Starts the REST API server on `ICR_REST_ADDR` (default: 0.0.0.0:3000).
///
/// See [`AppState::from_env`] for the remaining environment variables.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("ICR_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    tracing::info!("-- Starting ICR REST API on {}", addr);

    let state = AppState::from_env()?;
    api_rest::serve(&addr, state).await
}
