//! # ICR runner
//!
//! Starts the inhaler counselling record service.
//!
//! # Environment Variables
//! - `ICR_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
//! - `ICR_DATA_DIR`: record storage root (default: "patient_data")
//! - `ICR_COMMIT_EMAIL`: email on audit commits
//! - `SYSTEM_PASSWORD`: shared login password (required)
//! - `SESSION_SECRET`: session signing key (default: `SYSTEM_PASSWORD`)
//! - `ICR_SECURE_COOKIES`: mark the session cookie `Secure`

use api_rest::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("icr=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("ICR_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let state = AppState::from_env()?;
    tracing::info!("++ Starting ICR REST on {}", rest_addr);

    api_rest::serve(&rest_addr, state).await
}
