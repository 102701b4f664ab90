//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the clinic REST API on its own, reading configuration from the environment (and a
//! `.env` file when present). The workspace's `clinic-run` binary does the same with the
//! workspace-wide log directive.
//!
//! ## Environment variables
//! - `CLINIC_REST_ADDR`: listen address (default `0.0.0.0:3000`)
//! - `CLINIC_API_KEYS`: comma-separated `key:tenant:user:role` entries
//! - `CLINIC_ENVIRONMENT`, `CLINIC_STORAGE`, `CLINIC_DATA_DIR` and the `CLINIC_RATE_LIMIT_*`
//!   limits, see `ClinicConfig::from_env_values`

use api_shared::ApiKeyRegistry;
use clinic_core::ClinicConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("clinic_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("CLINIC_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let config = ClinicConfig::from_env_values(|key| std::env::var(key).ok())?;
    let keys = ApiKeyRegistry::parse(&std::env::var("CLINIC_API_KEYS").unwrap_or_default())?;

    tracing::info!(
        "-- {} environment, {} storage, {} API keys",
        config.environment(),
        config.storage(),
        keys.len()
    );

    api_rest::serve(config, keys, &addr).await
}
