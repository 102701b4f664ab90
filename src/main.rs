//! Main entry point for the clinic backend.
//!
//! Starts the REST API with configuration from the environment (and `.env` when present).
//!
//! # Environment Variables
//! - `CLINIC_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
//! - `CLINIC_API_KEYS`: comma-separated `key:tenant:user:role` entries
//! - `CLINIC_ENVIRONMENT`: `Development` or `Production` (default)
//! - `CLINIC_STORAGE`: `memory` (default) or `yaml`
//! - `CLINIC_DATA_DIR`: directory for YAML records and attachments
//! - `CLINIC_RATE_LIMIT_WINDOW_SECS`, `CLINIC_RATE_LIMIT_GLOBAL`, `CLINIC_RATE_LIMIT_AUTH`,
//!   `CLINIC_RATE_LIMIT_SENSITIVE`, `CLINIC_REQUEST_TIMEOUT_SECS`, `CLINIC_MAX_UPLOAD_BYTES`

use api_shared::ApiKeyRegistry;
use clinic_core::ClinicConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic=info".parse()?)
                .add_directive("clinic_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("CLINIC_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let config = ClinicConfig::from_env_values(|key| std::env::var(key).ok())?;
    let keys = ApiKeyRegistry::parse(&std::env::var("CLINIC_API_KEYS").unwrap_or_default())?;

    tracing::info!(
        "++ Starting clinic backend ({} environment, {} storage)",
        config.environment(),
        config.storage()
    );

    api_rest::serve(config, keys, &rest_addr).await
}
