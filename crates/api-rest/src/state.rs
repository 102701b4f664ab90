use crate::middleware::rate_limit::RateLimiter;
use api_shared::ApiKeyRegistry;
use clinic_core::{ClinicConfig, ClinicServices};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared by every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub services: ClinicServices,
    pub config: Arc<ClinicConfig>,
    pub keys: Arc<ApiKeyRegistry>,
    pub limiter: Arc<RateLimiter>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(services: ClinicServices, config: ClinicConfig, keys: ApiKeyRegistry) -> Self {
        let limiter = RateLimiter::new(config.rate_limits());
        Self {
            services,
            config: Arc::new(config),
            keys: Arc::new(keys),
            limiter: Arc::new(limiter),
            started_at: Instant::now(),
        }
    }
}
