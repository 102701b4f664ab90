//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into services and the
//! HTTP layer. Nothing below the binary reads process-wide environment variables during
//! request handling.

use crate::constants::{
    ATTACHMENTS_DIR_NAME, DEFAULT_DATA_DIR, DEFAULT_MAX_UPLOAD_BYTES,
    DEFAULT_RATE_LIMIT_AUTH, DEFAULT_RATE_LIMIT_GLOBAL, DEFAULT_RATE_LIMIT_SENSITIVE,
    DEFAULT_RATE_LIMIT_WINDOW_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::{ClinicError, ClinicResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Deployment environment; controls error-message redaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ClinicError::Config(format!(
                "unknown environment '{other}' (expected Development or Production)"
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("Development"),
            Environment::Production => f.write_str("Production"),
        }
    }
}

/// Which [`Store`](crate::store::Store) implementation backs the services.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Yaml,
}

impl FromStr for StorageBackend {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "yaml" => Ok(StorageBackend::Yaml),
            other => Err(ClinicError::Config(format!(
                "unknown storage backend '{other}' (expected memory or yaml)"
            ))),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => f.write_str("memory"),
            StorageBackend::Yaml => f.write_str("yaml"),
        }
    }
}

/// Fixed-window permit limits per policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub global: u32,
    pub auth: u32,
    pub sensitive: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            global: DEFAULT_RATE_LIMIT_GLOBAL,
            auth: DEFAULT_RATE_LIMIT_AUTH,
            sensitive: DEFAULT_RATE_LIMIT_SENSITIVE,
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ClinicConfig {
    environment: Environment,
    storage: StorageBackend,
    data_dir: PathBuf,
    rate_limits: RateLimitConfig,
    request_timeout: Duration,
    max_upload_bytes: usize,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            storage: StorageBackend::Memory,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            rate_limits: RateLimitConfig::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ClinicConfig {
    /// Builds configuration from a variable lookup.
    ///
    /// The binary passes `|k| std::env::var(k).ok()`; tests pass a map lookup so they never
    /// mutate the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::Config` when a variable is present but cannot be parsed, or when a
    /// limit is zero.
    pub fn from_env_values(lookup: impl Fn(&str) -> Option<String>) -> ClinicResult<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        fn number<T: FromStr>(key: &str, value: Option<String>, default: T) -> ClinicResult<T> {
            match value {
                None => Ok(default),
                Some(v) => v
                    .parse::<T>()
                    .map_err(|_| ClinicError::Config(format!("{key} must be a number, got '{v}'"))),
            }
        }

        let environment = get("CLINIC_ENVIRONMENT")
            .map(|v| v.parse::<Environment>())
            .transpose()?
            .unwrap_or(Environment::Production);
        let storage = get("CLINIC_STORAGE")
            .map(|v| v.parse::<StorageBackend>())
            .transpose()?
            .unwrap_or(StorageBackend::Memory);
        let data_dir = get("CLINIC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let rate_limits = RateLimitConfig {
            window: Duration::from_secs(number(
                "CLINIC_RATE_LIMIT_WINDOW_SECS",
                get("CLINIC_RATE_LIMIT_WINDOW_SECS"),
                DEFAULT_RATE_LIMIT_WINDOW_SECS,
            )?),
            global: number(
                "CLINIC_RATE_LIMIT_GLOBAL",
                get("CLINIC_RATE_LIMIT_GLOBAL"),
                DEFAULT_RATE_LIMIT_GLOBAL,
            )?,
            auth: number(
                "CLINIC_RATE_LIMIT_AUTH",
                get("CLINIC_RATE_LIMIT_AUTH"),
                DEFAULT_RATE_LIMIT_AUTH,
            )?,
            sensitive: number(
                "CLINIC_RATE_LIMIT_SENSITIVE",
                get("CLINIC_RATE_LIMIT_SENSITIVE"),
                DEFAULT_RATE_LIMIT_SENSITIVE,
            )?,
        };

        let request_timeout = Duration::from_secs(number(
            "CLINIC_REQUEST_TIMEOUT_SECS",
            get("CLINIC_REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        let max_upload_bytes = number(
            "CLINIC_MAX_UPLOAD_BYTES",
            get("CLINIC_MAX_UPLOAD_BYTES"),
            DEFAULT_MAX_UPLOAD_BYTES,
        )?;

        Self::new(
            environment,
            storage,
            data_dir,
            rate_limits,
            request_timeout,
            max_upload_bytes,
        )
    }

    pub fn new(
        environment: Environment,
        storage: StorageBackend,
        data_dir: PathBuf,
        rate_limits: RateLimitConfig,
        request_timeout: Duration,
        max_upload_bytes: usize,
    ) -> ClinicResult<Self> {
        if rate_limits.window.is_zero() {
            return Err(ClinicError::Config(
                "rate limit window must be at least one second".into(),
            ));
        }
        if rate_limits.global == 0 || rate_limits.auth == 0 || rate_limits.sensitive == 0 {
            return Err(ClinicError::Config(
                "rate limit permits must be greater than zero".into(),
            ));
        }
        if request_timeout.is_zero() {
            return Err(ClinicError::Config(
                "request timeout must be at least one second".into(),
            ));
        }
        if max_upload_bytes == 0 {
            return Err(ClinicError::Config(
                "max upload size must be greater than zero".into(),
            ));
        }

        Ok(Self {
            environment,
            storage,
            data_dir,
            rate_limits,
            request_timeout,
            max_upload_bytes,
        })
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn storage(&self) -> StorageBackend {
        self.storage
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn attachments_dir(&self) -> PathBuf {
        self.data_dir.join(ATTACHMENTS_DIR_NAME)
    }

    pub fn rate_limits(&self) -> RateLimitConfig {
        self.rate_limits
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Returns a copy with a different environment. Used by tests and the CLI.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.data_dir = data_dir;
        self
    }

    pub fn with_storage(mut self, storage: StorageBackend) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_rate_limits(mut self, rate_limits: RateLimitConfig) -> Self {
        self.rate_limits = rate_limits;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}
