//! Constants used throughout the clinic core crate.
//!
//! Paths, filenames and default limits live here so they stay consistent across services,
//! storage backends and configuration.

/// Default directory for YAML records and attachments when none is configured.
pub const DEFAULT_DATA_DIR: &str = "clinic_data";

/// Directory (under the data directory) holding binary attachments.
pub const ATTACHMENTS_DIR_NAME: &str = "attachments";

/// Filename of a single record inside its sharded directory.
pub const RECORD_FILENAME: &str = "record.yaml";

/// Default page size when the caller omits or sends a non-positive value.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Maximum length of sanitised free-text notes.
pub const MAX_NOTES_LEN: usize = 4000;

/// Maximum length of a normalised search query.
pub const MAX_SEARCH_QUERY_LEN: usize = 200;

/// Maximum length of person name fields.
pub const MAX_NAME_LEN: usize = 100;

/// Maximum length of short descriptive fields (medication, descriptions, SKU names).
pub const MAX_SHORT_TEXT_LEN: usize = 200;

/// Default rate-limit window in seconds.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Default permits per window for the global policy.
pub const DEFAULT_RATE_LIMIT_GLOBAL: u32 = 100;

/// Default permits per window for the auth policy.
pub const DEFAULT_RATE_LIMIT_AUTH: u32 = 10;

/// Default permits per window for the sensitive policy.
pub const DEFAULT_RATE_LIMIT_SENSITIVE: u32 = 20;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default upload limit (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
