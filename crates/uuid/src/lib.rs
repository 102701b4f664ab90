//! Record identifiers and sharded-path utilities.
//!
//! Every clinic record is identified by a [`RecordId`]. Its *canonical* representation is
//! **32 lowercase hexadecimal characters** (no hyphens), which is also the form used to derive
//! storage locations.
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! HTTP clients frequently send the hyphenated form, so [`RecordId::parse_lenient`] accepts any
//! RFC 4122 textual form. [`RecordId::parse`] stays strict and is used for anything read back
//! from storage.
//!
//! ## Sharded directory layout
//! For a canonical id `u`, records live under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! This keeps any single directory from accumulating a very large fan-out.

mod hash;
mod id;

pub use hash::Sha256Hash;
pub use id::RecordId;

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
