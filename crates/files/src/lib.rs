//! Clinic attachment storage
//!
//! Binary attachments (for example dermatology skin photos) are kept out of the structured
//! record store. Records hold an [`AttachmentMetadata`] reference; the bytes live in a
//! content-addressed tree scoped to the owning record:
//!
//! ```text
//! <data_dir>/attachments/
//! └── <s1>/<s2>/<owner_id>/
//!     └── sha256/
//!         └── ab/
//!             └── cd/
//!                 └── abcd3f9e…
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use clinic_files::AttachmentStore;
//! use clinic_uuid::RecordId;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = AttachmentStore::new(Path::new("clinic_data/attachments"))?;
//! let visit = RecordId::new();
//! let meta = store.add(&visit, "mole.jpg", &[0xFF, 0xD8, 0xFF, 0xE0])?;
//! let bytes = store.read(&visit, meta.hash.as_str())?;
//! # Ok(())
//! # }
//! ```

mod files;

pub use files::{
    allowed_image_bytes, sniff_media_type, AttachmentMetadata, AttachmentStore,
    SKIN_PHOTO_MEDIA_TYPES,
};

/// Name of the digest folder inside each owner directory.
pub const HASH_FOLDER_NAME: &str = "sha256";

/// Errors that can occur during attachment operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory could not be created or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// No attachment with the given hash exists for the owner
    #[error("Attachment not found: {0}")]
    NotFound(String),

    /// The hash supplied by the caller is malformed
    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    /// The attachment was empty
    #[error("Attachment is empty")]
    Empty,

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
