//! Content-addressed attachment store implementation.
//!
//! Files are identified by their SHA-256 digest, which gives:
//!
//! - **Deduplication**: identical bytes for the same owner are stored once
//! - **Integrity**: stored content can be verified against its name
//! - **Immutability**: a path never changes content once written
//!
//! Storage is scoped per owning record so that deleting or exporting one record's
//! attachments never touches another's.

use crate::{FilesError, HASH_FOLDER_NAME};
use chrono::{DateTime, Utc};
use clinic_types::NonEmptyText;
use clinic_uuid::{RecordId, Sha256Hash};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Media types accepted for skin photos.
pub const SKIN_PHOTO_MEDIA_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/heic"];

/// Metadata for a stored attachment.
///
/// This is embedded in the owning record and is the only link between the structured record
/// and the bytes on disk.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentMetadata {
    /// Hexadecimal SHA-256 digest of the content
    pub hash: Sha256Hash,

    /// Size of the content in bytes
    pub size_bytes: u64,

    /// Detected media type, best effort
    pub media_type: Option<NonEmptyText>,

    /// Filename supplied by the uploader
    pub original_filename: NonEmptyText,

    pub stored_at: DateTime<Utc>,
}

impl AttachmentMetadata {
    /// Returns true when the detected media type is an accepted skin photo format.
    pub fn allowed_image(&self) -> bool {
        self.media_type
            .as_ref()
            .is_some_and(|m| SKIN_PHOTO_MEDIA_TYPES.contains(&m.as_str()))
    }
}

/// Detects the media type of `bytes` from its magic number.
pub fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
    infer::get(bytes).map(|kind| kind.mime_type())
}

/// Returns true when `bytes` look like an accepted skin photo format.
pub fn allowed_image_bytes(bytes: &[u8]) -> bool {
    sniff_media_type(bytes).is_some_and(|m| SKIN_PHOTO_MEDIA_TYPES.contains(&m))
}

/// Attachment store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root_directory: PathBuf,
}

impl AttachmentStore {
    /// Opens (creating if needed) an attachment store at `root_directory`.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::InvalidRootDirectory` if the path exists but is not a directory
    /// or cannot be created.
    pub fn new(root_directory: &Path) -> Result<Self, FilesError> {
        if root_directory.exists() && !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        fs::create_dir_all(root_directory).map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot create {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self {
            root_directory: root_directory.to_path_buf(),
        })
    }

    /// Stores `bytes` for `owner` and returns the attachment metadata.
    ///
    /// Adding identical content twice for the same owner is idempotent: the existing file is
    /// left untouched and the same hash is returned.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if the content is empty or the write fails.
    pub fn add(
        &self,
        owner: &RecordId,
        original_filename: &str,
        bytes: &[u8],
    ) -> Result<AttachmentMetadata, FilesError> {
        if bytes.is_empty() {
            return Err(FilesError::Empty);
        }

        let hash_array: [u8; 32] = Sha256::digest(bytes).into();
        let hash = Sha256Hash::from_bytes(&hash_array);
        let storage_path = self.storage_path(owner, &hash);

        if storage_path.exists() {
            tracing::debug!("attachment {} already stored for {}", hash, owner);
        } else {
            if let Some(parent) = storage_path.parent() {
                fs::create_dir_all(parent)?;
            }
            // Write to a sibling temp file first so readers never observe a partial file.
            let tmp_path = storage_path.with_extension("partial");
            fs::write(&tmp_path, bytes)?;
            fs::rename(&tmp_path, &storage_path)?;
        }

        let original_filename = Path::new(original_filename)
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| NonEmptyText::new(n).ok())
            .unwrap_or_else(|| NonEmptyText::new("upload").expect("literal is non-empty"));

        let media_type = sniff_media_type(bytes).and_then(|m| NonEmptyText::new(m).ok());

        Ok(AttachmentMetadata {
            hash,
            size_bytes: bytes.len() as u64,
            media_type,
            original_filename,
            stored_at: Utc::now(),
        })
    }

    /// Reads the content stored under `hash` for `owner`.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::InvalidHash` for a malformed hash and `FilesError::NotFound` when no
    /// such attachment exists.
    pub fn read(&self, owner: &RecordId, hash: &str) -> Result<Vec<u8>, FilesError> {
        let hash = Sha256Hash::parse(hash).map_err(|e| FilesError::InvalidHash(e.to_string()))?;
        let storage_path = self.storage_path(owner, &hash);
        if !storage_path.is_file() {
            return Err(FilesError::NotFound(hash.to_string()));
        }
        Ok(fs::read(&storage_path)?)
    }

    /// Returns `<root>/<sharded owner>/sha256/<h[0..2]>/<h[2..4]>/<hash>`.
    fn storage_path(&self, owner: &RecordId, hash: &Sha256Hash) -> PathBuf {
        let hex = hash.as_str();
        owner
            .sharded_dir(&self.root_directory)
            .join(HASH_FOLDER_NAME)
            .join(&hex[0..2])
            .join(&hex[2..4])
            .join(hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_add_and_read_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = AttachmentStore::new(&temp.path().join("attachments")).unwrap();
        let owner = RecordId::new();

        let meta = store.add(&owner, "lesion.png", PNG_HEADER).unwrap();
        assert_eq!(meta.size_bytes, PNG_HEADER.len() as u64);
        assert_eq!(meta.original_filename.as_str(), "lesion.png");
        assert_eq!(meta.media_type.as_ref().map(|m| m.as_str()), Some("image/png"));
        assert!(meta.allowed_image());

        let bytes = store.read(&owner, meta.hash.as_str()).unwrap();
        assert_eq!(bytes, PNG_HEADER);
    }

    #[test]
    fn test_add_same_content_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = AttachmentStore::new(temp.path()).unwrap();
        let owner = RecordId::new();

        let first = store.add(&owner, "a.png", PNG_HEADER).unwrap();
        let second = store.add(&owner, "b.png", PNG_HEADER).unwrap();
        assert_eq!(first.hash, second.hash);
    }

    #[test]
    fn test_attachments_are_scoped_to_owner() {
        let temp = TempDir::new().unwrap();
        let store = AttachmentStore::new(temp.path()).unwrap();
        let owner = RecordId::new();
        let other = RecordId::new();

        let meta = store.add(&owner, "a.png", PNG_HEADER).unwrap();
        assert!(matches!(
            store.read(&other, meta.hash.as_str()),
            Err(FilesError::NotFound(_))
        ));
    }

    #[test]
    fn test_filename_is_stripped_of_directories() {
        let temp = TempDir::new().unwrap();
        let store = AttachmentStore::new(temp.path()).unwrap();
        let meta = store
            .add(&RecordId::new(), "../../etc/passwd", b"plain text")
            .unwrap();
        assert_eq!(meta.original_filename.as_str(), "passwd");
        assert!(meta.media_type.is_none());
        assert!(!meta.allowed_image());
    }

    #[test]
    fn test_rejects_empty_and_bad_hash() {
        let temp = TempDir::new().unwrap();
        let store = AttachmentStore::new(temp.path()).unwrap();
        let owner = RecordId::new();

        assert!(matches!(store.add(&owner, "x", &[]), Err(FilesError::Empty)));
        assert!(matches!(
            store.read(&owner, "../../secret"),
            Err(FilesError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_sniffs_photos_before_storing() {
        assert_eq!(sniff_media_type(PNG_HEADER), Some("image/png"));
        assert!(allowed_image_bytes(PNG_HEADER));
        assert!(!allowed_image_bytes(b"%PDF-1.7 not a photo"));
    }

    #[test]
    fn test_root_must_be_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            AttachmentStore::new(&file),
            Err(FilesError::InvalidRootDirectory(_))
        ));
    }
}
