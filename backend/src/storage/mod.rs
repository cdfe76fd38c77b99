//! Proxy for course material files kept in cloud storage.
//!
//! Browsers never talk to the storage service directly: the portal lists,
//! uploads, downloads and deletes files on their behalf with its own
//! service-account credentials. [`FileStore`] is the seam; the Drive-backed
//! implementation is behind the `drive-storage` feature and an in-memory one
//! is always available for tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub mod error;
pub mod memory;

#[cfg(feature = "drive-storage")]
pub mod credentials;
#[cfg(feature = "drive-storage")]
pub mod drive;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryFileStore;

#[cfg(feature = "drive-storage")]
pub use credentials::{
    AccessTokenSource, ServiceAccountKey, ServiceAccountTokenSource, StaticToken, DRIVE_SCOPE,
};
#[cfg(feature = "drive-storage")]
pub use drive::{DriveConfig, DriveFileStore};

/// MIME type assumed when an upload does not name one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Metadata of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    /// Hex SHA-256 of the content, when the store knows it.
    pub sha256: Option<String>,
}

/// A downloaded file.
#[derive(Debug, Clone)]
pub struct FileContent {
    pub info: FileInfo,
    pub bytes: Vec<u8>,
}

/// A validated upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl FileUpload {
    /// Validate an upload against the configured size limit.
    ///
    /// The name must be non-empty and free of path separators; an empty
    /// MIME type falls back to [`DEFAULT_MIME_TYPE`].
    pub fn new(
        name: impl Into<String>,
        mime_type: Option<String>,
        bytes: Vec<u8>,
        max_bytes: usize,
    ) -> StorageResult<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(StorageError::Validation("file name must not be empty".into()));
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(StorageError::Validation(format!(
                "file name {:?} must not contain path separators",
                name
            )));
        }
        if bytes.len() > max_bytes {
            return Err(StorageError::Validation(format!(
                "file is {} bytes, limit is {}",
                bytes.len(),
                max_bytes
            )));
        }
        let mime_type = mime_type
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

        Ok(Self {
            name,
            mime_type,
            bytes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Storage backend for course material files.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Files in the portal's folder, newest first.
    async fn list_files(&self) -> StorageResult<Vec<FileInfo>>;

    async fn upload(&self, upload: FileUpload) -> StorageResult<FileInfo>;

    /// * `Err(StorageError::NotFound)` - If the id is unknown or outside the folder
    async fn download(&self, id: &str) -> StorageResult<FileContent>;

    async fn delete(&self, id: &str) -> StorageResult<()>;
}

/// Hex-encoded SHA-256 of `content`.
pub fn content_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_stable_and_content_sensitive() {
        assert_eq!(content_digest(b"syllabus"), content_digest(b"syllabus"));
        assert_ne!(content_digest(b"syllabus v1"), content_digest(b"syllabus v2"));
        assert_eq!(content_digest(b"").len(), 64);
    }

    #[test]
    fn test_upload_validation() {
        assert!(FileUpload::new("notes.pdf", None, vec![1, 2, 3], 10).is_ok());
        assert!(FileUpload::new("  ", None, vec![], 10).is_err());
        assert!(FileUpload::new("../etc/passwd", None, vec![], 10).is_err());
        assert!(FileUpload::new("a\\b.txt", None, vec![], 10).is_err());
        assert!(FileUpload::new("big.bin", None, vec![0; 11], 10).is_err());

        let upload = FileUpload::new(" plan.txt ", Some(String::new()), vec![], 10).unwrap();
        assert_eq!(upload.name(), "plan.txt");
        assert_eq!(upload.mime_type(), DEFAULT_MIME_TYPE);
    }
}
