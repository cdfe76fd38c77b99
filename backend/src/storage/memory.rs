//! In-memory file store for tests and local development.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::{content_digest, FileContent, FileInfo, FileStore, FileUpload, StorageError, StorageResult};

/// In-memory [`FileStore`]. Cloning shares the stored files.
#[derive(Clone, Default)]
pub struct MemoryFileStore {
    files: Arc<RwLock<HashMap<String, FileContent>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn list_files(&self) -> StorageResult<Vec<FileInfo>> {
        let mut infos: Vec<FileInfo> = self.files.read().values().map(|f| f.info.clone()).collect();
        infos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(infos)
    }

    async fn upload(&self, upload: FileUpload) -> StorageResult<FileInfo> {
        let info = FileInfo {
            id: Uuid::new_v4().simple().to_string(),
            name: upload.name().to_string(),
            mime_type: upload.mime_type().to_string(),
            size: Some(upload.bytes().len() as u64),
            created_at: Some(Utc::now()),
            sha256: Some(content_digest(upload.bytes())),
        };
        let content = FileContent {
            info: info.clone(),
            bytes: upload.bytes().to_vec(),
        };
        self.files.write().insert(info.id.clone(), content);
        log::info!("Stored file {} ({}) in memory", info.name, info.id);
        Ok(info)
    }

    async fn download(&self, id: &str) -> StorageResult<FileContent> {
        self.files
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(id))
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        match self.files.write().remove(id) {
            Some(_) => Ok(()),
            None => Err(StorageError::not_found(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_download_delete() {
        let store = MemoryFileStore::new();
        let upload = FileUpload::new("week32.pdf", Some("application/pdf".into()), b"%PDF".to_vec(), 1024).unwrap();
        let info = store.upload(upload).await.unwrap();
        assert_eq!(info.size, Some(4));
        assert_eq!(info.sha256.as_deref(), Some(content_digest(b"%PDF").as_str()));

        let content = store.download(&info.id).await.unwrap();
        assert_eq!(content.bytes, b"%PDF");
        assert_eq!(content.info.mime_type, "application/pdf");

        assert_eq!(store.list_files().await.unwrap().len(), 1);
        store.delete(&info.id).await.unwrap();
        assert!(store.is_empty());
        assert!(matches!(store.delete(&info.id).await, Err(StorageError::NotFound { .. })));
    }
}
