//! File store behaviour through the `FileStore` trait object.

use std::sync::Arc;

use schedule_portal::storage::{
    content_digest, FileStore, FileUpload, MemoryFileStore, StorageError, DEFAULT_MIME_TYPE,
};

fn upload(name: &str, bytes: &[u8]) -> FileUpload {
    FileUpload::new(name, None, bytes.to_vec(), 1024).unwrap()
}

#[tokio::test]
async fn test_round_trip_through_trait_object() {
    let store: Arc<dyn FileStore> = Arc::new(MemoryFileStore::new());

    let info = store.upload(upload("syllabus.pdf", b"%PDF-1.7")).await.unwrap();
    assert_eq!(info.mime_type, DEFAULT_MIME_TYPE);
    assert_eq!(info.size, Some(8));
    assert_eq!(info.sha256.as_deref(), Some(content_digest(b"%PDF-1.7").as_str()));

    let content = store.download(&info.id).await.unwrap();
    assert_eq!(content.bytes, b"%PDF-1.7");
    assert_eq!(content.info, info);
}

#[tokio::test]
async fn test_list_and_delete() {
    let store = MemoryFileStore::new();
    let a = store.upload(upload("a.txt", b"a")).await.unwrap();
    store.upload(upload("b.txt", b"b")).await.unwrap();
    assert_eq!(store.list_files().await.unwrap().len(), 2);

    store.delete(&a.id).await.unwrap();
    let remaining = store.list_files().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "b.txt");
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let store = MemoryFileStore::new();
    assert!(matches!(
        store.download("missing").await,
        Err(StorageError::NotFound { .. })
    ));
    assert!(matches!(
        store.delete("missing").await,
        Err(StorageError::NotFound { .. })
    ));
}

#[test]
fn test_upload_limits_and_names() {
    assert!(FileUpload::new("ok.txt", None, vec![0; 16], 16).is_ok());
    assert!(matches!(
        FileUpload::new("big.txt", None, vec![0; 17], 16),
        Err(StorageError::Validation(_))
    ));
    assert!(FileUpload::new("  ", None, vec![], 16).is_err());
    assert!(FileUpload::new("../etc/passwd", None, vec![], 16).is_err());

    let explicit = FileUpload::new("n.md", Some(" text/markdown ".into()), vec![], 16).unwrap();
    assert_eq!(explicit.mime_type(), "text/markdown");
}
