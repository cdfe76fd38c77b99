//! [`FileStore`] backed by a Drive-v3-compatible HTTP API.
//!
//! Every file the portal manages lives directly under one configured folder;
//! ids outside that folder are reported as not found.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::credentials::AccessTokenSource;
use super::{FileContent, FileInfo, FileStore, FileUpload, StorageError, StorageResult};

const FILE_FIELDS: &str = "id,name,mimeType,size,createdTime,sha256Checksum,parents";
const PAGE_SIZE: &str = "100";

/// Endpoints and folder used by [`DriveFileStore`].
#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub api_base_url: String,
    pub upload_base_url: String,
    pub folder_id: String,
    pub request_timeout: Duration,
}

impl DriveConfig {
    pub fn new(folder_id: impl Into<String>) -> Self {
        Self {
            api_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
            folder_id: folder_id.into(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    sha256_checksum: Option<String>,
    #[serde(default)]
    parents: Vec<String>,
}

impl From<DriveFile> for FileInfo {
    fn from(file: DriveFile) -> Self {
        FileInfo {
            id: file.id,
            name: file.name,
            mime_type: file
                .mime_type
                .unwrap_or_else(|| super::DEFAULT_MIME_TYPE.to_string()),
            size: file.size.and_then(|s| s.parse().ok()),
            created_at: file.created_time,
            sha256: file.sha256_checksum,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Drive-backed file store.
pub struct DriveFileStore {
    config: DriveConfig,
    http: reqwest::Client,
    tokens: Arc<dyn AccessTokenSource>,
}

impl DriveFileStore {
    pub fn new(
        config: DriveConfig,
        http: reqwest::Client,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Self {
        Self {
            config,
            http,
            tokens,
        }
    }

    /// HTTP client with the configured request timeout.
    pub fn build_client(config: &DriveConfig) -> StorageResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StorageError::Transport(format!("failed to build HTTP client: {}", e)))
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    fn folder_query(&self) -> String {
        format!(
            "'{}' in parents and trashed = false",
            self.config.folder_id.replace('\'', "\\'")
        )
    }

    async fn check(response: reqwest::Response, id: Option<&str>) -> StorageResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<empty response>".to_string());
        Err(StorageError::from_status(status.as_u16(), body.trim().to_string(), id))
    }

    /// Metadata of `id`, provided it lives in the configured folder.
    async fn metadata(&self, id: &str) -> StorageResult<DriveFile> {
        let id = checked_id(id)?;
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .get(self.api_url(&format!("files/{}", id)))
            .bearer_auth(token)
            .query(&[("fields", FILE_FIELDS)])
            .send()
            .await?;
        let file: DriveFile = Self::check(response, Some(id)).await?.json().await?;
        if !file.parents.iter().any(|p| *p == self.config.folder_id) {
            log::warn!("Refusing access to file {} outside the portal folder", id);
            return Err(StorageError::not_found(id));
        }
        Ok(file)
    }
}

/// Reject ids that would alter the upstream URL path or query.
fn checked_id(id: &str) -> StorageResult<&str> {
    let valid = !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(id)
    } else {
        Err(StorageError::Validation(format!("malformed file id {:?}", id)))
    }
}

/// Build a `multipart/related` body: JSON metadata part, then the media part.
fn multipart_related(boundary: &str, metadata: &serde_json::Value, upload: &FileUpload) -> Vec<u8> {
    let mut body = Vec::with_capacity(upload.bytes().len() + 512);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n--{b}\r\nContent-Type: {mime}\r\n\r\n",
            b = boundary,
            meta = metadata,
            mime = upload.mime_type()
        )
        .as_bytes(),
    );
    body.extend_from_slice(upload.bytes());
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[async_trait]
impl FileStore for DriveFileStore {
    async fn list_files(&self) -> StorageResult<Vec<FileInfo>> {
        let token = self.tokens.access_token().await?;
        let query = self.folder_query();
        let fields = format!("nextPageToken,files({})", FILE_FIELDS);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", fields.as_str()),
                ("orderBy", "createdTime desc"),
                ("pageSize", PAGE_SIZE),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let response = self
                .http
                .get(self.api_url("files"))
                .bearer_auth(&token)
                .query(&params)
                .send()
                .await?;
            let page: FileList = Self::check(response, None).await?.json().await?;
            files.extend(page.files.into_iter().map(FileInfo::from));

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        log::debug!("Listed {} files in folder {}", files.len(), self.config.folder_id);
        Ok(files)
    }

    async fn upload(&self, upload: FileUpload) -> StorageResult<FileInfo> {
        let token = self.tokens.access_token().await?;
        let boundary = format!("portal-{}", Uuid::new_v4().simple());
        let metadata = serde_json::json!({
            "name": upload.name(),
            "mimeType": upload.mime_type(),
            "parents": [self.config.folder_id],
        });
        let body = multipart_related(&boundary, &metadata, &upload);

        let url = format!(
            "{}/files",
            self.config.upload_base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await?;
        let file: DriveFile = Self::check(response, None).await?.json().await?;
        log::info!("Uploaded {} as {}", file.name, file.id);
        Ok(file.into())
    }

    async fn download(&self, id: &str) -> StorageResult<FileContent> {
        let id = checked_id(id)?;
        let info: FileInfo = self.metadata(id).await?.into();
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .get(self.api_url(&format!("files/{}", id)))
            .bearer_auth(token)
            .query(&[("alt", "media")])
            .send()
            .await?;
        let bytes = Self::check(response, Some(id)).await?.bytes().await?;
        Ok(FileContent {
            info,
            bytes: bytes.to_vec(),
        })
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        let id = checked_id(id)?;
        self.metadata(id).await?;
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .delete(self.api_url(&format!("files/{}", id)))
            .bearer_auth(token)
            .send()
            .await?;
        Self::check(response, Some(id)).await?;
        log::info!("Deleted file {}", id);
        Ok(())
    }
}
