// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Drive v3 REST client

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{DriveFile, DriveStore, FileQuery, FOLDER_MIME_TYPE};
use crate::auth::TokenProvider;
use crate::config::{AppConfig, DriveConfig};
use crate::{GestureDriveError, Result};

/// Metadata fields requested for every file
const FILE_FIELDS: &str = "id,name,mimeType,modifiedTime,parents";

const PAGE_SIZE: &str = "1000";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ParentList {
    #[serde(default)]
    parents: Vec<String>,
}

/// Authenticated Drive API client
pub struct DriveClient {
    client: Client,
    api_url: String,
    upload_url: String,
    tokens: Arc<TokenProvider>,
}

impl DriveClient {
    /// Create a client against the configured endpoints
    pub fn new(config: &DriveConfig, client: Client, tokens: TokenProvider) -> Self {
        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            upload_url: config.upload_url.trim_end_matches('/').to_string(),
            tokens: Arc::new(tokens),
        }
    }

    /// Build the HTTP client and token provider from application config
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.drive.timeout_secs))
            .build()?;
        let tokens = TokenProvider::from_config(&config.auth, client.clone())?;
        Ok(Self::new(&config.drive, client, tokens))
    }

    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.tokens.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GestureDriveError::Drive { status, message });
        }

        Ok(response)
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.api_url, file_id)
    }

    async fn parents_of(&self, file_id: &str) -> Result<Vec<String>> {
        let request = self
            .client
            .get(self.file_url(file_id))
            .query(&[("fields", "parents")]);
        let list: ParentList = self.send(request).await?.json().await?;
        Ok(list.parents)
    }
}

/// Body for a `multipart/related` upload: JSON metadata then raw content
fn multipart_related(boundary: &str, metadata: &serde_json::Value, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 512);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[async_trait]
impl DriveStore for DriveClient {
    async fn search_files(&self, query: &FileQuery) -> Result<Vec<DriveFile>> {
        let q = query.to_drive_query();
        let fields = format!("nextPageToken,files({})", FILE_FIELDS);
        let url = format!("{}/files", self.api_url);
        debug!("Searching Drive: {}", q);

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", q.as_str()),
                ("fields", fields.as_str()),
                ("pageSize", PAGE_SIZE),
            ];
            if let Some(ref token) = page_token {
                params.push(("pageToken", token.as_str()));
            }

            let request = self.client.get(&url).query(&params);
            let page: FileList = self.send(request).await?.json().await?;
            files.extend(page.files);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(files)
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<DriveFile> {
        let mut metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
        });
        if let Some(parent) = parent {
            metadata["parents"] = serde_json::json!([parent]);
        }

        let request = self
            .client
            .post(format!("{}/files", self.api_url))
            .query(&[("fields", FILE_FIELDS)])
            .json(&metadata);
        let folder: DriveFile = self.send(request).await?.json().await?;

        info!("Created folder '{}' ({})", folder.name, folder.id);
        Ok(folder)
    }

    async fn copy_file(&self, file_id: &str, name: &str, parent: &str) -> Result<DriveFile> {
        let request = self
            .client
            .post(format!("{}/copy", self.file_url(file_id)))
            .query(&[("fields", FILE_FIELDS)])
            .json(&serde_json::json!({ "name": name, "parents": [parent] }));
        let copy: DriveFile = self.send(request).await?.json().await?;

        debug!("Copied {} to {} ({})", file_id, copy.name, copy.id);
        Ok(copy)
    }

    async fn move_file(
        &self,
        file_id: &str,
        new_parent: &str,
        old_parent: Option<&str>,
    ) -> Result<DriveFile> {
        let remove = match old_parent {
            Some(parent) => parent.to_string(),
            None => self.parents_of(file_id).await?.join(","),
        };

        let request = self
            .client
            .patch(self.file_url(file_id))
            .query(&[
                ("addParents", new_parent),
                ("removeParents", remove.as_str()),
                ("fields", FILE_FIELDS),
            ])
            .json(&serde_json::json!({}));
        let moved: DriveFile = self.send(request).await?.json().await?;

        info!("Moved {} into {}", file_id, new_parent);
        Ok(moved)
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        let request = self.client.delete(self.file_url(file_id));
        self.send(request).await?;
        info!("Deleted {}", file_id);
        Ok(())
    }

    async fn upload_file(&self, path: &Path, name: &str, folder_id: &str) -> Result<DriveFile> {
        let content = tokio::fs::read(path).await?;
        let metadata = serde_json::json!({ "name": name, "parents": [folder_id] });
        let boundary = format!("gesture-drive-{}", uuid::Uuid::new_v4().simple());

        let request = self
            .client
            .post(format!("{}/files", self.upload_url))
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(multipart_related(&boundary, &metadata, &content));
        let uploaded: DriveFile = self.send(request).await?.json().await?;

        debug!("Uploaded {:?} as {} ({} bytes)", path, uploaded.id, content.len());
        Ok(uploaded)
    }

    async fn download_file(&self, file_id: &str, path: &Path) -> Result<()> {
        let request = self
            .client
            .get(self.file_url(file_id))
            .query(&[("alt", "media")]);
        let bytes = self.send(request).await?.bytes().await?;
        tokio::fs::write(path, &bytes).await?;

        debug!("Downloaded {} to {:?} ({} bytes)", file_id, path, bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_related_layout() {
        let metadata = serde_json::json!({ "name": "a.pkl" });
        let body = multipart_related("b", &metadata, b"DATA");
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with("--b\r\nContent-Type: application/json"));
        assert!(text.contains(r#"{"name":"a.pkl"}"#));
        assert!(text.contains("application/octet-stream\r\n\r\nDATA\r\n--b--"));
    }
}
