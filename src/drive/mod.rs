// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Remote file storage: file metadata, queries and the store abstraction
//!
//! Everything above this module talks to a [`DriveStore`]. The production
//! implementation is the REST [`client::DriveClient`]; [`memory::MemoryDrive`]
//! keeps the same folder semantics in process.

pub mod client;
pub mod memory;
pub mod query;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Result;

pub use client::DriveClient;
pub use memory::MemoryDrive;
pub use query::{FileKind, FileQuery};

/// Mime type Drive uses to mark folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Metadata of a remote file or folder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// Remote storage operations used by the gesture set manager and transfers
#[async_trait]
pub trait DriveStore: Send + Sync {
    /// Run a search, following pagination until exhausted
    async fn search_files(&self, query: &FileQuery) -> Result<Vec<DriveFile>>;

    /// Create a folder, at the root when `parent` is `None`
    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<DriveFile>;

    /// Copy a single file (not a folder) into `parent` under `name`
    async fn copy_file(&self, file_id: &str, name: &str, parent: &str) -> Result<DriveFile>;

    /// Re-parent a file or folder. When `old_parent` is `None` every current
    /// parent is removed.
    async fn move_file(
        &self,
        file_id: &str,
        new_parent: &str,
        old_parent: Option<&str>,
    ) -> Result<DriveFile>;

    /// Permanently delete a file or folder (folders take their contents along)
    async fn delete_file(&self, file_id: &str) -> Result<()>;

    /// Upload a local file into `folder_id`
    async fn upload_file(&self, path: &Path, name: &str, folder_id: &str) -> Result<DriveFile>;

    /// Download file content to a local path
    async fn download_file(&self, file_id: &str, path: &Path) -> Result<()>;

    /// First non-trashed folder called `name`, optionally under `parent`
    async fn find_folder(&self, name: &str, parent: Option<&str>) -> Result<Option<DriveFile>> {
        let mut query = FileQuery::new().named(name).folders_only();
        if let Some(parent) = parent {
            query = query.in_folder(parent);
        }
        let files = self.search_files(&query).await?;
        Ok(files.into_iter().next())
    }
}
