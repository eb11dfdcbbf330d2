// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Moving user training data between the local pipeline and Drive

use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::drive::{DriveFile, DriveStore, FileQuery};
use crate::{GestureDriveError, Result};

/// What a recursive upload created
#[derive(Debug, Clone, Serialize)]
pub struct UploadSummary {
    pub root: DriveFile,
    pub folders: usize,
    pub files: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelUpload {
    pub user_id: String,
    pub upload: UploadSummary,
    pub local_removed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDataDownload {
    pub user_id: String,
    pub user_dir: PathBuf,
    pub files: Vec<String>,
}

/// Reject ids that could escape the pipeline directory
pub fn validate_user_id(user_id: &str) -> Result<()> {
    let bad = user_id.trim().is_empty()
        || user_id.contains(['/', '\\'])
        || user_id.contains("..");
    if bad {
        return Err(GestureDriveError::InvalidInput(format!(
            "invalid user id '{}'",
            user_id
        )));
    }
    Ok(())
}

/// The name a remote file may take on disk: exactly one normal path
/// component, so the download stays inside the user directory
fn local_file_name(remote_name: &str) -> Option<&Path> {
    let mut components = Path::new(remote_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if !remote_name.contains('\\') => {
            Some(Path::new(name))
        }
        _ => None,
    }
}

/// Mirror a local directory under `parent_id`, creating each folder before
/// its contents and visiting entries in name order. The first failure stops
/// the walk; whatever was created before it stays.
pub fn upload_folder_recursive<'a, S: DriveStore>(
    store: &'a S,
    local_path: &'a Path,
    parent_id: &'a str,
) -> BoxFuture<'a, Result<UploadSummary>> {
    async move {
        let folder_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                GestureDriveError::InvalidInput(format!("cannot name a folder after {:?}", local_path))
            })?;

        let folder = store.create_folder(folder_name, Some(parent_id)).await?;
        info!("Created folder {} (ID: {})", folder_name, folder.id);

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(local_path).await?;
        while let Some(entry) = dir.next_entry().await? {
            entries.push((entry.path(), entry.file_type().await?.is_dir()));
        }
        entries.sort();

        let mut summary = UploadSummary {
            root: folder,
            folders: 1,
            files: 0,
        };

        for (path, is_dir) in entries {
            if is_dir {
                let nested = upload_folder_recursive(store, &path, &summary.root.id).await?;
                summary.folders += nested.folders;
                summary.files += nested.files;
            } else {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .ok_or_else(|| {
                        GestureDriveError::InvalidInput(format!("unsupported file name {:?}", path))
                    })?;
                store.upload_file(&path, name, &summary.root.id).await?;
                info!("Uploaded file {}", name);
                summary.files += 1;
            }
        }

        Ok(summary)
    }
    .boxed()
}

/// Upload `user_<id>` from the pipeline into "CustomGesture", then remove the
/// local copy unless `keep_local` is set
pub async fn upload_trained_model<S: DriveStore>(
    store: &S,
    config: &AppConfig,
    user_id: &str,
    keep_local: bool,
) -> Result<ModelUpload> {
    validate_user_id(user_id)?;

    let custom = store
        .find_folder(&config.folders.custom_gesture, None)
        .await?
        .ok_or_else(|| {
            GestureDriveError::NotFound(format!("{} folder", config.folders.custom_gesture))
        })?;

    let user_dir = config.pipeline.user_dir(user_id);
    let is_dir = tokio::fs::metadata(&user_dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(GestureDriveError::NotFound(format!(
            "user directory {:?}",
            user_dir
        )));
    }

    let upload = upload_folder_recursive(store, &user_dir, &custom.id).await?;
    info!(
        "Uploaded trained model folder for user_{} to {}",
        user_id, config.folders.custom_gesture
    );

    let mut local_removed = false;
    if !keep_local {
        match tokio::fs::remove_dir_all(&user_dir).await {
            Ok(()) => {
                info!("Cleaned up local user directory: {:?}", user_dir);
                local_removed = true;
            }
            Err(e) => warn!("Failed to clean up local directory {:?}: {}", user_dir, e),
        }
    }

    Ok(ModelUpload {
        user_id: user_id.to_string(),
        upload,
        local_removed,
    })
}

/// Download every file in "UploadGesture" whose name contains the user id
/// into `user_<id>`. The first failed download stops the rest.
pub async fn download_user_data<S: DriveStore>(
    store: &S,
    config: &AppConfig,
    user_id: &str,
) -> Result<UserDataDownload> {
    validate_user_id(user_id)?;

    let upload_folder = store
        .find_folder(&config.folders.upload_gesture, None)
        .await?
        .ok_or_else(|| {
            GestureDriveError::NotFound(format!("{} folder", config.folders.upload_gesture))
        })?;

    let query = FileQuery::new()
        .in_folder(upload_folder.id.as_str())
        .name_contains_any([user_id])
        .files_only();
    let user_files = store.search_files(&query).await?;
    if user_files.is_empty() {
        return Err(GestureDriveError::NotFound(format!(
            "data files for user {}",
            user_id
        )));
    }

    let user_dir = config.pipeline.user_dir(user_id);
    tokio::fs::create_dir_all(&user_dir).await?;

    let mut files = Vec::with_capacity(user_files.len());
    for file in user_files {
        let Some(local_name) = local_file_name(&file.name) else {
            warn!("Skipping {} (ID: {}): not a plain file name", file.name, file.id);
            continue;
        };
        store.download_file(&file.id, &user_dir.join(local_name)).await?;
        info!("Downloaded {}", file.name);
        files.push(file.name);
    }

    info!("Downloaded all data for user {}", user_id);
    Ok(UserDataDownload {
        user_id: user_id.to_string(),
        user_dir,
        files,
    })
}
