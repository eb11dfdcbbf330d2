// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Gesture set management on top of a [`DriveStore`]
//!
//! Two top-level folders carry the whole model: "GestureSets" holds every
//! available set, "ActiveSet" holds at most one set, the one in use.
//! Nothing is cached; every call reads the remote hierarchy again.

pub mod dedup;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{AppConfig, FolderConfig, PublishStrategy};
use crate::drive::{DriveFile, DriveStore, FileQuery};
use crate::{GestureDriveError, Result};

/// A gesture set folder with its gesture file count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GestureSet {
    pub id: String,
    pub name: String,
    pub modified_time: Option<DateTime<Utc>>,
    pub gesture_count: usize,
    /// Human-readable location, e.g. `/GestureSets/Alpha/`
    pub drive_folder: String,
}

/// Identifiers of the two convention folders
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BaseFolders {
    pub gesture_sets_id: String,
    pub active_set_id: String,
}

/// Result of a publish. Field names are shared with the JSON consumers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishOutcome {
    pub success: bool,
    /// The previous active set was removed
    pub old_set_moved: bool,
    /// The new set was copied into place
    pub new_set_moved: bool,
    pub old_set_name: Option<String>,
    pub new_set_name: String,
    pub gesture_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PublishOutcome {
    fn started(name: &str) -> Self {
        Self {
            success: true,
            old_set_moved: false,
            new_set_moved: false,
            old_set_name: None,
            new_set_name: name.to_string(),
            gesture_count: 0,
            error: None,
        }
    }
}

/// Per-name result of a duplicate cleanup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleanupGroup {
    pub name: String,
    pub kept: String,
    pub kept_modified: Option<DateTime<Utc>>,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CleanupReport {
    pub groups: Vec<CleanupGroup>,
}

impl CleanupReport {
    pub fn deleted_count(&self) -> usize {
        self.groups.iter().map(|g| g.deleted.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.groups.iter().map(|g| g.failed.len()).sum()
    }

    /// Groups that actually had duplicates
    pub fn duplicates(&self) -> impl Iterator<Item = &CleanupGroup> {
        self.groups
            .iter()
            .filter(|g| !g.deleted.is_empty() || !g.failed.is_empty())
    }
}

/// Outcome of moving active sets back into the gesture set pool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResetReport {
    pub moved: Vec<String>,
    pub failed: Vec<String>,
    pub gesture_sets: Vec<GestureSet>,
}

/// Gesture set operations against a remote store
pub struct GestureSetManager<S> {
    store: S,
    folders: FolderConfig,
    patterns: Vec<String>,
    strategy: PublishStrategy,
}

impl<S: DriveStore> GestureSetManager<S> {
    pub fn new(store: S, config: &AppConfig) -> Self {
        Self {
            store,
            folders: config.folders.clone(),
            patterns: config.gestures.patterns.clone(),
            strategy: config.publish.strategy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn strategy(&self) -> PublishStrategy {
        self.strategy
    }

    /// Find or create the "GestureSets" and "ActiveSet" folders
    pub async fn ensure_base_folders(&self) -> Result<BaseFolders> {
        let gesture_sets = self.find_or_create(&self.folders.gesture_sets).await?;
        let active_set = self.find_or_create(&self.folders.active_set).await?;

        Ok(BaseFolders {
            gesture_sets_id: gesture_sets.id,
            active_set_id: active_set.id,
        })
    }

    async fn find_or_create(&self, name: &str) -> Result<DriveFile> {
        if let Some(folder) = self.store.find_folder(name, None).await? {
            return Ok(folder);
        }
        let folder = self.store.create_folder(name, None).await?;
        info!("Created {} folder: {}", name, folder.id);
        Ok(folder)
    }

    /// All gesture sets, with duplicates removed remotely first
    pub async fn list_gesture_sets(&self) -> Result<Vec<GestureSet>> {
        let folders = self.ensure_base_folders().await?;
        let sets = self
            .sets_under(&folders.gesture_sets_id, &self.folders.gesture_sets)
            .await?;
        let (sets, _) = self.cleanup_duplicates(sets).await;

        info!("Found {} gesture sets", sets.len());
        Ok(sets)
    }

    /// The set under "ActiveSet". When several exist the first listed wins.
    pub async fn get_current_active_set(&self) -> Result<Option<GestureSet>> {
        let folders = self.ensure_base_folders().await?;
        self.active_set_in(&folders).await
    }

    async fn active_set_in(&self, folders: &BaseFolders) -> Result<Option<GestureSet>> {
        let query = FileQuery::new()
            .in_folder(folders.active_set_id.as_str())
            .folders_only();
        let active = self.store.search_files(&query).await?;

        match active.into_iter().next() {
            Some(folder) => Ok(Some(self.describe(folder, &self.folders.active_set).await)),
            None => Ok(None),
        }
    }

    async fn sets_under(&self, parent_id: &str, parent_name: &str) -> Result<Vec<GestureSet>> {
        let query = FileQuery::new().in_folder(parent_id).folders_only();
        let folders = self.store.search_files(&query).await?;

        let mut sets = Vec::with_capacity(folders.len());
        for folder in folders {
            sets.push(self.describe(folder, parent_name).await);
        }
        Ok(sets)
    }

    async fn describe(&self, folder: DriveFile, parent_name: &str) -> GestureSet {
        let gesture_count = self.count_gestures(&folder.id).await;
        GestureSet {
            drive_folder: format!("/{}/{}/", parent_name, folder.name),
            id: folder.id,
            name: folder.name,
            modified_time: folder.modified_time,
            gesture_count,
        }
    }

    /// Number of children whose name matches a gesture pattern. Lookup
    /// failures count as zero.
    pub async fn count_gestures(&self, folder_id: &str) -> usize {
        let query = FileQuery::new()
            .in_folder(folder_id)
            .name_contains_any(self.patterns.iter().cloned());
        match self.store.search_files(&query).await {
            Ok(files) => files.len(),
            Err(e) => {
                warn!("Could not count gestures in {}: {}", folder_id, e);
                0
            }
        }
    }

    /// Keep the newest set per name and delete the others remotely. A failed
    /// delete is logged and the remaining deletes still run.
    pub async fn cleanup_duplicates(&self, sets: Vec<GestureSet>) -> (Vec<GestureSet>, CleanupReport) {
        let mut kept = Vec::new();
        let mut report = CleanupReport::default();

        for group in dedup::plan(sets) {
            let mut entry = CleanupGroup {
                name: group.name.clone(),
                kept: group.keep.id.clone(),
                kept_modified: group.keep.modified_time,
                deleted: Vec::new(),
                failed: Vec::new(),
            };

            if !group.discard.is_empty() {
                info!(
                    "Found {} duplicates for '{}', keeping newest",
                    group.discard.len() + 1,
                    group.name
                );
            }

            for duplicate in &group.discard {
                match self.store.delete_file(&duplicate.id).await {
                    Ok(()) => {
                        info!("Deleted duplicate: {}", duplicate.id);
                        entry.deleted.push(duplicate.id.clone());
                    }
                    Err(e) => {
                        warn!("Error deleting duplicate {}: {}", duplicate.id, e);
                        entry.failed.push(duplicate.id.clone());
                    }
                }
            }

            kept.push(group.keep);
            report.groups.push(entry);
        }

        (kept, report)
    }

    /// Run a duplicate cleanup over "GestureSets" and report every group
    pub async fn remove_duplicates(&self) -> Result<CleanupReport> {
        let folders = self.ensure_base_folders().await?;
        let sets = self
            .sets_under(&folders.gesture_sets_id, &self.folders.gesture_sets)
            .await?;
        let (_, report) = self.cleanup_duplicates(sets).await;
        Ok(report)
    }

    /// Copy a folder's immediate files into a new folder under
    /// `target_parent`. Subfolders are not copied. A file that fails to copy
    /// is skipped.
    pub async fn copy_folder(
        &self,
        source_folder_id: &str,
        target_parent_id: &str,
        new_name: &str,
    ) -> Result<DriveFile> {
        let new_folder = self
            .store
            .create_folder(new_name, Some(target_parent_id))
            .await?;
        info!("Created new folder: {} (ID: {})", new_name, new_folder.id);

        let children = self
            .store
            .search_files(&FileQuery::new().in_folder(source_folder_id))
            .await?;

        for child in children {
            if child.is_folder() {
                warn!("Skipping nested folder '{}': only files are copied", child.name);
                continue;
            }
            match self.store.copy_file(&child.id, &child.name, &new_folder.id).await {
                Ok(_) => debug!("Copied file: {}", child.name),
                Err(e) => warn!("Could not copy file {}: {}", child.name, e),
            }
        }

        Ok(new_folder)
    }

    pub async fn move_folder(
        &self,
        folder_id: &str,
        new_parent_id: &str,
        old_parent_id: &str,
    ) -> Result<DriveFile> {
        let moved = self
            .store
            .move_file(folder_id, new_parent_id, Some(old_parent_id))
            .await?;
        info!("Folder moved successfully: {}", folder_id);
        Ok(moved)
    }

    /// Make a gesture set the active one by copying it into "ActiveSet" and
    /// removing the previous active set.
    ///
    /// Nothing here is atomic. With the default delete-then-copy order a
    /// failed copy leaves no active set at all; with copy-then-delete a failed
    /// copy leaves the previous set active.
    pub async fn publish_gesture_set(
        &self,
        gesture_set_id: &str,
        gesture_set_name: &str,
    ) -> Result<PublishOutcome> {
        if gesture_set_id.trim().is_empty() || gesture_set_name.trim().is_empty() {
            return Err(GestureDriveError::InvalidInput(
                "gesture set id and name are required".to_string(),
            ));
        }

        let folders = self.ensure_base_folders().await?;
        let mut outcome = PublishOutcome::started(gesture_set_name);
        let current = self.active_set_in(&folders).await?;

        if self.strategy == PublishStrategy::DeleteThenCopy {
            if let Some(ref current) = current {
                self.retire(current, &mut outcome).await;
            }
        }

        match self
            .copy_folder(gesture_set_id, &folders.active_set_id, gesture_set_name)
            .await
        {
            Ok(folder) => {
                outcome.new_set_moved = true;
                outcome.gesture_count = self.count_gestures(&folder.id).await;
                info!("Copied new gesture set to {}: {}", self.folders.active_set, gesture_set_name);

                if self.strategy == PublishStrategy::CopyThenDelete {
                    if let Some(ref current) = current {
                        self.retire(current, &mut outcome).await;
                    }
                }
            }
            Err(e) => {
                warn!("Failed to copy {} into {}: {}", gesture_set_id, self.folders.active_set, e);
                outcome.success = false;
                outcome.error = Some(format!(
                    "Failed to copy new gesture set to {}: {}",
                    self.folders.active_set, e
                ));
            }
        }

        Ok(outcome)
    }

    async fn retire(&self, current: &GestureSet, outcome: &mut PublishOutcome) {
        match self.store.delete_file(&current.id).await {
            Ok(()) => {
                outcome.old_set_moved = true;
                outcome.old_set_name = Some(current.name.clone());
                info!("Deleted old active set: {}", current.name);
            }
            Err(e) => warn!("Could not delete old active set {}: {}", current.name, e),
        }
    }

    /// Move every folder under "ActiveSet" back into "GestureSets" and list
    /// the result
    pub async fn reset_gesture_sets(&self) -> Result<ResetReport> {
        let folders = self.ensure_base_folders().await?;
        let active = self
            .store
            .search_files(&FileQuery::new().in_folder(folders.active_set_id.as_str()).folders_only())
            .await?;

        if active.is_empty() {
            info!("{} folder is empty", self.folders.active_set);
        }

        let mut moved = Vec::new();
        let mut failed = Vec::new();
        for folder in active {
            match self
                .move_folder(&folder.id, &folders.gesture_sets_id, &folders.active_set_id)
                .await
            {
                Ok(_) => {
                    info!("Moved {} back to {}", folder.name, self.folders.gesture_sets);
                    moved.push(folder.name);
                }
                Err(e) => {
                    warn!("Could not move {} back: {}", folder.name, e);
                    failed.push(folder.name);
                }
            }
        }

        let gesture_sets = self.list_gesture_sets().await?;
        Ok(ResetReport {
            moved,
            failed,
            gesture_sets,
        })
    }
}
