// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! In-process Drive with the same folder semantics as the remote one
//!
//! Used to exercise the gesture set workflows without network access.
//! Individual operations can be made to fail to reproduce partial remote
//! failures.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{DriveFile, DriveStore, FileQuery, FOLDER_MIME_TYPE};
use crate::{GestureDriveError, Result};

/// Remote operation kinds, for failure injection and the operation log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Search,
    CreateFolder,
    Copy,
    Move,
    Delete,
    Upload,
    Download,
}

struct Entry {
    file: DriveFile,
    content: Vec<u8>,
    trashed: bool,
}

struct State {
    entries: Vec<Entry>,
    next_id: u64,
    clock: DateTime<Utc>,
    failures: HashSet<(Operation, String)>,
    failing_ops: HashSet<Operation>,
    log: Vec<(Operation, String)>,
}

impl State {
    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += Duration::minutes(1);
        self.clock
    }

    fn insert(&mut self, name: &str, mime: &str, parent: Option<&str>, content: Vec<u8>) -> DriveFile {
        self.next_id += 1;
        let modified = self.tick();
        let file = DriveFile {
            id: format!("mem-{}", self.next_id),
            name: name.to_string(),
            mime_type: mime.to_string(),
            modified_time: Some(modified),
            parents: parent.map(|p| vec![p.to_string()]).unwrap_or_default(),
        };
        self.entries.push(Entry {
            file: file.clone(),
            content,
            trashed: false,
        });
        file
    }

    fn find(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.file.id == id)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.file.id == id)
    }

    fn check(&mut self, op: Operation, target: &str) -> Result<()> {
        if self.failing_ops.contains(&op) || self.failures.contains(&(op, target.to_string())) {
            return Err(GestureDriveError::Remote(format!(
                "injected {:?} failure for '{}'",
                op, target
            )));
        }
        if op != Operation::Search {
            self.log.push((op, target.to_string()));
        }
        Ok(())
    }
}

fn not_found(id: &str) -> GestureDriveError {
    GestureDriveError::Drive {
        status: 404,
        message: format!("File not found: {}", id),
    }
}

/// In-memory [`DriveStore`]
pub struct MemoryDrive {
    state: Mutex<State>,
}

impl Default for MemoryDrive {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDrive {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                entries: Vec::new(),
                next_id: 0,
                clock: Utc
                    .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                    .single()
                    .unwrap_or_default(),
                failures: HashSet::new(),
                failing_ops: HashSet::new(),
                log: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a folder
    pub fn add_folder(&self, name: &str, parent: Option<&str>) -> DriveFile {
        self.state().insert(name, FOLDER_MIME_TYPE, parent, Vec::new())
    }

    /// Seed a folder with an explicit modification time
    pub fn add_folder_modified(
        &self,
        name: &str,
        parent: Option<&str>,
        modified: DateTime<Utc>,
    ) -> DriveFile {
        let mut state = self.state();
        let mut folder = state.insert(name, FOLDER_MIME_TYPE, parent, Vec::new());
        folder.modified_time = Some(modified);
        if let Some(entry) = state.find_mut(&folder.id) {
            entry.file.modified_time = Some(modified);
        }
        folder
    }

    /// Seed a file with content
    pub fn add_file(&self, name: &str, parent: &str, content: &[u8]) -> DriveFile {
        self.state()
            .insert(name, "application/octet-stream", Some(parent), content.to_vec())
    }

    /// Mark an entry as trashed; searches skip it by default
    pub fn trash(&self, id: &str) {
        if let Some(entry) = self.state().find_mut(id) {
            entry.trashed = true;
        }
    }

    /// Make `op` fail for one target: a file id for copy, move, delete and
    /// download; a name for folder creation and upload
    pub fn fail_on(&self, op: Operation, target: &str) {
        self.state().failures.insert((op, target.to_string()));
    }

    /// Make every call of `op` fail
    pub fn fail_all(&self, op: Operation) {
        self.state().failing_ops.insert(op);
    }

    pub fn get(&self, id: &str) -> Option<DriveFile> {
        self.state().find(id).map(|e| e.file.clone())
    }

    pub fn content(&self, id: &str) -> Option<Vec<u8>> {
        self.state().find(id).map(|e| e.content.clone())
    }

    /// Non-trashed direct children of a folder
    pub fn children(&self, parent_id: &str) -> Vec<DriveFile> {
        self.state()
            .entries
            .iter()
            .filter(|e| !e.trashed && e.file.parents.iter().any(|p| p == parent_id))
            .map(|e| e.file.clone())
            .collect()
    }

    /// Non-trashed folders with this name, anywhere
    pub fn folders_named(&self, name: &str) -> Vec<DriveFile> {
        self.state()
            .entries
            .iter()
            .filter(|e| !e.trashed && e.file.is_folder() && e.file.name == name)
            .map(|e| e.file.clone())
            .collect()
    }

    /// Successful mutating operations in call order
    pub fn operations(&self) -> Vec<(Operation, String)> {
        self.state().log.clone()
    }
}

#[async_trait]
impl DriveStore for MemoryDrive {
    async fn search_files(&self, query: &FileQuery) -> Result<Vec<DriveFile>> {
        let mut state = self.state();
        state.check(Operation::Search, &query.to_drive_query())?;
        Ok(state
            .entries
            .iter()
            .filter(|e| query.matches(&e.file, e.trashed))
            .map(|e| e.file.clone())
            .collect())
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<DriveFile> {
        let mut state = self.state();
        state.check(Operation::CreateFolder, name)?;
        if let Some(parent) = parent {
            if state.find(parent).is_none() {
                return Err(not_found(parent));
            }
        }
        Ok(state.insert(name, FOLDER_MIME_TYPE, parent, Vec::new()))
    }

    async fn copy_file(&self, file_id: &str, name: &str, parent: &str) -> Result<DriveFile> {
        let mut state = self.state();
        state.check(Operation::Copy, file_id)?;
        let (mime, content) = match state.find(file_id) {
            Some(e) if e.file.is_folder() => {
                return Err(GestureDriveError::Drive {
                    status: 403,
                    message: "Folders cannot be copied".to_string(),
                })
            }
            Some(e) => (e.file.mime_type.clone(), e.content.clone()),
            None => return Err(not_found(file_id)),
        };
        if state.find(parent).is_none() {
            return Err(not_found(parent));
        }
        Ok(state.insert(name, &mime, Some(parent), content))
    }

    async fn move_file(
        &self,
        file_id: &str,
        new_parent: &str,
        old_parent: Option<&str>,
    ) -> Result<DriveFile> {
        let mut state = self.state();
        state.check(Operation::Move, file_id)?;
        if state.find(new_parent).is_none() {
            return Err(not_found(new_parent));
        }
        let modified = state.tick();
        let entry = state.find_mut(file_id).ok_or_else(|| not_found(file_id))?;
        match old_parent {
            Some(old) => entry.file.parents.retain(|p| p != old),
            None => entry.file.parents.clear(),
        }
        if !entry.file.parents.iter().any(|p| p == new_parent) {
            entry.file.parents.push(new_parent.to_string());
        }
        entry.file.modified_time = Some(modified);
        Ok(entry.file.clone())
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        let mut state = self.state();
        state.check(Operation::Delete, file_id)?;
        if state.find(file_id).is_none() {
            return Err(not_found(file_id));
        }

        let mut doomed = vec![file_id.to_string()];
        let mut i = 0;
        while i < doomed.len() {
            let parent = doomed[i].clone();
            doomed.extend(
                state
                    .entries
                    .iter()
                    .filter(|e| e.file.parents.contains(&parent))
                    .map(|e| e.file.id.clone()),
            );
            i += 1;
        }
        state.entries.retain(|e| !doomed.contains(&e.file.id));
        Ok(())
    }

    async fn upload_file(&self, path: &Path, name: &str, folder_id: &str) -> Result<DriveFile> {
        let content = tokio::fs::read(path).await?;
        let mut state = self.state();
        state.check(Operation::Upload, name)?;
        if state.find(folder_id).is_none() {
            return Err(not_found(folder_id));
        }
        Ok(state.insert(name, "application/octet-stream", Some(folder_id), content))
    }

    async fn download_file(&self, file_id: &str, path: &Path) -> Result<()> {
        let content = {
            let mut state = self.state();
            state.check(Operation::Download, file_id)?;
            state
                .find(file_id)
                .map(|e| e.content.clone())
                .ok_or_else(|| not_found(file_id))?
        };
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_removes_descendants() {
        let drive = MemoryDrive::new();
        let root = drive.add_folder("Root", None);
        let inner = drive.add_folder("Inner", Some(&root.id));
        let file = drive.add_file("a.pkl", &inner.id, b"1");

        drive.delete_file(&root.id).await.unwrap();

        assert!(drive.get(&inner.id).is_none());
        assert!(drive.get(&file.id).is_none());
    }

    #[tokio::test]
    async fn test_folders_cannot_be_copied() {
        let drive = MemoryDrive::new();
        let root = drive.add_folder("Root", None);
        let inner = drive.add_folder("Inner", Some(&root.id));

        let err = drive.copy_file(&inner.id, "Inner", &root.id).await.unwrap_err();
        assert!(matches!(err, GestureDriveError::Drive { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_injected_failure_is_targeted() {
        let drive = MemoryDrive::new();
        let root = drive.add_folder("Root", None);
        let a = drive.add_file("a.json", &root.id, b"a");
        let b = drive.add_file("b.json", &root.id, b"b");
        drive.fail_on(Operation::Delete, &a.id);

        assert!(drive.delete_file(&a.id).await.is_err());
        assert!(drive.delete_file(&b.id).await.is_ok());
        assert_eq!(drive.operations(), vec![(Operation::Delete, b.id.clone())]);
    }

    #[tokio::test]
    async fn test_search_skips_trashed() {
        let drive = MemoryDrive::new();
        let folder = drive.add_folder("GestureSets", None);
        drive.trash(&folder.id);

        let found = drive.find_folder("GestureSets", None).await.unwrap();
        assert!(found.is_none());
    }
}
