// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for gesture-drive

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Remote storage endpoints
    #[serde(default)]
    pub drive: DriveConfig,

    /// OAuth credential files
    #[serde(default)]
    pub auth: AuthConfig,

    /// Well-known folder names
    #[serde(default)]
    pub folders: FolderConfig,

    /// Gesture file detection
    #[serde(default)]
    pub gestures: GestureConfig,

    /// Local training pipeline layout
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Publish behaviour
    #[serde(default)]
    pub publish: PublishConfig,

    /// Local publish journal
    #[serde(default)]
    pub journal: JournalConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DriveConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    /// OAuth client secrets as downloaded from the cloud console
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,
    /// Stored user token, rewritten after every refresh
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FolderConfig {
    #[serde(default = "default_gesture_sets_folder")]
    pub gesture_sets: String,
    #[serde(default = "default_active_set_folder")]
    pub active_set: String,
    #[serde(default = "default_custom_gesture_folder")]
    pub custom_gesture: String,
    #[serde(default = "default_upload_gesture_folder")]
    pub upload_gesture: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GestureConfig {
    /// A child file counts as a gesture when its name contains any of these
    #[serde(default = "default_gesture_patterns")]
    pub patterns: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_user_data_root")]
    pub user_data_root: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PublishStrategy {
    /// Remove the old active set, then copy the new one in
    #[default]
    DeleteThenCopy,
    /// Copy the new set in first, then remove the previous one
    CopyThenDelete,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PublishConfig {
    #[serde(default)]
    pub strategy: PublishStrategy,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JournalConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_journal_path")]
    pub path: PathBuf,
}

// Default value functions
fn default_api_url() -> String { "https://www.googleapis.com/drive/v3".to_string() }
fn default_upload_url() -> String { "https://www.googleapis.com/upload/drive/v3".to_string() }
fn default_timeout() -> u64 { 60 }
fn default_credentials_file() -> PathBuf { PathBuf::from("credentials.json") }
fn default_token_file() -> PathBuf { PathBuf::from("token.json") }
fn default_gesture_sets_folder() -> String { "GestureSets".to_string() }
fn default_active_set_folder() -> String { "ActiveSet".to_string() }
fn default_custom_gesture_folder() -> String { "CustomGesture".to_string() }
fn default_upload_gesture_folder() -> String { "UploadGesture".to_string() }
fn default_true() -> bool { true }
fn default_journal_path() -> PathBuf { PathBuf::from("gesture_publish_history.jsonl") }

fn default_gesture_patterns() -> Vec<String> {
    vec![".pkl".to_string(), ".json".to_string()]
}

fn default_user_data_root() -> PathBuf {
    ["..", "..", "..", "hybrid_realtime_pipeline", "code"].iter().collect()
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            upload_url: default_upload_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_file: default_credentials_file(),
            token_file: default_token_file(),
        }
    }
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            gesture_sets: default_gesture_sets_folder(),
            active_set: default_active_set_folder(),
            custom_gesture: default_custom_gesture_folder(),
            upload_gesture: default_upload_gesture_folder(),
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            patterns: default_gesture_patterns(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            user_data_root: default_user_data_root(),
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_journal_path(),
        }
    }
}

impl PipelineConfig {
    /// Local directory holding one user's training data
    pub fn user_dir(&self, user_id: &str) -> PathBuf {
        self.user_data_root.join(format!("user_{}", user_id))
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::GestureDriveError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject configurations the folder conventions cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        if self.folders.gesture_sets.trim().is_empty() || self.folders.active_set.trim().is_empty() {
            return Err(crate::GestureDriveError::Config(
                "folder names must not be empty".to_string(),
            ));
        }
        if self.folders.gesture_sets == self.folders.active_set {
            return Err(crate::GestureDriveError::Config(format!(
                "gesture set and active set folders must differ (both are '{}')",
                self.folders.gesture_sets
            )));
        }
        if self.gestures.patterns.is_empty() {
            return Err(crate::GestureDriveError::Config(
                "at least one gesture pattern is required".to_string(),
            ));
        }
        Ok(())
    }
}
