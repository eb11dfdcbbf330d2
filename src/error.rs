// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for gesture-drive

use thiserror::Error;

/// Result type alias for gesture-drive operations
pub type Result<T> = std::result::Result<T, GestureDriveError>;

/// gesture-drive error types
#[derive(Error, Debug)]
pub enum GestureDriveError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Drive API returned status {status}: {message}")]
    Drive { status: u16, message: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Remote operation failed: {0}")]
    Remote(String),
}
