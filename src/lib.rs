// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! gesture-drive: gesture set folders on Google Drive
//!
//! Lists, publishes and deduplicates gesture sets kept in two Drive folders,
//! and moves user training data between the local pipeline and Drive.

pub mod api;
pub mod auth;
pub mod config;
pub mod drive;
pub mod error;
pub mod gestures;
pub mod journal;
pub mod transfer;

pub use config::AppConfig;
pub use error::{GestureDriveError, Result};
