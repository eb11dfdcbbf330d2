// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Gesture Set API
//!
//! Subprocess entry point: one JSON document on stdout, diagnostics on
//! stderr, non-zero exit code on failure.

use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use gesture_drive::api::{self, ApiCommand, ApiReply};
use gesture_drive::config::AppConfig;
use gesture_drive::drive::DriveClient;
use gesture_drive::gestures::GestureSetManager;
use gesture_drive::journal::PublishJournal;

/// Config file location override
const CONFIG_ENV: &str = "GESTURE_DRIVE_CONFIG";

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the JSON reply only
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let reply = match api::parse_args(std::env::args_os()) {
        Ok(command) => run(command).await,
        Err(reply) => reply,
    };

    println!("{}", reply.body);

    if reply.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run(command: ApiCommand) -> ApiReply {
    let config_path = std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.json"));

    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => return ApiReply::error(e),
    };

    let client = match DriveClient::from_config(&config) {
        Ok(client) => client,
        Err(e) => return ApiReply::error(e),
    };

    let journal = PublishJournal::from_config(&config.journal);
    let manager = GestureSetManager::new(client, &config);

    api::execute(&manager, command, journal.as_ref()).await
}
