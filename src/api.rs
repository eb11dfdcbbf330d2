// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! JSON command dispatch for callers running gesture-drive as a subprocess
//!
//! Every invocation produces exactly one JSON document for standard output
//! plus a success flag the binary turns into the exit code.

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};

use crate::drive::DriveStore;
use crate::gestures::GestureSetManager;
use crate::journal::PublishJournal;

#[derive(Parser, Debug)]
#[command(name = "gesture-set-api")]
#[command(about = "Gesture set operations with JSON output")]
struct ApiArgs {
    #[command(subcommand)]
    command: ApiCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ApiCommand {
    /// List available gesture sets
    #[command(name = "list_gesture_sets")]
    ListGestureSets,

    /// Show the active gesture set
    #[command(name = "get_active_set")]
    GetActiveSet,

    /// Make a gesture set the active one
    #[command(name = "publish_gesture_set")]
    PublishGestureSet {
        #[arg(allow_hyphen_values = true)]
        gesture_set_id: String,
        #[arg(allow_hyphen_values = true)]
        gesture_set_name: String,
    },

    /// Create the base folders if missing
    #[command(name = "ensure_folders")]
    EnsureFolders,
}

/// One JSON document and whether it reports success
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub body: Value,
    pub success: bool,
}

impl ApiReply {
    pub fn ok(body: Value) -> Self {
        Self { body, success: true }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            body: json!({ "error": message.to_string() }),
            success: false,
        }
    }

    fn serialized<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self::ok(body),
            Err(e) => Self::error(e),
        }
    }
}

/// Parse the process arguments. Anything that is not a runnable command
/// (usage errors, help) comes back as the reply to print.
pub fn parse_args<I, T>(args: I) -> Result<ApiCommand, ApiReply>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    ApiArgs::try_parse_from(args)
        .map(|a| a.command)
        .map_err(|e| parse_error_reply(&e))
}

fn parse_error_reply(err: &clap::Error) -> ApiReply {
    use clap::error::{ContextKind, ErrorKind};

    match err.kind() {
        ErrorKind::MissingSubcommand | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            ApiReply::error("No command specified")
        }
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            ApiReply::ok(json!({ "usage": err.render().to_string() }))
        }
        // only publish_gesture_set takes arguments
        ErrorKind::MissingRequiredArgument => ApiReply {
            body: json!({
                "success": false,
                "error": "Missing arguments: gesture_set_id and gesture_set_name",
            }),
            success: false,
        },
        ErrorKind::InvalidSubcommand => match err.get(ContextKind::InvalidSubcommand) {
            Some(name) => ApiReply::error(format!("Unknown command: {}", name)),
            None => ApiReply::error(first_line(err)),
        },
        _ => ApiReply::error(first_line(err)),
    }
}

fn first_line(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let first = rendered.lines().next().unwrap_or("invalid arguments");
    first.trim_start_matches("error: ").trim().to_string()
}

/// Run one command against the manager
pub async fn execute<S: DriveStore>(
    manager: &GestureSetManager<S>,
    command: ApiCommand,
    journal: Option<&PublishJournal>,
) -> ApiReply {
    match command {
        ApiCommand::ListGestureSets => match manager.list_gesture_sets().await {
            Ok(sets) => ApiReply::serialized(&sets),
            Err(e) => ApiReply::error(e),
        },
        ApiCommand::GetActiveSet => match manager.get_current_active_set().await {
            Ok(active) => ApiReply::serialized(&active),
            Err(e) => ApiReply::error(e),
        },
        ApiCommand::PublishGestureSet {
            gesture_set_id,
            gesture_set_name,
        } => match manager.publish_gesture_set(&gesture_set_id, &gesture_set_name).await {
            Ok(outcome) => {
                if let Some(journal) = journal {
                    journal.record_or_warn(&gesture_set_id, manager.strategy(), &outcome);
                }
                let mut reply = ApiReply::serialized(&outcome);
                reply.success &= outcome.success;
                reply
            }
            Err(e) => ApiReply {
                body: json!({ "success": false, "error": e.to_string() }),
                success: false,
            },
        },
        ApiCommand::EnsureFolders => match manager.ensure_base_folders().await {
            Ok(folders) => ApiReply::serialized(&folders),
            Err(e) => ApiReply::error(e),
        },
    }
}
