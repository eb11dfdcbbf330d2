// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! gesture-drive: gesture set folders on Google Drive
//!
//! Operator CLI for listing, publishing, cleaning up and resetting gesture
//! sets, and for moving user training data to and from Drive.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use gesture_drive::config::AppConfig;
use gesture_drive::drive::DriveClient;
use gesture_drive::gestures::{GestureSet, GestureSetManager};
use gesture_drive::journal::{JournalFilter, PublishJournal, PublishRecord};
use gesture_drive::transfer;
use gesture_drive::{GestureDriveError, Result};

/// gesture-drive CLI - gesture set folders on Google Drive
#[derive(Parser, Debug)]
#[command(name = "gesture-drive")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "1.0.0")]
#[command(about = "Manage gesture set folders on Google Drive", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Drive(DriveCommands),

    /// Publish journal
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// OAuth token status and refresh
    Auth {
        #[command(subcommand)]
        action: AuthCommands,
    },
}

#[derive(Subcommand, Debug)]
enum DriveCommands {
    /// Create the GestureSets and ActiveSet folders if missing
    Folders,

    /// List gesture sets (removes duplicates remotely)
    List,

    /// Show the active gesture set
    Active,

    /// Make a gesture set the active one
    Publish {
        /// Drive id of the gesture set folder
        id: String,

        /// Name for the active copy
        name: String,
    },

    /// Delete duplicate gesture sets, keeping the newest of each name
    Cleanup,

    /// Move active sets back into GestureSets
    Reset,

    /// Upload a user's trained model to CustomGesture
    UploadModel {
        #[arg(long)]
        user_id: String,

        /// Keep the local user directory after uploading
        #[arg(long)]
        keep_local: bool,
    },

    /// Download a user's data from UploadGesture
    DownloadUserData {
        #[arg(long)]
        user_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List recent publishes
    List {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,

        /// Only publishes of this gesture set id
        #[arg(long = "set")]
        gesture_set_id: Option<String>,

        /// Only failed publishes
        #[arg(long)]
        failed: bool,
    },

    /// Show the last successful publish
    Last,

    /// Clear the journal
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate configuration file
    Validate,
}

#[derive(Subcommand, Debug)]
enum AuthCommands {
    /// Show the stored token state
    Status,

    /// Refresh the access token now
    Refresh,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // a broken config file must not block writing a fresh one
    if let Commands::Config {
        action: ConfigCommands::Generate { ref output, force },
    } = cli.command
    {
        return generate_config(output, force);
    }

    let config = AppConfig::load(&cli.config)?;
    let json = cli.format == "json";

    match cli.command {
        Commands::Config { action } => run_config_command(config, action, &cli.config),
        Commands::History { action } => run_history_command(&config, action, json),
        Commands::Auth { action } => run_auth_command(&config, action, json).await,
        Commands::Drive(command) => {
            let client = DriveClient::from_config(&config)?;
            let manager = GestureSetManager::new(client, &config);
            run_drive_command(&config, &manager, command, json).await
        }
    }
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_set(set: &GestureSet) {
    println!(
        "  {} ({} gestures) id={} modified={}",
        set.name,
        set.gesture_count,
        set.id,
        set.modified_time
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string())
    );
}

/// Run commands that talk to Drive
async fn run_drive_command(
    config: &AppConfig,
    manager: &GestureSetManager<DriveClient>,
    command: DriveCommands,
    json: bool,
) -> Result<()> {
    match command {
        DriveCommands::Folders => {
            let folders = manager.ensure_base_folders().await?;
            if json {
                emit(&folders)?;
            } else {
                println!("{}: {}", config.folders.gesture_sets, folders.gesture_sets_id);
                println!("{}: {}", config.folders.active_set, folders.active_set_id);
            }
        }
        DriveCommands::List => {
            let sets = manager.list_gesture_sets().await?;
            if json {
                emit(&sets)?;
            } else {
                println!("Gesture sets ({}):", sets.len());
                for set in &sets {
                    print_set(set);
                }
            }
        }
        DriveCommands::Active => {
            let active = manager.get_current_active_set().await?;
            if json {
                emit(&active)?;
            } else {
                match active {
                    Some(set) => {
                        println!("Active gesture set:");
                        print_set(&set);
                    }
                    None => println!("No active gesture set"),
                }
            }
        }
        DriveCommands::Publish { id, name } => {
            let outcome = manager.publish_gesture_set(&id, &name).await?;

            if let Some(journal) = PublishJournal::from_config(&config.journal) {
                journal.record_or_warn(&id, manager.strategy(), &outcome);
            }

            if json {
                emit(&outcome)?;
            } else if outcome.success {
                println!(
                    "Published '{}' ({} gestures)",
                    outcome.new_set_name, outcome.gesture_count
                );
                if let Some(ref old) = outcome.old_set_name {
                    println!("Replaced previous active set '{}'", old);
                }
            }

            if !outcome.success {
                return Err(GestureDriveError::Remote(
                    outcome.error.unwrap_or_else(|| "publish failed".to_string()),
                ));
            }
        }
        DriveCommands::Cleanup => {
            let report = manager.remove_duplicates().await?;
            if json {
                emit(&report)?;
            } else {
                for group in &report.groups {
                    if group.deleted.is_empty() && group.failed.is_empty() {
                        println!("{}: only 1 folder (OK)", group.name);
                        continue;
                    }
                    println!("{}: keeping {}", group.name, group.kept);
                    for id in &group.deleted {
                        println!("  deleted {}", id);
                    }
                    for id in &group.failed {
                        println!("  FAILED to delete {}", id);
                    }
                }
                println!(
                    "\nCleanup completed: {} deleted, {} failed, {} gesture sets remaining",
                    report.deleted_count(),
                    report.failed_count(),
                    report.groups.len()
                );
            }
            if report.failed_count() > 0 {
                return Err(GestureDriveError::Remote(format!(
                    "{} duplicate(s) could not be deleted",
                    report.failed_count()
                )));
            }
        }
        DriveCommands::Reset => {
            let report = manager.reset_gesture_sets().await?;
            if json {
                emit(&report)?;
            } else {
                for name in &report.moved {
                    println!("Moved {} back to {}", name, config.folders.gesture_sets);
                }
                println!("\nGesture sets in {}:", config.folders.gesture_sets);
                for set in &report.gesture_sets {
                    print_set(set);
                }
                println!("\nReset completed: {} gesture sets ready", report.gesture_sets.len());
            }
            if !report.failed.is_empty() {
                return Err(GestureDriveError::Remote(format!(
                    "could not move back: {}",
                    report.failed.join(", ")
                )));
            }
        }
        DriveCommands::UploadModel { user_id, keep_local } => {
            let result =
                transfer::upload_trained_model(manager.store(), config, &user_id, keep_local).await?;
            if json {
                emit(&result)?;
            } else {
                println!(
                    "Uploaded user_{}: {} folders, {} files",
                    user_id, result.upload.folders, result.upload.files
                );
            }
        }
        DriveCommands::DownloadUserData { user_id } => {
            let result = transfer::download_user_data(manager.store(), config, &user_id).await?;
            if json {
                emit(&result)?;
            } else {
                println!(
                    "Downloaded {} files for user {} into {}",
                    result.files.len(),
                    user_id,
                    result.user_dir.display()
                );
            }
        }
    }

    Ok(())
}

fn print_record(record: &PublishRecord) {
    let status = if record.success { "" } else { "[FAILED]" };
    println!(
        "  {} {} [{}] ({} gestures, {:?}, replaced {}) {}",
        record.timestamp.format("%Y-%m-%d %H:%M"),
        record.gesture_set_name,
        record.gesture_set_id,
        record.gesture_count,
        record.strategy,
        record.replaced.as_deref().unwrap_or("-"),
        status
    );
    if let Some(ref error) = record.error {
        println!("      {}", error);
    }
}

/// Run journal commands
fn run_history_command(config: &AppConfig, action: HistoryCommands, json: bool) -> Result<()> {
    let journal = PublishJournal::new(config.journal.path.clone());

    match action {
        HistoryCommands::List { count, gesture_set_id, failed } => {
            let filter = JournalFilter {
                gesture_set_id,
                failed_only: failed,
                limit: Some(count),
            };
            let records = journal.query(&filter)?;
            if json {
                return emit(&records);
            }
            println!("Recent publishes ({} entries):", records.len());
            for record in &records {
                print_record(record);
            }
        }
        HistoryCommands::Last => {
            let last = journal.last_published()?;
            if json {
                return emit(&last);
            }
            match last {
                Some(record) => {
                    println!("Last successful publish:");
                    print_record(&record);
                }
                None => println!("No successful publish recorded"),
            }
        }
        HistoryCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm clearing the journal");
                return Ok(());
            }
            let removed = journal.clear()?;
            println!("Journal cleared ({} records)", removed);
        }
    }

    Ok(())
}

fn generate_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(GestureDriveError::Config(format!(
            "{:?} already exists. Use --force to overwrite",
            output
        )));
    }
    AppConfig::default().save(output)?;
    println!("Generated config at {:?}", output);
    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => emit(&config)?,
        ConfigCommands::Generate { output, force } => generate_config(&output, force)?,
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Gesture sets folder: {}", config.folders.gesture_sets);
            println!("  Active set folder: {}", config.folders.active_set);
            println!("  Token file: {:?}", config.auth.token_file);
            println!("  User data root: {:?}", config.pipeline.user_data_root);
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct TokenStatus {
    token_file: PathBuf,
    has_access_token: bool,
    has_refresh_token: bool,
    expiry: Option<chrono::DateTime<chrono::Utc>>,
    expired: bool,
}

/// Run auth commands
async fn run_auth_command(config: &AppConfig, action: AuthCommands, json: bool) -> Result<()> {
    let client = DriveClient::from_config(config)?;

    let token = match action {
        AuthCommands::Status => client.tokens().snapshot().await,
        AuthCommands::Refresh => {
            let token = client.tokens().refresh().await?;
            info!("Token refreshed");
            token
        }
    };

    let status = TokenStatus {
        token_file: config.auth.token_file.clone(),
        has_access_token: token.token.is_some(),
        has_refresh_token: token.refresh_token.is_some(),
        expiry: token.expiry,
        expired: token.is_expired(chrono::Utc::now()),
    };

    if json {
        return emit(&status);
    }

    println!("Token file: {:?}", status.token_file);
    println!("  Access token: {}", if status.has_access_token { "present" } else { "missing" });
    println!("  Refresh token: {}", if status.has_refresh_token { "present" } else { "missing" });
    match status.expiry {
        Some(expiry) => println!(
            "  Expires: {}{}",
            expiry.format("%Y-%m-%d %H:%M:%S UTC"),
            if status.expired { " (expired)" } else { "" }
        ),
        None => println!("  Expires: never"),
    }

    Ok(())
}
