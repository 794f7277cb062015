//! CLI entry point for the boca session tool.

use std::sync::Arc;

use anyhow::{Context, Result};
use boca_session::{EncryptedFileStore, Session, store::default_secrets_path};
use clap::Parser;
use tracing::debug;

mod cli;
mod commands;
mod config;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let file_config = config::load_config(args.config.as_deref())?;

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => file_config
                .verbosity
                .map_or("info", config::VerbositySetting::default_filter),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let secrets_path = match file_config.secrets_path.clone() {
        Some(path) => path,
        None => default_secrets_path().context("Failed to resolve secret store path")?,
    };
    let store = EncryptedFileStore::open(&secrets_path)
        .with_context(|| format!("Failed to open secret store '{}'", secrets_path.display()))?;
    let session = Session::new(Arc::new(store))?;

    match args.command {
        Command::Login { host, username } => {
            commands::run_login_command(&session, host, username).await
        }
        Command::Logout => commands::run_logout_command(&session).await,
        Command::Status => commands::run_status_command(&session).await,
        Command::Fetch { path } => commands::run_fetch_command(&session, &path).await,
        Command::Download { url, name } => {
            commands::run_download_command(
                &session,
                &url,
                &name,
                file_config.download_dir.as_deref(),
            )
            .await
        }
        Command::SubmitRun {
            problem,
            language,
            source,
        } => commands::run_submit_run_command(&session, problem, language, source).await,
        Command::Clarify { problem, message } => {
            commands::run_clarify_command(&session, problem, message).await
        }
    }
}
