//! Venue - Entry Point
//!
//! Tray companion that follows the deployments of one Vercel project.

use std::collections::HashMap;
use std::env;

use venue::app::options::AppOptions;
use venue::app::run::run;
use venue::errors::VenueError;
use venue::logs::{init_logging, LogOptions};
use venue::storage::layout::StorageLayout;
use venue::storage::session::{FileSessionStore, SessionKey, SessionStore};
use venue::storage::settings::load_or_init;
use venue::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Failed to print version: {}", e),
        }
        return;
    }

    let layout = match cli_args.get("base-dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };

    let settings = match load_or_init(&layout.settings_file()).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {}", e);
            return;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings.log_to_file.then(|| layout.logs_dir()),
        json_format: settings.log_json,
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    // Session maintenance without starting the app
    if cli_args.contains_key("logout") {
        if let Err(e) = clear_session(&layout).await {
            error!("Failed to clear session: {}", e);
        }
        return;
    }
    if let Some(token) = cli_args.get("token") {
        if let Err(e) = store_token(&layout, token).await {
            error!("Failed to store access token: {}", e);
            return;
        }
    }

    let options = AppOptions::from_settings(layout, &settings);
    info!("Running Venue with options: {:?}", options);
    if let Err(e) = run(options, await_shutdown_signal()).await {
        error!("Failed to run Venue: {e}");
    }
}

/// Log in from the command line: store the token and forget any project
/// selected under a previous token
async fn store_token(layout: &StorageLayout, token: &str) -> Result<(), VenueError> {
    let store = FileSessionStore::open(layout.session_file()).await?;
    store.set(SessionKey::AccessToken, token.trim()).await?;
    store.delete(SessionKey::ProjectId).await?;
    store.delete(SessionKey::ProjectName).await?;
    info!("Access token stored");
    Ok(())
}

async fn clear_session(layout: &StorageLayout) -> Result<(), VenueError> {
    let store = FileSessionStore::open(layout.session_file()).await?;
    for key in [
        SessionKey::AccessToken,
        SessionKey::ProjectId,
        SessionKey::ProjectName,
    ] {
        store.delete(key).await?;
    }
    info!("Session cleared");
    Ok(())
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Failed to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Ctrl+C received, shutting down...");
    }
}
