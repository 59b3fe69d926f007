use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

mod cli;

use cli::commands::{is_unauthorized, App};
use cli::Cli;
use newsdesk::config::Config;
use newsdesk::storage::{Database, StorageError};

/// Get the config directory path (~/.config/newsdesk/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("newsdesk"))
}

/// Create the config directory with user-only access.
fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
        tracing::info!(path = %config_dir.display(), "Created config directory");
    }

    // The directory holds the bearer token.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = std::fs::set_permissions(config_dir, std::fs::Permissions::from_mode(0o700)) {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so --json output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_dir = get_config_dir()?;
    ensure_config_dir(&config_dir)?;

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .with_base_url_override(cli.base_url.clone());
    tracing::debug!(base_url = %config.base_url, "Configuration loaded");

    let db_path = config_dir.join("newsdesk.db");
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(StorageError::InstanceLocked) => {
            eprintln!("Error: Another newsdesk command appears to be running. Please wait and try again.");
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let app = App::new(config, db, cli.json);
    if let Err(err) = app.run(cli.command).await {
        if is_unauthorized(&err) {
            app.drop_session().await?;
            eprintln!("Your session is no longer valid. Log in again with `newsdesk login <username>`.");
        }
        return Err(err);
    }
    Ok(())
}
