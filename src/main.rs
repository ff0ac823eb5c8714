use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use graze::cli::{self, AppContext, Cli};
use graze::config::Config;
use graze::storage::{Database, DatabaseError};

/// Get the config directory path (~/.config/graze/)
fn config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("graze"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config_dir = config_dir()?;
    let config_path = config_dir.join("config.toml");
    let config = Config::load(&config_path).context("Failed to load configuration")?;

    let db_path = config.database_path(&config_dir);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(e @ DatabaseError::InstanceLocked) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {e}")),
    };

    let mut ctx = AppContext {
        db,
        config,
        config_path,
    };
    cli::run(cli.command, &mut ctx).await
}
