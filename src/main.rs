//! Standoff - anonymous two-player game matchmaking server.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use standoff::{AppState, Database, GameConfig, router};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = GameConfig::from_env()?;
    if let Some(db_path) = cli.db_path {
        config = config.with_database_url(db_path);
    }

    match cli.command {
        Command::Serve { host, port } => run_server(config, host, port).await,
        Command::InitDb => init_db(config),
        Command::Purge => purge(config),
    }
}

/// Run the JSON API server
async fn run_server(config: GameConfig, host: String, port: u16) -> Result<()> {
    let state = AppState::new(config);
    state.database().apply_migrations()?;

    let app = router(state);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!(%host, port, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create or upgrade the database schema
fn init_db(config: GameConfig) -> Result<()> {
    let database = Database::new(config.database_url().clone());
    database.apply_migrations()?;
    info!(path = %config.database_url(), "database ready");
    Ok(())
}

/// Wipe all sessions and moves
fn purge(config: GameConfig) -> Result<()> {
    let database = Database::new(config.database_url().clone());
    database.apply_migrations()?;
    let purged = database.purge()?;
    info!(sessions = purged, "database reset; all sessions purged");
    Ok(())
}
