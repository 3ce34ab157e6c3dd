//! Command-line interface for the standoff server.

use clap::{Parser, Subcommand};

/// Standoff - anonymous two-player game matchmaking server
#[derive(Parser, Debug)]
#[command(name = "standoff")]
#[command(about = "Matchmaking and move recording for two-player games", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database file override (defaults to the GAME_DB_FILE environment
    /// variable)
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the JSON API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Create or upgrade the database schema, then exit
    InitDb,

    /// Delete every session and move, then exit
    Purge,
}
