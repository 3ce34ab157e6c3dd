//! Standoff library - anonymous two-player game matchmaking and move
//! recording over SQLite.
//!
//! # Architecture
//!
//! - **SessionStore**: race-safe join-or-create matchmaking with a
//!   compare-and-swap capacity protocol
//! - **MoveStore**: append-only move log with constraint-backed duplicate
//!   rejection and derived session phases
//! - **Server**: thin axum JSON API (join, state, move, result, dataset
//!   download/reset) with permissive CORS
//! - **Config**: environment-resolved limits, choice set, and storage
//!   location, fixed for the process lifetime
//!
//! # Example
//!
//! ```no_run
//! use standoff::{Database, MoveStore, SessionStore};
//!
//! # fn example() -> Result<(), standoff::StoreError> {
//! let database = Database::new("game.db");
//! database.apply_migrations()?;
//!
//! let sessions = SessionStore::new(database.clone(), 2);
//! let moves = MoveStore::new(database, sessions.clone());
//!
//! let ticket = sessions.join()?;
//! let state = sessions.session_state(ticket.session_id())?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod db;
mod server;

// Crate-level exports - Configuration
pub use config::{ChoiceSet, ConfigError, GameConfig};

// Crate-level exports - Persistence
pub use db::{
    Database, JoinTicket, MoveStore, Phase, PlayerId, SessionId, SessionState, SessionStore,
    StoreError, StoredMove,
};

// Crate-level exports - HTTP surface
pub use server::{
    AppState, Detail, JoinResponse, MoveRecord, MoveRequest, ResultsResponse, SessionQuery,
    StateResponse, router,
};
