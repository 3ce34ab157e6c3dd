//! Store error kinds.

use derive_more::{Display, Error};

use crate::db::models::Phase;

/// Discriminated persistence-layer error.
///
/// `NotFound`, `InvalidState`, and `DuplicateMove` are caller mistakes and
/// surface unchanged; `Contention` and `Database` are infrastructure
/// failures. No kind is process-fatal: a failed operation rolls back with
/// its transaction and leaves the store invariants intact.
#[derive(Debug, Clone, Display, Error)]
pub enum StoreError {
    /// The session id is not in the store.
    #[display("unknown session: {session_id}")]
    NotFound {
        /// Offending session id.
        session_id: String,
    },

    /// A move arrived while the session was filling or after it finished.
    #[display("session {session_id} is {phase}; moves are not accepted")]
    InvalidState {
        /// Offending session id.
        session_id: String,
        /// Phase the session was in when the move arrived.
        phase: Phase,
    },

    /// The player already has a recorded move in this session.
    #[display("player {player_id} already moved in session {session_id}")]
    DuplicateMove {
        /// Offending session id.
        session_id: String,
        /// Player whose move already exists.
        player_id: String,
    },

    /// The optimistic join loop exhausted its retry budget.
    #[display("could not claim a session after {attempts} attempts")]
    Contention {
        /// Attempts made before giving up.
        attempts: usize,
    },

    /// Connection, migration, or query failure.
    #[display("database error: {message}")]
    Database {
        /// Underlying failure description.
        message: String,
    },
}

impl StoreError {
    /// Wraps an infrastructure failure message.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        Self::database(format!("diesel error: {}", err))
    }
}

impl From<diesel::ConnectionError> for StoreError {
    fn from(err: diesel::ConnectionError) -> Self {
        Self::database(format!("connection error: {}", err))
    }
}
