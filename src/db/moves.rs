//! Move recording and ordered result retrieval.

use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::{debug, info, instrument};

use crate::db::models::{NewMove, Phase, StoredMove};
use crate::db::sessions::SessionStore;
use crate::db::{Database, StoreError, schema};

/// Store for the append-only move log.
#[derive(Debug, Clone)]
pub struct MoveStore {
    db: Database,
    sessions: SessionStore,
}

impl MoveStore {
    /// Creates a move store sharing the session store's database.
    #[instrument(skip(db, sessions))]
    pub fn new(db: Database, sessions: SessionStore) -> Self {
        Self { db, sessions }
    }

    /// Records one move for a player in a full, unfinished session.
    ///
    /// The phase check and the insert run in a single write transaction.
    /// Duplicates are detected by the `(session_id, player_id)` uniqueness
    /// constraint rather than a prior read, so a lost check-then-insert
    /// race still cannot record a second move. The choice string is stored
    /// as-is; set membership is the request boundary's concern.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown session,
    /// [`StoreError::InvalidState`] while the session is filling or after
    /// it finished, and [`StoreError::DuplicateMove`] if this player
    /// already moved (the first move is preserved unchanged).
    #[instrument(skip(self), fields(session_id = %session_id, player_id = %player_id))]
    pub fn save_move(
        &self,
        session_id: &str,
        player_id: &str,
        choice: &str,
    ) -> Result<(), StoreError> {
        let mut conn = self.db.connect()?;
        conn.immediate_transaction(|conn| {
            let state = self.sessions.state_with(conn, session_id)?;
            match state.phase() {
                Phase::WaitingForOpponent | Phase::Finished => {
                    return Err(StoreError::InvalidState {
                        session_id: session_id.to_string(),
                        phase: *state.phase(),
                    });
                }
                Phase::WaitingForMoves => {}
            }

            let row = NewMove::new(
                session_id.to_string(),
                player_id.to_string(),
                choice.to_string(),
            );
            match diesel::insert_into(schema::moves::table)
                .values(&row)
                .execute(conn)
            {
                Ok(_) => {
                    info!("move recorded");
                    Ok(())
                }
                Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                    Err(StoreError::DuplicateMove {
                        session_id: session_id.to_string(),
                        player_id: player_id.to_string(),
                    })
                }
                Err(err) => Err(err.into()),
            }
        })
    }

    /// Returns the moves of a session in strict insertion order.
    ///
    /// Empty when no moves exist, including for session ids that were never
    /// created; callers decide whether partial results mean anything, so
    /// there is no phase gate here.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] for connection or query failures.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn results(&self, session_id: &str) -> Result<Vec<StoredMove>, StoreError> {
        let mut conn = self.db.connect()?;
        let rows = schema::moves::table
            .filter(schema::moves::session_id.eq(session_id))
            .order(schema::moves::id.asc())
            .select(StoredMove::as_select())
            .load(&mut conn)?;
        debug!(count = rows.len(), "loaded moves");
        Ok(rows)
    }
}
