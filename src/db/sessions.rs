//! Session lifecycle: atomic join-or-create and phase derivation.

use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::db::models::{JoinTicket, NewSession, Phase, Session, SessionState};
use crate::db::{Database, StoreError, schema};

/// Matchmaking attempts before a join reports contention. Every lost race
/// means a competitor succeeded, so the budget only depletes under
/// sustained adversarial interleaving.
const JOIN_RETRY_LIMIT: usize = 32;

/// Store for session rows: matchmaking joins and state lookups.
#[derive(Debug, Clone)]
pub struct SessionStore {
    db: Database,
    max_players: u32,
}

impl SessionStore {
    /// Creates a session store over the given database handle.
    #[instrument(skip(db))]
    pub fn new(db: Database, max_players: u32) -> Self {
        info!(max_players, "creating session store");
        Self { db, max_players }
    }

    /// Finds or creates a session with room and joins it.
    ///
    /// Prefers the fullest open session, so partially-filled sessions drain
    /// before new ones are created. Capacity is enforced with a conditional
    /// update (`WHERE player_count` matches the observed value); losing that
    /// race restarts the search, and when no open session exists a new one
    /// is inserted under a fresh id. The returned tokens are opaque v4
    /// UUIDs the caller passes back to later calls.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Contention`] if every attempt within the retry
    /// budget loses its race, and [`StoreError::Database`] for connection
    /// or query failures.
    #[instrument(skip(self))]
    pub fn join(&self) -> Result<JoinTicket, StoreError> {
        let mut conn = self.db.connect()?;
        let player_id = Uuid::new_v4().to_string();

        for attempt in 1..=JOIN_RETRY_LIMIT {
            if let Some(session_id) = self.try_join(&mut conn)? {
                debug!(attempt, session_id = %session_id, "join succeeded");
                return Ok(JoinTicket::new(session_id, player_id));
            }
            debug!(attempt, "lost join race, retrying");
        }

        warn!(attempts = JOIN_RETRY_LIMIT, "join retry budget exhausted");
        Err(StoreError::Contention {
            attempts: JOIN_RETRY_LIMIT,
        })
    }

    /// One matchmaking attempt. `None` means a lost race the caller should
    /// retry: either the conditional update observed a stale count or a
    /// fresh session id collided.
    fn try_join(&self, conn: &mut SqliteConnection) -> Result<Option<String>, StoreError> {
        let open: Option<Session> = schema::sessions::table
            .filter(schema::sessions::player_count.lt(self.max_players as i32))
            .order(schema::sessions::player_count.desc())
            .select(Session::as_select())
            .first(conn)
            .optional()?;

        if let Some(session) = open {
            let observed = *session.player_count();
            let claimed = diesel::update(
                schema::sessions::table
                    .filter(schema::sessions::id.eq(session.id()))
                    .filter(schema::sessions::player_count.eq(observed)),
            )
            .set(schema::sessions::player_count.eq(observed + 1))
            .execute(conn)?;

            if claimed == 1 {
                return Ok(Some(session.id().clone()));
            }
            return Ok(None);
        }

        let session_id = Uuid::new_v4().to_string();
        match diesel::insert_into(schema::sessions::table)
            .values(&NewSession::new(session_id.clone(), 1))
            .execute(conn)
        {
            Ok(_) => Ok(Some(session_id)),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Reports `{players, moves, phase}` for a session.
    ///
    /// The phase is derived from live counts on every call, never cached:
    /// `waiting_for_opponent` until the session is full, then
    /// `waiting_for_moves` until every player has moved, then `finished`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown session id and
    /// [`StoreError::Database`] for connection or query failures.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn session_state(&self, session_id: &str) -> Result<SessionState, StoreError> {
        let mut conn = self.db.connect()?;
        conn.transaction(|conn| self.state_with(conn, session_id))
    }

    /// Derives a session's state on an existing connection, for callers
    /// that need the read and a follow-up write inside one transaction.
    pub(crate) fn state_with(
        &self,
        conn: &mut SqliteConnection,
        session_id: &str,
    ) -> Result<SessionState, StoreError> {
        let players: Option<i32> = schema::sessions::table
            .filter(schema::sessions::id.eq(session_id))
            .select(schema::sessions::player_count)
            .first(conn)
            .optional()?;

        let players = i64::from(players.ok_or_else(|| StoreError::NotFound {
            session_id: session_id.to_string(),
        })?);

        let moves: i64 = schema::moves::table
            .filter(schema::moves::session_id.eq(session_id))
            .count()
            .get_result(conn)?;

        let phase = Phase::of(players, moves, i64::from(self.max_players));
        debug!(players, moves, phase = %phase, "derived session state");
        Ok(SessionState::new(players, moves, phase))
    }
}
