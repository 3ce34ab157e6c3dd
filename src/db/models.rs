//! Database models and derived session views.

use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::schema;

/// Unique identifier for a game session.
pub type SessionId = String;

/// Unique identifier for a player.
pub type PlayerId = String;

/// Session database model.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::sessions)]
pub struct Session {
    id: SessionId,
    player_count: i32,
}

/// Insertable session model for opening a fresh session.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::sessions)]
pub(crate) struct NewSession {
    id: SessionId,
    player_count: i32,
}

/// One recorded move. `id` is the append-order key.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::moves)]
#[diesel(belongs_to(Session))]
pub struct StoredMove {
    id: i32,
    session_id: SessionId,
    player_id: PlayerId,
    choice: String,
}

/// Insertable move model.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::moves)]
pub(crate) struct NewMove {
    session_id: SessionId,
    player_id: PlayerId,
    choice: String,
}

/// Lifecycle phase of a session, derived from live counts on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Fewer than the configured number of players have joined.
    WaitingForOpponent,
    /// The session is full but not every player has moved.
    WaitingForMoves,
    /// Every player has moved; no further moves are accepted.
    Finished,
}

impl Phase {
    /// Derives the phase from player and move counts.
    ///
    /// Counts only grow, so a session walks `waiting_for_opponent`,
    /// `waiting_for_moves`, `finished` and never regresses.
    pub fn of(players: i64, moves: i64, max_players: i64) -> Self {
        if players < max_players {
            Self::WaitingForOpponent
        } else if moves < players {
            Self::WaitingForMoves
        } else {
            Self::Finished
        }
    }

    /// The snake_case name used on the wire and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaitingForOpponent => "waiting_for_opponent",
            Self::WaitingForMoves => "waiting_for_moves",
            Self::Finished => "finished",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a session: participant count, move count, derived phase.
#[derive(Debug, Clone, Getters, new)]
pub struct SessionState {
    players: i64,
    moves: i64,
    phase: Phase,
}

/// Opaque tokens handed back to a joining player.
#[derive(Debug, Clone, Getters, new)]
pub struct JoinTicket {
    session_id: SessionId,
    player_id: PlayerId,
}
