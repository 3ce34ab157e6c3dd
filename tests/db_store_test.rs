//! Tests for the session and move stores.

use std::collections::HashMap;
use std::thread;

use diesel::prelude::*;
use diesel::sql_query;
use tempfile::NamedTempFile;

use standoff::{Database, MoveStore, Phase, SessionStore, StoreError};

/// Creates a migrated temp-file database, returning the file handle (must
/// stay in scope to keep the database alive) and ready stores.
fn setup_stores(max_players: u32) -> (NamedTempFile, Database, SessionStore, MoveStore) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let database = Database::new(db_path);
    database.apply_migrations().expect("Migrations failed");

    let sessions = SessionStore::new(database.clone(), max_players);
    let moves = MoveStore::new(database.clone(), sessions.clone());
    (db_file, database, sessions, moves)
}

#[test]
fn test_join_empty_store_creates_fresh_session() {
    let (_db, _database, sessions, _moves) = setup_stores(2);

    let ticket = sessions.join().expect("Join failed");
    assert!(!ticket.session_id().is_empty());
    assert!(!ticket.player_id().is_empty());

    let state = sessions
        .session_state(ticket.session_id())
        .expect("State failed");
    assert_eq!(*state.players(), 1);
    assert_eq!(*state.moves(), 0);
    assert_eq!(*state.phase(), Phase::WaitingForOpponent);
}

#[test]
fn test_second_join_fills_open_session() {
    let (_db, _database, sessions, _moves) = setup_stores(2);

    let first = sessions.join().expect("First join failed");
    let second = sessions.join().expect("Second join failed");

    assert_eq!(first.session_id(), second.session_id());
    assert_ne!(first.player_id(), second.player_id());

    let state = sessions
        .session_state(first.session_id())
        .expect("State failed");
    assert_eq!(*state.players(), 2);
    assert_eq!(*state.phase(), Phase::WaitingForMoves);
}

#[test]
fn test_sequential_joins_fill_before_creating() {
    let (_db, _database, sessions, _moves) = setup_stores(2);

    let mut counts: HashMap<String, usize> = HashMap::new();
    for _ in 0..20 {
        let ticket = sessions.join().expect("Join failed");
        *counts.entry(ticket.session_id().clone()).or_default() += 1;
    }

    assert_eq!(counts.len(), 10, "sequential joins should pack sessions");
    assert!(counts.values().all(|&count| count == 2));
}

#[test]
fn test_join_prefers_fullest_session() {
    let (db_file, _database, sessions, _moves) = setup_stores(4);

    let db_path = db_file.path().to_str().expect("Invalid path");
    let mut conn = SqliteConnection::establish(db_path).expect("Failed to connect");
    sql_query("INSERT INTO sessions (id, player_count) VALUES ('half-empty', 1), ('nearly-full', 3)")
        .execute(&mut conn)
        .expect("Seed failed");

    let ticket = sessions.join().expect("Join failed");
    assert_eq!(ticket.session_id(), "nearly-full");

    let state = sessions
        .session_state("nearly-full")
        .expect("State failed");
    assert_eq!(*state.players(), 4);
    assert_eq!(*state.phase(), Phase::WaitingForMoves);
}

#[test]
fn test_state_unknown_session_not_found() {
    let (_db, _database, sessions, _moves) = setup_stores(2);

    let err = sessions
        .session_state("no-such-session")
        .expect_err("Unknown session should fail");
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[test]
fn test_state_is_pure_between_writes() {
    let (_db, _database, sessions, _moves) = setup_stores(2);

    let ticket = sessions.join().expect("Join failed");
    let first = sessions
        .session_state(ticket.session_id())
        .expect("State failed");
    let second = sessions
        .session_state(ticket.session_id())
        .expect("State failed");

    assert_eq!(first.players(), second.players());
    assert_eq!(first.moves(), second.moves());
    assert_eq!(first.phase(), second.phase());
}

#[test]
fn test_phase_progression_over_full_round() {
    let (_db, _database, sessions, moves) = setup_stores(2);

    let alice = sessions.join().expect("First join failed");
    let bob = sessions.join().expect("Second join failed");
    let sid = alice.session_id();
    assert_eq!(sid, bob.session_id());

    let state = sessions.session_state(sid).expect("State failed");
    assert_eq!(*state.players(), 2);
    assert_eq!(*state.moves(), 0);
    assert_eq!(*state.phase(), Phase::WaitingForMoves);

    moves
        .save_move(sid, alice.player_id(), "Cooperate")
        .expect("First move failed");
    let state = sessions.session_state(sid).expect("State failed");
    assert_eq!(*state.moves(), 1);
    assert_eq!(*state.phase(), Phase::WaitingForMoves);

    moves
        .save_move(sid, bob.player_id(), "Defect")
        .expect("Second move failed");
    let state = sessions.session_state(sid).expect("State failed");
    assert_eq!(*state.moves(), 2);
    assert_eq!(*state.phase(), Phase::Finished);
}

#[test]
fn test_move_rejected_while_waiting_for_opponent() {
    let (_db, _database, sessions, moves) = setup_stores(2);

    let ticket = sessions.join().expect("Join failed");
    let err = moves
        .save_move(ticket.session_id(), ticket.player_id(), "Cooperate")
        .expect_err("Move before second player should fail");
    assert!(matches!(
        err,
        StoreError::InvalidState {
            phase: Phase::WaitingForOpponent,
            ..
        }
    ));
}

#[test]
fn test_move_rejected_after_finish() {
    let (_db, _database, sessions, moves) = setup_stores(2);

    let alice = sessions.join().expect("First join failed");
    let bob = sessions.join().expect("Second join failed");
    let sid = alice.session_id();

    moves
        .save_move(sid, alice.player_id(), "Cooperate")
        .expect("First move failed");
    moves
        .save_move(sid, bob.player_id(), "Defect")
        .expect("Second move failed");

    let err = moves
        .save_move(sid, "late-arrival", "Cooperate")
        .expect_err("Move after finish should fail");
    assert!(matches!(
        err,
        StoreError::InvalidState {
            phase: Phase::Finished,
            ..
        }
    ));
}

#[test]
fn test_move_for_unknown_session_not_found() {
    let (_db, _database, _sessions, moves) = setup_stores(2);

    let err = moves
        .save_move("no-such-session", "someone", "Cooperate")
        .expect_err("Unknown session should fail");
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[test]
fn test_duplicate_move_rejected_and_first_preserved() {
    let (_db, _database, sessions, moves) = setup_stores(2);

    let alice = sessions.join().expect("First join failed");
    let _bob = sessions.join().expect("Second join failed");
    let sid = alice.session_id();

    moves
        .save_move(sid, alice.player_id(), "Cooperate")
        .expect("First move failed");
    let err = moves
        .save_move(sid, alice.player_id(), "Defect")
        .expect_err("Second move by same player should fail");
    assert!(matches!(err, StoreError::DuplicateMove { .. }));

    let recorded = moves.results(sid).expect("Results failed");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].choice(), "Cooperate");
}

#[test]
fn test_results_in_insertion_order() {
    let (_db, _database, sessions, moves) = setup_stores(2);

    let alice = sessions.join().expect("First join failed");
    let bob = sessions.join().expect("Second join failed");
    let sid = alice.session_id();

    // Second joiner moves first; results follow move order, not join order.
    moves
        .save_move(sid, bob.player_id(), "Defect")
        .expect("First move failed");
    moves
        .save_move(sid, alice.player_id(), "Cooperate")
        .expect("Second move failed");

    let recorded = moves.results(sid).expect("Results failed");
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].player_id(), bob.player_id());
    assert_eq!(recorded[0].choice(), "Defect");
    assert_eq!(recorded[1].player_id(), alice.player_id());
    assert_eq!(recorded[1].choice(), "Cooperate");
}

#[test]
fn test_results_empty_without_moves() {
    let (_db, _database, sessions, moves) = setup_stores(2);

    let ticket = sessions.join().expect("Join failed");
    let recorded = moves.results(ticket.session_id()).expect("Results failed");
    assert!(recorded.is_empty());

    // Unknown sessions report no moves rather than an error.
    let recorded = moves.results("no-such-session").expect("Results failed");
    assert!(recorded.is_empty());
}

#[test]
fn test_choice_stored_verbatim() {
    let (_db, _database, sessions, moves) = setup_stores(2);

    let alice = sessions.join().expect("First join failed");
    let _bob = sessions.join().expect("Second join failed");
    let sid = alice.session_id();

    // The store does not gate on the configured choice set.
    moves
        .save_move(sid, alice.player_id(), "Tarantula")
        .expect("Out-of-set choice should pass through");

    let recorded = moves.results(sid).expect("Results failed");
    assert_eq!(recorded[0].choice(), "Tarantula");
}

#[test]
fn test_purge_empties_store() {
    let (_db, database, sessions, moves) = setup_stores(2);

    let alice = sessions.join().expect("First join failed");
    let _bob = sessions.join().expect("Second join failed");
    moves
        .save_move(alice.session_id(), alice.player_id(), "Cooperate")
        .expect("Move failed");

    let purged = database.purge().expect("Purge failed");
    assert_eq!(purged, 1);

    let err = sessions
        .session_state(alice.session_id())
        .expect_err("Purged session should be gone");
    assert!(matches!(err, StoreError::NotFound { .. }));

    // Cascade removed the move rows along with the session.
    let recorded = moves.results(alice.session_id()).expect("Results failed");
    assert!(recorded.is_empty());

    // The store stays usable after a purge.
    sessions.join().expect("Join after purge failed");
}

#[test]
fn test_concurrent_joins_respect_capacity() {
    let (_db, _database, sessions, _moves) = setup_stores(2);

    let mut handles = Vec::new();
    for _ in 0..20 {
        let sessions = sessions.clone();
        handles.push(thread::spawn(move || sessions.join().expect("Join failed")));
    }

    let tickets: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("Worker panicked"))
        .collect();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for ticket in &tickets {
        *counts.entry(ticket.session_id().clone()).or_default() += 1;
    }

    assert!(
        counts.values().all(|&count| count <= 2),
        "a session was assigned more than two players: {:?}",
        counts
    );

    for sid in counts.keys() {
        let state = sessions.session_state(sid).expect("State failed");
        assert!(*state.players() <= 2, "session {} over capacity", sid);
    }

    // Every worker got a distinct player token.
    let mut player_ids: Vec<_> = tickets
        .iter()
        .map(|ticket| ticket.player_id().clone())
        .collect();
    player_ids.sort();
    player_ids.dedup();
    assert_eq!(player_ids.len(), 20);
}
