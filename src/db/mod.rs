//! SQLite persistence: session matchmaking and the move log.

mod database;
mod error;
mod models;
mod moves;
mod schema;
mod sessions;

pub use database::Database;
pub use error::StoreError;
pub use models::{JoinTicket, Phase, PlayerId, SessionId, SessionState, StoredMove};
pub use moves::MoveStore;
pub use sessions::SessionStore;
