//! Storage handle: connection lifecycle, migrations, full-store purge.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use crate::db::{StoreError, schema};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Handle on the SQLite store.
///
/// Cheap to clone. Every operation opens its own pragma-configured
/// connection and releases it on drop, so callers never share in-process
/// mutable state; concurrency control lives entirely in the database.
#[derive(Debug, Clone)]
pub struct Database {
    path: String,
}

impl Database {
    /// Creates a handle for the SQLite database at `path`.
    #[instrument(skip(path))]
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        info!(path = %path, "creating database handle");
        Self { path }
    }

    /// Filesystem location of the SQLite file.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Opens a connection with referential integrity enforced and a busy
    /// timeout so concurrent writers queue instead of failing fast.
    #[instrument(skip(self))]
    pub(crate) fn connect(&self) -> Result<SqliteConnection, StoreError> {
        debug!(path = %self.path, "opening connection");
        let mut conn = SqliteConnection::establish(&self.path)
            .map_err(|e| StoreError::database(format!("failed to open '{}': {}", self.path, e)))?;
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
        Ok(conn)
    }

    /// Creates the database file if needed and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails to apply.
    #[instrument(skip(self))]
    pub fn apply_migrations(&self) -> Result<(), StoreError> {
        let mut conn = self.connect()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::database(format!("migration failed: {}", e)))?;
        info!(path = %self.path, "schema up to date");
        Ok(())
    }

    /// Deletes every session; moves go with them via the cascade.
    ///
    /// Returns the number of sessions removed. Only the dataset-reset
    /// surfaces call this.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] for connection or query failures.
    #[instrument(skip(self))]
    pub fn purge(&self) -> Result<usize, StoreError> {
        let mut conn = self.connect()?;
        let purged = diesel::delete(schema::sessions::table).execute(&mut conn)?;
        info!(sessions = purged, "purged all sessions");
        Ok(purged)
    }
}
