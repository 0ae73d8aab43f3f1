//! SQLite-backed handle to the target data store.
//!
//! The same connection serves the migration units and the registry table.

use crate::config::{StoreConfig, StoreDefaults};
use crate::error::{MigratorError, Result};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Handle to the target store.
///
/// Cheap to clone; clones share one connection behind a mutex.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    database: String,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Connect to the store described by `config`.
    ///
    /// Fails with `StoreUnreachable` when the database can not be opened or
    /// is not a database, and with `StoreAuthFailure` for incomplete
    /// credentials.
    pub fn connect(config: &StoreConfig) -> Result<Self> {
        let database = config.database_name()?;

        if let Some(host) = config.host.as_deref() {
            if !is_local_host(host) {
                return Err(MigratorError::StoreUnreachable {
                    message: format!(
                        "SQLite store {} is file-backed and can not be reached on host {}",
                        database, host
                    ),
                    source: None,
                });
            }
        }
        if let Some(port) = config.port {
            debug!("Ignoring port {} for file-backed store {}", port, database);
        }
        if let Some((user, _)) = config.credentials()? {
            debug!("SQLite has no authentication, accepting user {}", user);
        }

        let conn = Connection::open(database).map_err(|e| MigratorError::StoreUnreachable {
            message: format!("Failed to open database {}: {}", database, e),
            source: Some(e),
        })?;

        let store = Self::from_connection(conn, database.to_string(), config.busy_timeout_ms)?;
        debug!("Connected to store {}", database);
        Ok(store)
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| MigratorError::StoreUnreachable {
            message: format!("Failed to open in-memory database: {}", e),
            source: Some(e),
        })?;
        Self::from_connection(conn, ":memory:".to_string(), StoreDefaults::BUSY_TIMEOUT_MS)
    }

    fn from_connection(conn: Connection, database: String, busy_timeout_ms: u32) -> Result<Self> {
        Self::configure_connection(&conn, busy_timeout_ms)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            database,
        })
    }

    fn configure_connection(conn: &Connection, busy_timeout_ms: u32) -> Result<()> {
        // Connection-scoped pragmas only; persistent settings such as the
        // journal mode are left as the store has them. A non-database file
        // fails on the schema read, so failures count as unreachable.
        conn.execute_batch(&format!("PRAGMA busy_timeout={};", busy_timeout_ms))
            .and_then(|_| conn.query_row("SELECT count(*) FROM sqlite_master", [], |_| Ok(())))
            .map_err(|e| MigratorError::StoreUnreachable {
                message: format!("Failed to configure database connection: {}", e),
                source: Some(e),
            })
    }

    /// Database name this store was opened with.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Lock the underlying connection.
    pub fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| MigratorError::Database {
            message: "Failed to acquire store connection lock".to_string(),
            source: None,
        })
    }

    /// Run a batch of SQL statements.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}

fn is_local_host(host: &str) -> bool {
    host.is_empty() || host == StoreDefaults::HOST || host == "127.0.0.1" || host == "::1"
}
