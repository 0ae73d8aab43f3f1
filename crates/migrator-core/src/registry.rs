//! Persisted record of applied migration names.
//!
//! A record's presence means the migration was applied or explicitly
//! ignored; absence means it is pending. Records carry nothing but the name.

use crate::config::is_identifier;
use crate::error::{MigratorError, Result};
use crate::store::Store;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

/// Lookup, insert and delete of applied migration names.
///
/// Implementations do not enforce uniqueness: recording a name twice is
/// not an error.
pub trait Registry {
    /// Check whether a record exists for `name`.
    fn contains(&self, name: &str) -> Result<bool>;

    /// Insert a record for `name`.
    fn record(&self, name: &str) -> Result<()>;

    /// Delete every record for `name`. Returns the number removed.
    fn remove(&self, name: &str) -> Result<usize>;

    /// All recorded names, in insertion order.
    fn list(&self) -> Result<Vec<String>>;
}

/// Registry stored as a single-column table in the target store.
#[derive(Debug, Clone)]
pub struct SqliteRegistry {
    store: Store,
    table: String,
}

impl SqliteRegistry {
    /// Bind the registry to `table`.
    ///
    /// Nothing is written here: the table is created by the first
    /// [`Registry::record`], and reads treat a missing table as empty.
    pub fn open(store: Store, table: &str) -> Result<Self> {
        if !is_identifier(table) {
            return Err(MigratorError::Config {
                message: format!("Registry table name {:?} is not a valid identifier", table),
            });
        }

        Ok(Self {
            store,
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn table_exists(&self, conn: &Connection) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
                params![self.table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn ensure_table(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (name TEXT NOT NULL);\n\
             CREATE INDEX IF NOT EXISTS idx_{table}_name ON {table}(name);",
            table = self.table,
        ))?;
        Ok(())
    }
}

impl Registry for SqliteRegistry {
    fn contains(&self, name: &str) -> Result<bool> {
        let conn = self.store.lock_conn()?;
        if !self.table_exists(&conn)? {
            return Ok(false);
        }
        let found: Option<i64> = conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE name = ?1 LIMIT 1", self.table),
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn record(&self, name: &str) -> Result<()> {
        let conn = self.store.lock_conn()?;
        self.ensure_table(&conn)?;
        conn.execute(
            &format!("INSERT INTO {} (name) VALUES (?1)", self.table),
            params![name],
        )?;
        debug!("Recorded migration {} in {}", name, self.table);
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<usize> {
        let conn = self.store.lock_conn()?;
        if !self.table_exists(&conn)? {
            return Ok(0);
        }
        let rows = conn.execute(
            &format!("DELETE FROM {} WHERE name = ?1", self.table),
            params![name],
        )?;
        if rows > 0 {
            debug!("Removed {} record(s) of migration {}", rows, name);
        }
        Ok(rows)
    }

    fn list(&self) -> Result<Vec<String>> {
        let conn = self.store.lock_conn()?;
        if !self.table_exists(&conn)? {
            return Ok(Vec::new());
        }
        let mut stmt = conn.prepare(&format!(
            "SELECT name FROM {} ORDER BY rowid",
            self.table
        ))?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }

        Ok(names)
    }
}

impl<R: Registry + ?Sized> Registry for &R {
    fn contains(&self, name: &str) -> Result<bool> {
        (**self).contains(name)
    }

    fn record(&self, name: &str) -> Result<()> {
        (**self).record(name)
    }

    fn remove(&self, name: &str) -> Result<usize> {
        (**self).remove(name)
    }

    fn list(&self) -> Result<Vec<String>> {
        (**self).list()
    }
}
