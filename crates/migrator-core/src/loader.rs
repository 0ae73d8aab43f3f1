//! Loading migration units by name.
//!
//! [`ScriptLoader`] reads SQL scripts from the migrations directory.
//! [`StaticCatalog`] serves units compiled into the binary.

use crate::error::{MigratorError, Result};
use crate::store::Store;
use crate::unit::{Migration, MigrationName};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Resolves a migration name to its unit.
pub trait MigrationLoader {
    fn load(&self, name: &MigrationName) -> Result<Arc<dyn Migration>>;
}

impl<L: MigrationLoader + ?Sized> MigrationLoader for &L {
    fn load(&self, name: &MigrationName) -> Result<Arc<dyn Migration>> {
        (**self).load(name)
    }
}

/// Line that opens the forward section of a script.
pub const UP_MARKER: &str = "-- migrate:up";
/// Line that opens the reverse section of a script.
pub const DOWN_MARKER: &str = "-- migrate:down";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Up,
    Down,
}

/// A SQL migration script split into its two sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptMigration {
    name: String,
    up: String,
    down: Option<String>,
}

impl ScriptMigration {
    /// Split a script into up and down sections.
    ///
    /// Text before the first marker is ignored. Without an up marker the
    /// text before the down marker is the up section.
    pub fn parse(name: impl Into<String>, source: &str) -> Self {
        let has_up_marker = source.lines().any(|line| is_marker(line, UP_MARKER));

        let mut section = if has_up_marker {
            Section::Preamble
        } else {
            Section::Up
        };
        let mut up = String::new();
        let mut down: Option<String> = None;

        for line in source.lines() {
            if is_marker(line, UP_MARKER) {
                section = Section::Up;
                continue;
            }
            if is_marker(line, DOWN_MARKER) {
                section = Section::Down;
                down.get_or_insert_with(String::new);
                continue;
            }

            let target = match section {
                Section::Preamble => continue,
                Section::Up => &mut up,
                Section::Down => down.get_or_insert_with(String::new),
            };
            target.push_str(line);
            target.push('\n');
        }

        Self {
            name: name.into(),
            up,
            down,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn up(&self) -> &str {
        &self.up
    }

    pub fn down(&self) -> Option<&str> {
        self.down.as_deref()
    }
}

fn is_marker(line: &str, marker: &str) -> bool {
    line.trim().eq_ignore_ascii_case(marker)
}

impl Migration for ScriptMigration {
    fn apply(&self, store: &Store) -> anyhow::Result<()> {
        if self.up.trim().is_empty() {
            warn!("Migration {} has an empty up section", self.name);
            return Ok(());
        }
        store.execute_batch(&self.up)?;
        Ok(())
    }

    fn revert(&self, store: &Store) -> anyhow::Result<()> {
        match self.down.as_deref() {
            Some(down) if !down.trim().is_empty() => {
                store.execute_batch(down)?;
            }
            _ => warn!("Migration {} has no down section, nothing to revert", self.name),
        }
        Ok(())
    }
}

/// Loads SQL scripts from a directory.
#[derive(Debug, Clone)]
pub struct ScriptLoader {
    dir: PathBuf,
}

impl ScriptLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl MigrationLoader for ScriptLoader {
    fn load(&self, name: &MigrationName) -> Result<Arc<dyn Migration>> {
        let path = self.dir.join(name.as_str());
        let source =
            std::fs::read_to_string(&path).map_err(|e| MigratorError::io_with_path(e, &path))?;
        Ok(Arc::new(ScriptMigration::parse(name.as_str(), &source)))
    }
}

/// Fixed table of compiled migration units keyed by file name.
#[derive(Default, Clone)]
pub struct StaticCatalog {
    units: HashMap<String, Arc<dyn Migration>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit under `name`, replacing any previous one.
    pub fn with(mut self, name: impl Into<String>, unit: impl Migration + 'static) -> Self {
        self.units.insert(name.into(), Arc::new(unit));
        self
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl MigrationLoader for StaticCatalog {
    fn load(&self, name: &MigrationName) -> Result<Arc<dyn Migration>> {
        self.units
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| MigratorError::UnitNotFound {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::NamePattern;
    use tempfile::TempDir;

    fn name(raw: &str) -> MigrationName {
        NamePattern::new(".sql").unwrap().parse(raw).unwrap()
    }

    fn table_exists(store: &Store, table: &str) -> bool {
        let conn = store.lock_conn().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        count > 0
    }

    #[test]
    fn test_parse_both_sections() {
        let script = ScriptMigration::parse(
            "1_init.sql",
            "-- creates users\n-- migrate:up\nCREATE TABLE users (id INTEGER);\n-- migrate:down\nDROP TABLE users;\n",
        );
        assert_eq!(script.up(), "CREATE TABLE users (id INTEGER);\n");
        assert_eq!(script.down(), Some("DROP TABLE users;\n"));
    }

    #[test]
    fn test_parse_without_markers_is_all_up() {
        let script = ScriptMigration::parse("1_init.sql", "CREATE TABLE a (x);\nCREATE TABLE b (y);");
        assert_eq!(script.up(), "CREATE TABLE a (x);\nCREATE TABLE b (y);\n");
        assert_eq!(script.down(), None);
    }

    #[test]
    fn test_parse_down_only_marker() {
        let script = ScriptMigration::parse("1_init.sql", "CREATE TABLE a (x);\n-- migrate:down\nDROP TABLE a;");
        assert_eq!(script.up(), "CREATE TABLE a (x);\n");
        assert_eq!(script.down(), Some("DROP TABLE a;\n"));
    }

    #[test]
    fn test_parse_markers_are_case_and_space_insensitive() {
        let script = ScriptMigration::parse("1_init.sql", "  -- MIGRATE:UP  \nSELECT 1;\n-- Migrate:Down\n");
        assert_eq!(script.up(), "SELECT 1;\n");
        assert_eq!(script.down(), Some(""));
    }

    #[test]
    fn test_script_apply_and_revert() {
        let store = Store::open_in_memory().unwrap();
        let script = ScriptMigration::parse(
            "1_init.sql",
            "-- migrate:up\nCREATE TABLE users (id INTEGER);\n-- migrate:down\nDROP TABLE users;\n",
        );

        script.apply(&store).unwrap();
        assert!(table_exists(&store, "users"));

        script.revert(&store).unwrap();
        assert!(!table_exists(&store, "users"));
    }

    #[test]
    fn test_script_revert_without_down_is_noop() {
        let store = Store::open_in_memory().unwrap();
        let script = ScriptMigration::parse("1_init.sql", "CREATE TABLE users (id INTEGER);");
        script.apply(&store).unwrap();
        script.revert(&store).unwrap();
        assert!(table_exists(&store, "users"));
    }

    #[test]
    fn test_script_apply_bad_sql_fails() {
        let store = Store::open_in_memory().unwrap();
        let script = ScriptMigration::parse("1_init.sql", "CREATE TABEL nope;");
        assert!(script.apply(&store).is_err());
    }

    #[test]
    fn test_script_loader_reads_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("1_init.sql"),
            "-- migrate:up\nCREATE TABLE users (id INTEGER);\n",
        )
        .unwrap();
        let loader = ScriptLoader::new(temp_dir.path());
        let store = Store::open_in_memory().unwrap();

        let unit = loader.load(&name("1_init.sql")).unwrap();
        unit.apply(&store).unwrap();
        assert!(table_exists(&store, "users"));
    }

    #[test]
    fn test_script_loader_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ScriptLoader::new(temp_dir.path());

        let err = loader.load(&name("1_init.sql")).err().unwrap();
        assert!(matches!(err, MigratorError::Io { path: Some(_), .. }));
    }

    struct Noop;

    impl Migration for Noop {
        fn apply(&self, _store: &Store) -> anyhow::Result<()> {
            Ok(())
        }

        fn revert(&self, _store: &Store) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_static_catalog_lookup() {
        let catalog = StaticCatalog::new().with("1_init.sql", Noop);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.load(&name("1_init.sql")).is_ok());

        let err = catalog.load(&name("2_other.sql")).err().unwrap();
        assert!(matches!(err, MigratorError::UnitNotFound { .. }));
    }
}
