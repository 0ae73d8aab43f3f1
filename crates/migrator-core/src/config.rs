//! Centralized configuration for the migrator.
//!
//! Defaults live in associated constants; [`MigratorConfig`] is the value
//! threaded explicitly through every component. It can be read from a JSON
//! file, and every field is optional there.

use crate::error::{MigratorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Naming and layout defaults for the migrations directory.
pub struct MigrationsConfig;

impl MigrationsConfig {
    pub const DIRECTORY: &'static str = "migrations";
    pub const SUFFIX: &'static str = ".sql";
    pub const MARKER_FILE: &'static str = "mod.sql";
    pub const REGISTRY_TABLE: &'static str = "migrations";
}

/// Defaults for the target store connection.
pub struct StoreDefaults;

impl StoreDefaults {
    pub const HOST: &'static str = "localhost";
    pub const BUSY_TIMEOUT_MS: u32 = 5000;
}

/// Defaults for the backup utility.
pub struct BackupDefaults;

impl BackupDefaults {
    pub const DIRECTORY: &'static str = "dumps";
    pub const PROGRAM: &'static str = "sqlite3";
}

/// Connection parameters for the target store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct StoreConfig {
    /// Host of the store. The SQLite backend only accepts local hosts.
    pub host: Option<String>,
    /// Port of the store. File-backed stores ignore it.
    pub port: Option<u16>,
    /// Database name; for SQLite this is the database file path.
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// How long the store client waits on a locked database.
    pub busy_timeout_ms: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            database: None,
            user: None,
            password: None,
            busy_timeout_ms: StoreDefaults::BUSY_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    /// Database name, or a config error when none was given.
    pub fn database_name(&self) -> Result<&str> {
        self.database
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| MigratorError::Config {
                message: "Name of the database not given".to_string(),
            })
    }

    /// Credentials pair, if both halves are present.
    ///
    /// Giving only one half is an authentication failure rather than a
    /// silent anonymous connection.
    pub fn credentials(&self) -> Result<Option<(&str, &str)>> {
        match (self.user.as_deref(), self.password.as_deref()) {
            (Some(user), Some(password)) => Ok(Some((user, password))),
            (None, None) => Ok(None),
            (Some(user), None) => Err(MigratorError::StoreAuthFailure {
                message: format!("password missing for user {}", user),
            }),
            (None, Some(_)) => Err(MigratorError::StoreAuthFailure {
                message: "password given without a user".to_string(),
            }),
        }
    }
}

/// Backup behavior around `apply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BackupConfig {
    /// Take a backup automatically before `apply` runs any migration.
    pub enabled: bool,
    /// Directory the dumps are written to.
    pub directory: PathBuf,
    /// External dump program.
    pub program: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: PathBuf::from(BackupDefaults::DIRECTORY),
            program: BackupDefaults::PROGRAM.to_string(),
        }
    }
}

/// Full migrator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MigratorConfig {
    pub store: StoreConfig,
    /// Table holding the names of applied migrations.
    pub registry_table: String,
    /// Directory scanned for migration files.
    pub migrations_dir: PathBuf,
    /// File suffix of migration files.
    pub suffix: String,
    /// Placeholder file kept in the migrations directory and never treated
    /// as a migration.
    pub marker_file: String,
    pub backup: BackupConfig,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            registry_table: MigrationsConfig::REGISTRY_TABLE.to_string(),
            migrations_dir: PathBuf::from(MigrationsConfig::DIRECTORY),
            suffix: MigrationsConfig::SUFFIX.to_string(),
            marker_file: MigrationsConfig::MARKER_FILE.to_string(),
            backup: BackupConfig::default(),
        }
    }
}

impl MigratorConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| MigratorError::io_with_path(e, path))?;
        let config: MigratorConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot reject on its own.
    pub fn validate(&self) -> Result<()> {
        if self.suffix.is_empty() {
            return Err(MigratorError::Config {
                message: "Migration file suffix must not be empty".to_string(),
            });
        }
        if self.marker_file.is_empty() {
            return Err(MigratorError::Config {
                message: "Marker file name must not be empty".to_string(),
            });
        }
        if !is_identifier(&self.registry_table) {
            return Err(MigratorError::Config {
                message: format!(
                    "Registry table name {:?} is not a valid identifier",
                    self.registry_table
                ),
            });
        }
        Ok(())
    }
}

/// True for `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
