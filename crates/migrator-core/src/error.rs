//! Error types for the migrator engine.
//!
//! Every failure the engine can surface to its caller is a variant of
//! [`MigratorError`]. A pre-task hook stopping a run is not an error; it is
//! reported as [`crate::tasks::TaskOutcome::Aborted`].

use std::path::PathBuf;
use thiserror::Error;

/// Direction a migration unit was executed in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Main error type for the migrator engine.
#[derive(Debug, Error)]
pub enum MigratorError {
    // Discovery errors
    #[error("Migrations directory {} not found", .path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("Found incorrect name of migration file: {name}\nScript aborted. Required pattern: {pattern}")]
    InvalidMigrationName { name: String, pattern: String },

    // Selection errors
    #[error("Migration {name} is not on the pending migrations list. Can not be executed")]
    NotPending { name: String },

    #[error("Migration {name} has not been applied. Nothing to roll back")]
    NotApplied { name: String },

    // Store errors
    #[error("Store unreachable: {message}")]
    StoreUnreachable {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Store authentication failed: {message}")]
    StoreAuthFailure { message: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // Unit code errors
    #[error("No migration unit available for {name}")]
    UnitNotFound { name: String },

    #[error("Migration {name} failed while running {direction}")]
    UnitExecution {
        name: String,
        direction: Direction,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Backup failed: {message}")]
    Backup { message: String },

    // Dispatch errors
    #[error("Unknown task: {name}")]
    UnknownTask { name: String },

    #[error("Task {task} requires a migration name")]
    MissingArgument { task: String },
}

/// Result type alias for migrator operations.
pub type Result<T> = std::result::Result<T, MigratorError>;

impl From<std::io::Error> for MigratorError {
    fn from(err: std::io::Error) -> Self {
        MigratorError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for MigratorError {
    fn from(err: serde_json::Error) -> Self {
        MigratorError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for MigratorError {
    fn from(err: rusqlite::Error) -> Self {
        MigratorError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl MigratorError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        MigratorError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Process exit code for this error.
    ///
    /// - 2: usage errors (unknown task, missing argument, bad config)
    /// - 3: discovery errors (missing directory, bad file name)
    /// - 4: selection errors (not pending, not applied)
    /// - 5: store connection errors
    /// - 6: migration unit failures
    /// - 1: everything else
    pub fn exit_code(&self) -> i32 {
        match self {
            MigratorError::UnknownTask { .. }
            | MigratorError::MissingArgument { .. }
            | MigratorError::Config { .. }
            | MigratorError::Json { .. } => 2,

            MigratorError::DirectoryNotFound { .. }
            | MigratorError::InvalidMigrationName { .. } => 3,

            MigratorError::NotPending { .. } | MigratorError::NotApplied { .. } => 4,

            MigratorError::StoreUnreachable { .. } | MigratorError::StoreAuthFailure { .. } => 5,

            MigratorError::UnitExecution { .. } => 6,

            _ => 1,
        }
    }
}
