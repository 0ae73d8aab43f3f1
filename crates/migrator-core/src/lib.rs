//! Migrator Core - reconciles migration scripts against an applied-migrations
//! registry.
//!
//! A migrations directory holds files named `<order>_<label>.sql`. The
//! registry table in the target store holds the names already applied (or
//! explicitly ignored). Every operation rescans the directory, computes the
//! pending set and then applies, ignores or rolls back units one at a time.
//!
//! # Example
//!
//! ```rust,ignore
//! use migrator_core::{MigrationsManager, MigratorConfig, TracingReporter};
//! use std::sync::Arc;
//!
//! fn main() -> migrator_core::Result<()> {
//!     let mut config = MigratorConfig::default();
//!     config.store.database = Some("app.db".into());
//!
//!     let manager = MigrationsManager::connect(&config, Arc::new(TracingReporter))?;
//!     let applied = manager.apply(None)?;
//!     println!("Applied {} migrations", applied.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! Concurrent runners against one store are not coordinated: two runs can
//! both see the same pending unit and both execute it.

pub mod backup;
pub mod config;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod loader;
pub mod reconciler;
pub mod registry;
pub mod report;
pub mod store;
pub mod tasks;
pub mod unit;

// Re-export commonly used types
pub use backup::{Backup, DumpCommand};
pub use config::{BackupConfig, MigratorConfig, StoreConfig};
pub use discovery::{sort_names, Discovery};
pub use error::{Direction, MigratorError, Result};
pub use executor::{MigrationsManager, Status};
pub use loader::{MigrationLoader, ScriptLoader, ScriptMigration, StaticCatalog};
pub use reconciler::Reconciler;
pub use registry::{Registry, SqliteRegistry};
pub use report::{Level, MemoryReporter, Reporter, TracingReporter};
pub use store::Store;
pub use tasks::{
    command_line, find_task, help_lines, Dispatcher, HookDecision, NoHook, TaskHook, TaskKind,
    TaskOutcome, TaskSpec, TASKS,
};
pub use unit::{Migration, MigrationName, NamePattern};
