//! Applying, ignoring and rolling back migrations.
//!
//! Every operation recomputes the pending set before it acts. Units run one
//! at a time in ascending order; a failing unit stops the run and leaves the
//! registry exactly as the previous units left it.

use crate::backup::Backup;
use crate::config::MigratorConfig;
use crate::discovery::Discovery;
use crate::error::{Direction, MigratorError, Result};
use crate::loader::{MigrationLoader, ScriptLoader};
use crate::reconciler::Reconciler;
use crate::registry::{Registry, SqliteRegistry};
use crate::report::Reporter;
use crate::store::Store;
use crate::tasks::command_line;
use crate::unit::MigrationName;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Result of a status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Pending migration names, ascending by order.
    pub pending: Vec<String>,
}

impl Status {
    /// True when nothing is pending.
    pub fn is_clean(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Drives migrations against one store.
pub struct MigrationsManager<R: Registry, L: MigrationLoader> {
    store: Store,
    registry: R,
    loader: L,
    discovery: Discovery,
    backup: Backup,
    reporter: Arc<dyn Reporter>,
}

impl MigrationsManager<SqliteRegistry, ScriptLoader> {
    /// Connect to the configured store and use SQL scripts from the
    /// migrations directory.
    ///
    /// A missing migrations directory fails before the store is opened.
    pub fn connect(config: &MigratorConfig, reporter: Arc<dyn Reporter>) -> Result<Self> {
        config.validate()?;
        Discovery::from_config(config)?.require_dir()?;
        let store = Store::connect(&config.store)?;
        let registry = SqliteRegistry::open(store.clone(), &config.registry_table)?;
        let loader = ScriptLoader::new(config.migrations_dir.clone());
        Self::new(config, store, registry, loader, reporter)
    }
}

impl<R: Registry, L: MigrationLoader> MigrationsManager<R, L> {
    pub fn new(
        config: &MigratorConfig,
        store: Store,
        registry: R,
        loader: L,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self> {
        Ok(Self {
            store,
            registry,
            loader,
            discovery: Discovery::from_config(config)?,
            backup: Backup::new(config.backup.clone(), config.store.clone()),
            reporter,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Freshly computed pending set.
    pub fn pending(&self) -> Result<Vec<MigrationName>> {
        Reconciler::new(&self.discovery, &self.registry).pending()
    }

    /// Report the pending set. Read-only.
    pub fn status(&self) -> Result<Status> {
        let pending = self.pending()?;
        self.report_status(&pending);
        Ok(Status {
            pending: pending.into_iter().map(MigrationName::into_string).collect(),
        })
    }

    fn report_status(&self, pending: &[MigrationName]) {
        if pending.is_empty() {
            self.reporter
                .info("All migrations registered, nothing to execute");
            return;
        }

        self.reporter.info(&format!(
            "Unregistered migrations ({} to execute them):",
            command_line(Some("apply"), None)
        ));
        for name in pending {
            self.reporter.warn(name.as_str());
        }
    }

    /// Run pending migrations and record each one after it succeeds.
    ///
    /// With `target`, only that migration runs, and it must be pending.
    /// Returns the names applied, in order.
    pub fn apply(&self, target: Option<&str>) -> Result<Vec<String>> {
        let pending = self.pending()?;
        if pending.is_empty() {
            self.report_status(&pending);
            return Ok(Vec::new());
        }

        let selected = select(pending, target)?;

        if self.backup.before_apply() {
            self.dump()?;
        }

        let mut applied = Vec::with_capacity(selected.len());
        for name in selected {
            self.reporter
                .info(&format!("Executing migration {}...", name));
            let unit = self.loader.load(&name)?;
            unit.apply(&self.store)
                .map_err(|e| MigratorError::UnitExecution {
                    name: name.to_string(),
                    direction: Direction::Up,
                    source: e.into(),
                })?;
            self.registry.record(name.as_str())?;
            debug!("Applied migration {}", name);
            applied.push(name.into_string());
        }

        Ok(applied)
    }

    /// Record pending migrations as applied without running them.
    pub fn ignore(&self, target: Option<&str>) -> Result<Vec<String>> {
        let pending = self.pending()?;
        if pending.is_empty() {
            self.report_status(&pending);
            return Ok(Vec::new());
        }

        let selected = select(pending, target)?;

        let mut recorded = Vec::with_capacity(selected.len());
        for name in selected {
            self.reporter
                .info(&format!("Registering migration {}...", name));
            self.registry.record(name.as_str())?;
            recorded.push(name.into_string());
        }

        Ok(recorded)
    }

    /// Revert one applied migration and remove its record.
    ///
    /// Fails with `NotApplied` when the migration is still pending or has no
    /// record at all.
    pub fn rollback(&self, target: &str) -> Result<()> {
        let pending = self.pending()?;
        let not_applied = || MigratorError::NotApplied {
            name: target.to_string(),
        };

        if pending.iter().any(|name| name.as_str() == target) {
            return Err(not_applied());
        }
        if !self.registry.contains(target)? {
            return Err(not_applied());
        }

        let name = self.discovery.pattern().parse(target)?;
        let unit = self.loader.load(&name)?;

        self.reporter
            .info(&format!("Rolling back migration {}...", name));
        unit.revert(&self.store)
            .map_err(|e| MigratorError::UnitExecution {
                name: name.to_string(),
                direction: Direction::Down,
                source: e.into(),
            })?;
        self.registry.remove(name.as_str())?;
        debug!("Rolled back migration {}", name);

        Ok(())
    }

    /// Back up the store with the external dump utility.
    pub fn dump(&self) -> Result<PathBuf> {
        self.reporter.info("Doing store dump...");
        let path = self.backup.dump()?;
        self.reporter
            .info(&format!("Dump written to {}", path.display()));
        Ok(path)
    }
}

fn select(pending: Vec<MigrationName>, target: Option<&str>) -> Result<Vec<MigrationName>> {
    let Some(target) = target else {
        return Ok(pending);
    };

    pending
        .into_iter()
        .find(|name| name.as_str() == target)
        .map(|name| vec![name])
        .ok_or_else(|| MigratorError::NotPending {
            name: target.to_string(),
        })
}
