//! Command-line arguments and their merge onto the file configuration.

use clap::Parser;
use migrator_core::{MigratorConfig, Result};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "migrator")]
#[command(about = "Apply, ignore and roll back SQL migrations")]
pub struct Args {
    /// Task to run: status, apply, ignore, rollback, dump or help
    pub task: Option<String>,

    /// Migration file name for apply, ignore or rollback
    pub name: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Database file (overrides the configuration file)
    #[arg(long)]
    pub database: Option<String>,

    /// Migrations directory
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Registry table name
    #[arg(long)]
    pub table: Option<String>,

    /// Back up the store before applying migrations
    #[arg(long)]
    pub backup: bool,

    /// Refuse destructive tasks (rollback, ignore)
    #[arg(long)]
    pub protected: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

impl Args {
    /// Load the configuration file, if any, and apply flag overrides.
    pub fn to_config(&self) -> Result<MigratorConfig> {
        let mut config = match &self.config {
            Some(path) => MigratorConfig::load(path)?,
            None => MigratorConfig::default(),
        };

        if let Some(database) = &self.database {
            config.store.database = Some(database.clone());
        }
        if let Some(dir) = &self.dir {
            config.migrations_dir = dir.clone();
        }
        if let Some(table) = &self.table {
            config.registry_table = table.clone();
        }
        if self.backup {
            config.backup.enabled = true;
        }

        config.validate()?;
        Ok(config)
    }
}
