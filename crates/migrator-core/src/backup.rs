//! Store backups through an external dump utility.

use crate::config::{BackupConfig, StoreConfig};
use crate::error::{MigratorError, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// A fully resolved dump invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpCommand {
    pub program: String,
    pub args: Vec<String>,
    /// File the dump will be written to.
    pub output: PathBuf,
}

/// Runs the configured dump program against the store's database.
#[derive(Debug, Clone)]
pub struct Backup {
    config: BackupConfig,
    store: StoreConfig,
}

impl Backup {
    pub fn new(config: BackupConfig, store: StoreConfig) -> Self {
        Self { config, store }
    }

    /// Whether `apply` should dump first.
    pub fn before_apply(&self) -> bool {
        self.config.enabled
    }

    /// Build the invocation for a dump taken at `now`.
    pub fn command(&self, now: DateTime<Local>) -> Result<DumpCommand> {
        let database = self.store.database_name()?;
        let output = self.config.directory.join(dump_file_name(now));

        Ok(DumpCommand {
            program: self.config.program.clone(),
            args: vec![
                database.to_string(),
                format!(".backup '{}'", quote_path(&output)),
            ],
            output,
        })
    }

    /// Take a dump now. Returns the path of the written file.
    pub fn dump(&self) -> Result<PathBuf> {
        let command = self.command(Local::now())?;

        std::fs::create_dir_all(&self.config.directory)
            .map_err(|e| MigratorError::io_with_path(e, &self.config.directory))?;

        debug!("Running {} {:?}", command.program, command.args);
        let output = Command::new(&command.program)
            .args(&command.args)
            .output()
            .map_err(|e| MigratorError::Backup {
                message: format!("Failed to run {}: {}", command.program, e),
            })?;

        if !output.status.success() {
            return Err(MigratorError::Backup {
                message: format!(
                    "{} exited with {}: {}",
                    command.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(command.output)
    }
}

/// Path text for a single-quoted dot-command argument, quotes doubled.
fn quote_path(path: &Path) -> String {
    path.display().to_string().replace('\'', "''")
}

/// Timestamp-derived file name with `:`, `.` and whitespace replaced by `_`.
fn dump_file_name(now: DateTime<Local>) -> String {
    let stamp = now.format("%Y-%m-%d %H:%M:%S%.6f").to_string();
    let stamp: String = stamp
        .chars()
        .map(|c| if c == ':' || c == '.' || c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{}.db", stamp)
}
