//! Discovery of migration files and their deterministic ordering.

use crate::config::MigratorConfig;
use crate::error::{MigratorError, Result};
use crate::unit::{MigrationName, NamePattern};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Scans one migrations directory.
#[derive(Debug, Clone)]
pub struct Discovery {
    dir: PathBuf,
    suffix: String,
    marker_file: String,
    pattern: NamePattern,
}

impl Discovery {
    pub fn new(
        dir: impl Into<PathBuf>,
        suffix: impl Into<String>,
        marker_file: impl Into<String>,
    ) -> Result<Self> {
        let suffix = suffix.into();
        let pattern = NamePattern::new(&suffix)?;
        Ok(Self {
            dir: dir.into(),
            suffix,
            marker_file: marker_file.into(),
            pattern,
        })
    }

    pub fn from_config(config: &MigratorConfig) -> Result<Self> {
        Self::new(
            config.migrations_dir.clone(),
            config.suffix.clone(),
            config.marker_file.clone(),
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn pattern(&self) -> &NamePattern {
        &self.pattern
    }

    /// Candidate file names in the directory, unvalidated.
    ///
    /// Creates the empty marker file if it is missing. Names come back in
    /// lexicographic order so that later stable sorting is deterministic.
    pub fn scan(&self) -> Result<Vec<String>> {
        self.require_dir()?;
        self.ensure_marker()?;

        let entries =
            std::fs::read_dir(&self.dir).map_err(|e| MigratorError::io_with_path(e, &self.dir))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MigratorError::io_with_path(e, &self.dir))?;
            let file_type = entry
                .file_type()
                .map_err(|e| MigratorError::io_with_path(e, entry.path()))?;
            if file_type.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if name == self.marker_file || !name.ends_with(&self.suffix) {
                continue;
            }
            names.push(name);
        }

        names.sort();
        debug!(
            "Found {} migration file(s) in {}",
            names.len(),
            self.dir.display()
        );
        Ok(names)
    }

    /// Fail with `DirectoryNotFound` unless the directory exists.
    pub fn require_dir(&self) -> Result<()> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(MigratorError::DirectoryNotFound {
                path: self.dir.clone(),
            })
        }
    }

    fn ensure_marker(&self) -> Result<()> {
        let marker = self.dir.join(&self.marker_file);
        if !marker.exists() {
            std::fs::File::create(&marker).map_err(|e| MigratorError::io_with_path(e, &marker))?;
            debug!("Created marker file {}", marker.display());
        }
        Ok(())
    }

    /// Validate and sort names by their order key.
    pub fn sort(&self, names: Vec<String>) -> Result<Vec<MigrationName>> {
        sort_names(names, &self.pattern)
    }
}

/// Validate every name and sort ascending by order key.
///
/// A single name is validated too. The first invalid name aborts the whole
/// sort. Equal order keys keep their input order.
pub fn sort_names(names: Vec<String>, pattern: &NamePattern) -> Result<Vec<MigrationName>> {
    let mut parsed = names
        .iter()
        .map(|name| pattern.parse(name))
        .collect::<Result<Vec<_>>>()?;

    parsed.sort_by(|a, b| a.cmp_order(b));

    for pair in parsed.windows(2) {
        if pair[0].order() == pair[1].order() {
            warn!(
                "Migrations {} and {} share order {}",
                pair[0],
                pair[1],
                pair[0].order()
            );
        }
    }

    Ok(parsed)
}
