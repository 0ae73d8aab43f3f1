//! Migration units: validated names and the apply/revert capability.

use crate::error::{MigratorError, Result};
use crate::store::Store;
use regex::Regex;
use std::cmp::Ordering;

/// A migration file name that matched the naming pattern.
///
/// Ordering is by the numeric prefix only; two names with the same prefix
/// compare equal and keep their relative order in a stable sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationName {
    name: String,
    order: u64,
}

impl MigrationName {
    /// Full file name, suffix included.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Numeric order key taken from the name prefix.
    pub fn order(&self) -> u64 {
        self.order
    }

    pub fn into_string(self) -> String {
        self.name
    }

    /// Compare by order key.
    pub fn cmp_order(&self, other: &Self) -> Ordering {
        self.order.cmp(&other.order)
    }
}

impl std::fmt::Display for MigrationName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq<str> for MigrationName {
    fn eq(&self, other: &str) -> bool {
        self.name == other
    }
}

impl PartialEq<&str> for MigrationName {
    fn eq(&self, other: &&str) -> bool {
        self.name == *other
    }
}

/// Compiled `<order>_<label><suffix>` pattern.
#[derive(Debug, Clone)]
pub struct NamePattern {
    regex: Regex,
}

impl NamePattern {
    /// Build the pattern for a file suffix such as `.sql`.
    pub fn new(suffix: &str) -> Result<Self> {
        let text = format!(r"^(?P<order>[0-9]+)_[a-z0-9_]+{}$", regex::escape(suffix));
        let regex = Regex::new(&text).map_err(|e| MigratorError::Config {
            message: format!("Invalid migration name pattern {}: {}", text, e),
        })?;
        Ok(Self { regex })
    }

    /// Pattern source, as shown in error messages.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// Validate a single name and extract its order key.
    pub fn parse(&self, name: &str) -> Result<MigrationName> {
        let invalid = || MigratorError::InvalidMigrationName {
            name: name.to_string(),
            pattern: self.as_str().to_string(),
        };

        let captures = self.regex.captures(name).ok_or_else(invalid)?;
        let order = captures["order"].parse::<u64>().map_err(|_| invalid())?;

        Ok(MigrationName {
            name: name.to_string(),
            order,
        })
    }
}

/// The two operations every migration unit provides.
///
/// Both receive the target store. Success is `Ok(())`; any error aborts the
/// current run and is reported as a unit execution failure.
pub trait Migration: Send + Sync {
    /// Forward operation.
    fn apply(&self, store: &Store) -> anyhow::Result<()>;

    /// Reverse operation.
    fn revert(&self, store: &Store) -> anyhow::Result<()>;
}
