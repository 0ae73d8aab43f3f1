//! Pending set computation.

use crate::discovery::Discovery;
use crate::error::Result;
use crate::registry::Registry;
use crate::unit::MigrationName;

/// Joins discovered migrations with the registry.
///
/// Nothing is cached: every call rescans the directory and queries the
/// registry, so the result reflects the store at call time.
pub struct Reconciler<'a, R: Registry + ?Sized> {
    discovery: &'a Discovery,
    registry: &'a R,
}

impl<'a, R: Registry + ?Sized> Reconciler<'a, R> {
    pub fn new(discovery: &'a Discovery, registry: &'a R) -> Self {
        Self {
            discovery,
            registry,
        }
    }

    /// Discovered migrations without a registry record, ascending by order.
    ///
    /// A missing directory fails before the registry is consulted.
    pub fn pending(&self) -> Result<Vec<MigrationName>> {
        let discovered = self.discovery.scan()?;

        let mut unregistered = Vec::with_capacity(discovered.len());
        for name in discovered {
            if !self.registry.contains(&name)? {
                unregistered.push(name);
            }
        }

        self.discovery.sort(unregistered)
    }
}
