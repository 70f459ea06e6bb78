//! Source -> destination item identifier mapping.
//!
//! Built while items are created and consulted when their prices are created.
//! The mapping is one-to-one; [`IdMapping::record`] refuses entries that would
//! break that. Entries keep creation order so the persisted artifact reads in
//! the same order as the run log.

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{MigrateError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMapping {
    entries: IndexMap<String, String>,
    destinations: HashSet<String>,
}

impl IdMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `source -> destination`.
    ///
    /// Fails if `source` is already mapped or `destination` already belongs to
    /// another source identifier.
    pub fn record(&mut self, source: impl Into<String>, destination: impl Into<String>) -> Result<()> {
        let source = source.into();
        let destination = destination.into();

        if let Some(existing) = self.entries.get(&source) {
            return Err(MigrateError::Mapping(format!(
                "{} is already mapped to {}",
                source, existing
            )));
        }
        if self.destinations.contains(&destination) {
            return Err(MigrateError::Mapping(format!(
                "destination {} is already mapped from another source item",
                destination
            )));
        }

        self.destinations.insert(destination.clone());
        self.entries.insert(source, destination);
        Ok(())
    }

    /// Destination identifier for `source`, if it was created.
    pub fn resolve(&self, source: &str) -> Option<&str> {
        self.entries.get(source).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, d)| (s.as_str(), d.as_str()))
    }

    /// Write the mapping artifact (atomic write).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(&self.entries)?;

        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Read a mapping artifact written by [`IdMapping::save`].
    #[cfg(test)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let entries: IndexMap<String, String> = serde_json::from_str(&content)?;

        let mut mapping = Self::new();
        for (source, destination) in entries {
            mapping.record(source, destination)?;
        }
        Ok(mapping)
    }
}
