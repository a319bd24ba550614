//! Property name standardization.
//!
//! Renames keys to their standard spelling without changing which keys are
//! considered equivalent. Independent of the merge strategy.

use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, trace};

use crate::names::{CanonicalNameTable, contains_either, normalize_key};
use crate::order::{STANDARD_ORDER, standard_index};
use crate::properties::Properties;

/// Maps arbitrary keys to standard names, memoizing each resolution.
#[derive(Debug)]
pub struct NameStandardizer {
    table: Arc<CanonicalNameTable>,
    cache: DashMap<String, String>,
}

impl Default for NameStandardizer {
    fn default() -> Self {
        Self::new(Arc::new(CanonicalNameTable::builtin().clone()))
    }
}

impl NameStandardizer {
    /// Create a standardizer over `table`.
    #[must_use]
    pub fn new(table: Arc<CanonicalNameTable>) -> Self {
        Self {
            table,
            cache: DashMap::new(),
        }
    }

    /// Rename every key to its standard name.
    ///
    /// When two keys land on the same name, the later one's value wins.
    #[must_use]
    pub fn standardize(&self, properties: &Properties) -> Properties {
        let mut standardized = Properties::with_capacity(properties.len());
        for (key, value) in properties {
            let name = self.resolve(key);
            if name != key {
                debug!("Standardized '{key}' -> '{name}'");
            }
            standardized.insert(name, value.clone());
        }
        standardized
    }

    /// Standard name for one key; the key itself when nothing matches.
    #[must_use]
    pub fn resolve(&self, key: &str) -> String {
        if let Some(idx) = standard_index(key) {
            return STANDARD_ORDER[idx].to_string();
        }
        if let Some(hit) = self.cache.get(key).map(|r| r.value().clone()) {
            trace!("Standardization memo hit: '{key}' -> '{hit}'");
            return hit;
        }
        let resolved = self.lookup(key).unwrap_or_else(|| key.to_string());
        self.cache
            .entry(key.to_string())
            .or_insert(resolved)
            .value()
            .clone()
    }

    fn lookup(&self, key: &str) -> Option<String> {
        if let Some(canonical) = self.table.canonical(key) {
            return Some(canonical.to_string());
        }
        let normalized = normalize_key(key);
        STANDARD_ORDER
            .iter()
            .find(|entry| **entry == normalized)
            .or_else(|| {
                STANDARD_ORDER
                    .iter()
                    .find(|entry| contains_either(entry, &normalized))
            })
            .map(|entry| (*entry).to_string())
    }

    /// Number of memoized resolutions.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop all memoized resolutions.
    pub fn clear(&self) {
        self.cache.clear();
    }
}
