//! End-to-end reconciliation with memoized output.
//!
//! `Reconciler` is the injected context holding every memo table: the merge
//! resolution memo, the standardization memo and the output cache. Tests build
//! their own instance; [`Reconciler::global`] serves the free [`reconcile`].
//!
//! Output cache keys combine a 32-bit xxHash of the document with the packed
//! options.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use log::debug;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh32::xxh32;

use crate::error::FrontmatterError;
use crate::extract::{assemble, combine_all, extract};
use crate::merge::{MergeCacheMode, MergeStrategy, PropertyMerger};
use crate::names::CanonicalNameTable;
use crate::order::sort_properties;
use crate::standardize::NameStandardizer;

static GLOBAL: LazyLock<Reconciler> = LazyLock::new(Reconciler::new);

/// Whether keys are renamed to standard names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingMode {
    /// Keep keys as written (after merging)
    #[default]
    AsIs,
    /// Rename keys to standard names
    Standard,
}

/// Whether keys are reordered by the standard order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderMode {
    /// Keep first-seen order
    #[default]
    AsIs,
    /// Standard order, unlisted keys last
    Sorted,
}

fn is_as_is(s: &str) -> bool {
    matches!(s, "as_is" | "as-is" | "asis" | "none")
}

impl FromStr for NamingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            v if is_as_is(v) => Ok(Self::AsIs),
            "standard" => Ok(Self::Standard),
            other => Err(format!("unknown naming mode: {other}")),
        }
    }
}

impl FromStr for OrderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            v if is_as_is(v) => Ok(Self::AsIs),
            "sorted" => Ok(Self::Sorted),
            other => Err(format!("unknown order mode: {other}")),
        }
    }
}

/// Reconciliation options.
///
/// ```yaml
/// naming: standard
/// order: sorted
/// merge: aggressive
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
    /// Key naming
    pub naming: NamingMode,
    /// Key order
    pub order: OrderMode,
    /// Merge aggressiveness
    pub merge: MergeStrategy,
}

impl ReconcileOptions {
    /// Build options from their parts.
    #[must_use]
    pub const fn new(naming: NamingMode, order: OrderMode, merge: MergeStrategy) -> Self {
        Self {
            naming,
            order,
            merge,
        }
    }

    /// Load options from YAML; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`FrontmatterError::Yaml`] for invalid YAML or unknown values.
    pub fn from_yaml_str(text: &str) -> Result<Self, FrontmatterError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Pack into the cache's option bits: naming bit 0, order bit 1, merge bits 2-3.
    #[must_use]
    pub fn pack(self) -> u8 {
        let naming = u8::from(self.naming == NamingMode::Standard);
        let order = u8::from(self.order == OrderMode::Sorted) << 1;
        let merge = match self.merge {
            MergeStrategy::None => 0,
            MergeStrategy::Conservative => 1,
            MergeStrategy::Aggressive => 2,
            MergeStrategy::Maximum => 3,
        } << 2;
        naming | order | merge
    }
}

impl fmt::Display for ReconcileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "naming={:?} order={:?} merge={}",
            self.naming, self.order, self.merge
        )
    }
}

/// 32-bit content hash used in cache keys.
#[must_use]
pub fn content_hash(document: &str) -> u32 {
    xxh32(document.as_bytes(), 0)
}

/// Snapshot of reconciliation cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Stored outputs
    pub entries: usize,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that had to reconcile
    pub misses: u64,
}

/// Output memo keyed by (content hash, packed options).
///
/// Append-only: the first output stored for a key is never replaced.
#[derive(Debug, Default)]
pub struct ReconciliationCache {
    entries: DashMap<u64, String>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ReconciliationCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for a document under `options`.
    #[must_use]
    pub fn key(document: &str, options: ReconcileOptions) -> u64 {
        (u64::from(content_hash(document)) << 8) | u64::from(options.pack())
    }

    /// Look up a stored output, counting the hit or miss.
    #[must_use]
    pub fn get(&self, key: u64) -> Option<String> {
        let hit = self.entries.get(&key).map(|r| r.value().clone());
        let counter = if hit.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        hit
    }

    /// Store an output unless one is already present; returns the stored output.
    pub fn insert(&self, key: u64, output: String) -> String {
        self.entries.entry(key).or_insert(output).value().clone()
    }

    /// Number of stored outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Drop all outputs and reset counters.
    pub fn clear(&self) {
        self.entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// Reconciliation context: name table, memo tables and output cache.
#[derive(Debug)]
pub struct Reconciler {
    merger: PropertyMerger,
    standardizer: NameStandardizer,
    cache: ReconciliationCache,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    /// Context over the built-in name table with the sticky merge memo.
    #[must_use]
    pub fn new() -> Self {
        Self::with_merge_cache_mode(MergeCacheMode::default())
    }

    /// Context over the built-in name table with an explicit merge memo policy.
    #[must_use]
    pub fn with_merge_cache_mode(mode: MergeCacheMode) -> Self {
        Self::with_table(CanonicalNameTable::builtin().clone(), mode)
    }

    /// Context over a custom name table.
    #[must_use]
    pub fn with_table(table: CanonicalNameTable, mode: MergeCacheMode) -> Self {
        let table = Arc::new(table);
        Self {
            merger: PropertyMerger::with_mode(Arc::clone(&table), mode),
            standardizer: NameStandardizer::new(table),
            cache: ReconciliationCache::new(),
        }
    }

    /// Process-wide shared context.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Reconcile a document's metadata into one merged, serialized block.
    ///
    /// Documents without (valid) metadata come back unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`FrontmatterError::TooManySections`] for documents with more
    /// than [`crate::MAX_SECTIONS`] stacked sections, or a serialization error.
    pub fn reconcile(
        &self,
        document: &str,
        options: ReconcileOptions,
    ) -> Result<String, FrontmatterError> {
        let key = ReconciliationCache::key(document, options);
        if let Some(hit) = self.cache.get(key) {
            debug!("Reconciliation cache hit ({key:#014x}, {options})");
            return Ok(hit);
        }
        debug!("Reconciliation cache miss ({key:#014x}, {options})");
        let output = self.reconcile_uncached(document, options)?;
        Ok(self.cache.insert(key, output))
    }

    fn reconcile_uncached(
        &self,
        document: &str,
        options: ReconcileOptions,
    ) -> Result<String, FrontmatterError> {
        let Some(extracted) = extract(document)? else {
            return Ok(document.to_string());
        };

        let mut properties = combine_all(&extracted.sections);
        if options.merge != MergeStrategy::None {
            properties = self.merger.merge(&properties, options.merge);
        }
        if options.naming == NamingMode::Standard {
            properties = self.standardizer.standardize(&properties);
        }
        if options.order == OrderMode::Sorted {
            properties = sort_properties(&properties);
        }
        assemble(&properties, extracted.body)
    }

    /// The property merger.
    #[must_use]
    pub fn merger(&self) -> &PropertyMerger {
        &self.merger
    }

    /// The name standardizer.
    #[must_use]
    pub fn standardizer(&self) -> &NameStandardizer {
        &self.standardizer
    }

    /// Output cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every memo table and cached output.
    pub fn clear_caches(&self) {
        self.merger.clear();
        self.standardizer.clear();
        self.cache.clear();
    }
}

/// Reconcile with the process-wide context.
///
/// # Errors
///
/// See [`Reconciler::reconcile`].
pub fn reconcile(
    document: &str,
    naming: NamingMode,
    order: OrderMode,
    merge: MergeStrategy,
) -> Result<String, FrontmatterError> {
    Reconciler::global().reconcile(document, ReconcileOptions::new(naming, order, merge))
}
