//! Property merging.
//!
//! Groups keys that denote the same property and keeps one value per group.
//! How far two differently named keys may be apart and still merge is set by
//! [`MergeStrategy`]:
//!
//! - `Conservative`: canonical name table only.
//! - `Aggressive`: also keys related to another key of the same mapping by
//!   normalized equality, normalized containment or a shared table category.
//! - `Maximum`: also keys sharing a word (or a word fragment) after
//!   normalization.
//!
//! Matches are links, not final assignments: every connected set of linked
//! keys becomes one group, so the result does not depend on which partner a
//! key happens to meet first.
//!
//! Resolutions are memoized. In [`MergeCacheMode::Sticky`] mode the memo is
//! keyed by the raw key alone, so the first resolution of a key is reused by
//! every later call regardless of strategy or sibling keys.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::names::{
    CanonicalNameTable, NameCategory, contains_either, normalize_key, word_overlap_score,
};
use crate::properties::{Properties, ValueKind};

/// Aggressiveness of key merging, in increasing order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Identity
    #[default]
    None,
    /// Canonical name table only
    Conservative,
    /// Table plus normalization heuristics gated on sibling keys
    Aggressive,
    /// Aggressive plus word-overlap scoring
    Maximum,
}

impl FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "conservative" => Ok(Self::Conservative),
            "aggressive" => Ok(Self::Aggressive),
            "maximum" | "max" => Ok(Self::Maximum),
            other => Err(format!("unknown merge strategy: {other}")),
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Conservative => write!(f, "conservative"),
            Self::Aggressive => write!(f, "aggressive"),
            Self::Maximum => write!(f, "maximum"),
        }
    }
}

/// Memo policy for key resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeCacheMode {
    /// Keyed by raw key only; first resolution sticks across calls.
    #[default]
    Sticky,
    /// Keyed by (strategy, full key list); resolution is a pure function of the call.
    Scoped,
}

type Scope = (MergeStrategy, Vec<String>);

/// Merges properties that denote the same concept.
#[derive(Debug)]
pub struct PropertyMerger {
    table: Arc<CanonicalNameTable>,
    mode: MergeCacheMode,
    sticky: DashMap<String, String>,
    scoped: DashMap<Scope, Vec<String>>,
}

impl Default for PropertyMerger {
    fn default() -> Self {
        Self::new(Arc::new(CanonicalNameTable::builtin().clone()))
    }
}

impl PropertyMerger {
    /// Create a merger over `table` with the sticky memo.
    #[must_use]
    pub fn new(table: Arc<CanonicalNameTable>) -> Self {
        Self::with_mode(table, MergeCacheMode::default())
    }

    /// Create a merger with an explicit memo policy.
    #[must_use]
    pub fn with_mode(table: Arc<CanonicalNameTable>, mode: MergeCacheMode) -> Self {
        Self {
            table,
            mode,
            sticky: DashMap::new(),
            scoped: DashMap::new(),
        }
    }

    /// Memo policy in use.
    #[must_use]
    pub fn mode(&self) -> MergeCacheMode {
        self.mode
    }

    /// Merge `properties` under `strategy`. `None` returns a copy.
    #[must_use]
    pub fn merge(&self, properties: &Properties, strategy: MergeStrategy) -> Properties {
        if strategy == MergeStrategy::None || properties.is_empty() {
            return properties.clone();
        }

        let entries: Vec<(&str, &Value)> = properties.iter().collect();
        let keys: Vec<&str> = entries.iter().map(|(k, _)| *k).collect();
        let targets = settle_targets(&keys, self.targets(&keys, strategy));

        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        for (idx, target) in targets.into_iter().enumerate() {
            match groups.iter_mut().find(|(t, _)| *t == target) {
                Some((_, members)) => members.push(idx),
                None => groups.push((target, vec![idx])),
            }
        }

        let mut merged = Properties::with_capacity(groups.len());
        for (target, members) in groups {
            let kind = ValueKind::of(entries[members[0]].1);
            if members.iter().any(|&i| ValueKind::of(entries[i].1) != kind) {
                debug!("Group '{target}' mixes value types, keeping keys unmerged");
                for &i in &members {
                    merged.insert_if_absent(entries[i].0, entries[i].1.clone());
                }
                continue;
            }

            let value = if kind == ValueKind::Sequence {
                Value::Sequence(union_sequences(members.iter().map(|&i| entries[i].1)))
            } else {
                entries[members[0]].1.clone()
            };
            if members.len() > 1 {
                let names: Vec<&str> = members.iter().map(|&i| entries[i].0).collect();
                debug!("Merged {names:?} into '{target}' ({strategy})");
            }
            merged.insert_if_absent(target, value);
        }
        merged
    }

    fn targets(&self, keys: &[&str], strategy: MergeStrategy) -> Vec<String> {
        match self.mode {
            MergeCacheMode::Sticky => {
                let mut grouped: Option<Vec<String>> = None;
                keys.iter()
                    .enumerate()
                    .map(|(idx, key)| {
                        if let Some(hit) = self.sticky.get(*key).map(|r| r.value().clone()) {
                            trace!("Merge memo hit: '{key}' -> '{hit}'");
                            return hit;
                        }
                        let resolved = grouped
                            .get_or_insert_with(|| self.group_targets(keys, strategy))[idx]
                            .clone();
                        self.sticky
                            .entry((*key).to_string())
                            .or_insert(resolved)
                            .value()
                            .clone()
                    })
                    .collect()
            }
            MergeCacheMode::Scoped => {
                let scope: Scope = (strategy, keys.iter().map(|k| (*k).to_string()).collect());
                if let Some(hit) = self.scoped.get(&scope).map(|r| r.value().clone()) {
                    return hit;
                }
                let resolved = self.group_targets(keys, strategy);
                self.scoped.entry(scope).or_insert(resolved).value().clone()
            }
        }
    }

    /// Grouping target for `key` among `keys`, without consulting the memo.
    ///
    /// `key` is added to the key set if it is not already part of it.
    #[must_use]
    pub fn resolve(&self, key: &str, strategy: MergeStrategy, keys: &[&str]) -> String {
        let mut scope: Vec<&str> = keys.to_vec();
        let idx = if let Some(idx) = scope.iter().position(|k| *k == key) {
            idx
        } else {
            scope.push(key);
            scope.len() - 1
        };
        self.group_targets(&scope, strategy).swap_remove(idx)
    }

    /// Target per key: keys are linked pairwise under `strategy` and every
    /// connected component becomes one group.
    ///
    /// A component is named by the first member with an exact table entry,
    /// else (for two or more members) the first member whose normalized form
    /// has one, else its earliest key.
    fn group_targets(&self, keys: &[&str], strategy: MergeStrategy) -> Vec<String> {
        if strategy == MergeStrategy::None {
            return keys.iter().map(|k| (*k).to_string()).collect();
        }

        let forms: Vec<KeyForms<'_>> = keys.iter().map(|key| self.forms(key)).collect();
        let mut sets = DisjointSets::new(keys.len());
        for i in 0..keys.len() {
            for j in (i + 1)..keys.len() {
                if linked(&forms[i], &forms[j], strategy) {
                    sets.union(i, j);
                }
            }
        }

        let roots: Vec<usize> = (0..keys.len()).map(|i| sets.find(i)).collect();
        let mut names: Vec<Option<String>> = vec![None; keys.len()];
        for (idx, &root) in roots.iter().enumerate() {
            if names[root].is_some() {
                continue;
            }
            let members: Vec<&KeyForms<'_>> = roots
                .iter()
                .enumerate()
                .filter(|(_, r)| **r == root)
                .map(|(i, _)| &forms[i])
                .collect();
            let name = members
                .iter()
                .find_map(|m| m.canonical)
                .or_else(|| {
                    (members.len() > 1)
                        .then(|| members.iter().find_map(|m| m.canonical_loose))
                        .flatten()
                })
                .unwrap_or(keys[idx]);
            names[root] = Some(name.to_string());
        }

        keys.iter()
            .zip(&roots)
            .map(|(key, &root)| {
                let target = names[root].clone().unwrap_or_else(|| (*key).to_string());
                trace!("Resolved '{key}' -> '{target}' ({strategy})");
                target
            })
            .collect()
    }

    fn forms<'a>(&'a self, key: &'a str) -> KeyForms<'a> {
        let canonical_loose = self.table.canonical_loose(key);
        let mut normalized = vec![normalize_key(key)];
        if let Some(name) = canonical_loose
            .map(normalize_key)
            .filter(|name| !normalized.contains(name))
        {
            normalized.push(name);
        }
        KeyForms {
            canonical: self.table.canonical(key),
            canonical_loose,
            category: self.table.category_loose(key),
            normalized,
        }
    }

    /// Number of memoized resolutions.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.sticky.len() + self.scoped.len()
    }

    /// Drop all memoized resolutions.
    pub fn clear(&self) {
        self.sticky.clear();
        self.scoped.clear();
    }
}

/// Lookup forms of one key. `normalized` holds the key's normalized form and,
/// when it differs, the normalized form of its table canonical.
struct KeyForms<'a> {
    canonical: Option<&'a str>,
    canonical_loose: Option<&'a str>,
    category: Option<NameCategory>,
    normalized: Vec<String>,
}

/// Whether two keys denote the same property under `strategy`.
fn linked(a: &KeyForms<'_>, b: &KeyForms<'_>, strategy: MergeStrategy) -> bool {
    let same_canonical = a.canonical.is_some() && a.canonical == b.canonical;
    match strategy {
        MergeStrategy::None => false,
        MergeStrategy::Conservative => same_canonical,
        MergeStrategy::Aggressive => same_canonical || related(a, b),
        MergeStrategy::Maximum => same_canonical || related(a, b) || overlapping(a, b),
    }
}

/// Normalized equality, normalized containment or a shared table category.
fn related(a: &KeyForms<'_>, b: &KeyForms<'_>) -> bool {
    if a.category.is_some() && a.category == b.category {
        return true;
    }
    a.normalized.iter().any(|x| {
        b.normalized
            .iter()
            .any(|y| x == y || contains_either(x, y))
    })
}

fn overlapping(a: &KeyForms<'_>, b: &KeyForms<'_>) -> bool {
    a.normalized
        .iter()
        .any(|x| b.normalized.iter().any(|y| word_overlap_score(x, y) > 0))
}

/// Union-find over key indices.
struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut idx: usize) -> usize {
        while self.parent[idx] != idx {
            self.parent[idx] = self.parent[self.parent[idx]];
            idx = self.parent[idx];
        }
        idx
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

/// Follow targets that are themselves keys of the mapping to their own target.
fn settle_targets(keys: &[&str], targets: Vec<String>) -> Vec<String> {
    targets
        .iter()
        .map(|target| {
            let mut current = target;
            for _ in 0..keys.len() {
                let Some(idx) = keys.iter().position(|k| *k == current) else {
                    break;
                };
                if targets[idx] == *current {
                    break;
                }
                current = &targets[idx];
            }
            current.clone()
        })
        .collect()
}

/// Union of sequences, first occurrence order, duplicates removed.
fn union_sequences<'a>(values: impl Iterator<Item = &'a Value>) -> Vec<Value> {
    let mut items: Vec<Value> = Vec::new();
    for value in values {
        if let Value::Sequence(seq) = value {
            for item in seq {
                if !items.contains(item) {
                    items.push(item.clone());
                }
            }
        }
    }
    items
}
