//! Omni-Frontmatter - YAML frontmatter reconciliation.
//!
//! Extracts one or more stacked YAML metadata blocks from a document, folds
//! them into one property set, merges differently named keys that denote the
//! same property, standardizes names, orders keys and serializes the result.
//!
//! # Architecture
//!
//! ```text
//! omni-frontmatter/src/
//! ├── lib.rs          # Main module and exports
//! ├── error.rs        # FrontmatterError
//! ├── properties.rs   # Properties, ValueKind, first-wins YAML decoding
//! ├── yaml.rs         # Block text <-> Properties (serde_yaml)
//! ├── extract.rs      # Block scanning, combination, document operations
//! ├── names.rs        # Canonical name table, key normalization, scoring
//! ├── order.rs        # Standard property order
//! ├── merge.rs        # PropertyMerger, MergeStrategy
//! ├── standardize.rs  # NameStandardizer
//! └── reconcile.rs    # Reconciler, options, output cache
//! ```
//!
//! # Pipeline
//!
//! ```text
//! document -> split blocks -> parse each -> combine (first wins)
//!          -> merge (strategy) -> standardize -> sort -> serialize -> cache
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use omni_frontmatter::{MergeStrategy, NamingMode, OrderMode, ReconcileOptions, Reconciler};
//!
//! let reconciler = Reconciler::new();
//! let options = ReconcileOptions::new(NamingMode::Standard, OrderMode::Sorted, MergeStrategy::Conservative);
//! let out = reconciler.reconcile("---\nwriter: Ann\ntitle: Notes\n---\nBody", options)?;
//! assert_eq!(out, "---\ntitle: Notes\nauthor: Ann\n---\nBody");
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

mod error;
pub mod extract;
pub mod merge;
pub mod names;
pub mod order;
pub mod properties;
pub mod reconcile;
pub mod standardize;
pub mod yaml;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use error::FrontmatterError;
pub use extract::{
    DELIMITER, MAX_SECTIONS, add_metadata, combine_all, combine_properties, extract_as,
    extract_body, extract_metadata, extract_sections, has_metadata, remove_metadata,
    replace_metadata,
};
pub use merge::{MergeCacheMode, MergeStrategy, PropertyMerger};
pub use names::{
    BUILTIN_NAME_GROUPS, CanonicalNameTable, NameCategory, NameGroup, key_words, normalize_key,
    word_overlap_score,
};
pub use order::{STANDARD_ORDER, compare_names, sort_properties};
pub use properties::{Properties, ValueKind};
pub use reconcile::{
    CacheStats, NamingMode, OrderMode, ReconcileOptions, ReconciliationCache, Reconciler,
    content_hash, reconcile,
};
pub use standardize::NameStandardizer;
pub use yaml::{parse_block, serialize_properties as serialize_mapping};

/// Re-export of the dynamic value type carried in [`Properties`].
pub use serde_yaml::Value;

// ============================================================================
// Version
// ============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
