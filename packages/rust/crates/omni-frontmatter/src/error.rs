//! Error types for frontmatter reconciliation.
//!
//! Follows ODF-REP: Library crates use `thiserror` for explicit error enums.

use thiserror::Error;

use crate::properties::ValueKind;

/// Error types for frontmatter extraction, merging and serialization.
#[derive(Error, Debug)]
pub enum FrontmatterError {
    /// The document declares more metadata sections than the extractor accepts.
    #[error("Too many sections: found more than {limit} (stopped at {found})")]
    TooManySections {
        /// Number of sections seen when scanning stopped
        found: usize,
        /// Configured ceiling
        limit: usize,
    },
    /// YAML parse or serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// A block parsed to something other than a mapping
    #[error("Block is not a mapping: top-level value is {0}")]
    NotAMapping(ValueKind),
    /// A name variant maps to two different canonical names
    #[error("Conflicting variant '{variant}': maps to both '{first}' and '{second}'")]
    ConflictingVariant {
        /// The variant spelling
        variant: String,
        /// Canonical name registered first
        first: String,
        /// Canonical name that contradicts it
        second: String,
    },
}
