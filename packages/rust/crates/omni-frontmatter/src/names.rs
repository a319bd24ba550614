//! Canonical property names and key normalization.
//!
//! The built-in table maps known spellings of common frontmatter properties
//! onto one canonical name per category. It is validated on first use: a
//! variant claimed by two canonical names is a programming error.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::error::FrontmatterError;

/// Category of a canonical property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameCategory {
    /// Document title
    Title,
    /// Author(s)
    Author,
    /// Publication / creation date
    Date,
    /// Free-form tags and keywords
    Tags,
    /// Taxonomy categories
    Categories,
    /// Summary text
    Description,
    /// Last-modified date
    Modified,
    /// Rendering template
    Layout,
    /// Stable URL / slug
    Permalink,
}

impl fmt::Display for NameCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::Date => "date",
            Self::Tags => "tags",
            Self::Categories => "categories",
            Self::Description => "description",
            Self::Modified => "modified",
            Self::Layout => "layout",
            Self::Permalink => "permalink",
        };
        f.write_str(name)
    }
}

/// One category of the name table: canonical name plus accepted variants.
#[derive(Debug, Clone, Copy)]
pub struct NameGroup {
    /// Category
    pub category: NameCategory,
    /// Canonical spelling (also accepted as a variant of itself)
    pub canonical: &'static str,
    /// Alternative spellings, lower-case
    pub variants: &'static [&'static str],
}

/// Built-in variant groups.
pub const BUILTIN_NAME_GROUPS: &[NameGroup] = &[
    NameGroup {
        category: NameCategory::Title,
        canonical: "title",
        variants: &["name", "heading", "headline", "subject", "page_name"],
    },
    NameGroup {
        category: NameCategory::Author,
        canonical: "author",
        variants: &[
            "authors",
            "writer",
            "writers",
            "by",
            "creator",
            "written_by",
            "author_name",
            "posted_by",
        ],
    },
    NameGroup {
        category: NameCategory::Date,
        canonical: "date",
        variants: &[
            "published",
            "publish_date",
            "published_date",
            "published_at",
            "pubdate",
            "created",
            "created_at",
            "creation_date",
            "date_published",
            "post_date",
        ],
    },
    NameGroup {
        category: NameCategory::Tags,
        canonical: "tags",
        variants: &["tag", "keywords", "keyword", "labels", "label", "topics"],
    },
    NameGroup {
        category: NameCategory::Categories,
        canonical: "categories",
        variants: &["category", "section", "sections", "group", "groups"],
    },
    NameGroup {
        category: NameCategory::Description,
        canonical: "description",
        variants: &["summary", "excerpt", "abstract", "desc", "synopsis", "teaser"],
    },
    NameGroup {
        category: NameCategory::Modified,
        canonical: "modified",
        variants: &[
            "updated",
            "update",
            "last_modified",
            "lastmod",
            "last_updated",
            "updated_at",
            "modified_at",
            "modified_date",
            "date_modified",
            "update_date",
        ],
    },
    NameGroup {
        category: NameCategory::Layout,
        canonical: "layout",
        variants: &["template", "page_layout", "theme_layout"],
    },
    NameGroup {
        category: NameCategory::Permalink,
        canonical: "permalink",
        variants: &["slug", "url", "link", "uri", "path", "perma_link"],
    },
];

static BUILTIN: LazyLock<CanonicalNameTable> = LazyLock::new(|| {
    match CanonicalNameTable::from_groups(BUILTIN_NAME_GROUPS) {
        Ok(table) => table,
        Err(e) => panic!("built-in canonical name table is inconsistent: {e}"),
    }
});

#[derive(Debug, Clone)]
struct Entry {
    canonical: String,
    category: NameCategory,
}

/// Validated lookup table from name variants to canonical names.
#[derive(Debug, Clone)]
pub struct CanonicalNameTable {
    entries: HashMap<String, Entry>,
}

impl CanonicalNameTable {
    /// The built-in table.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Build a table from groups, checking that no variant is claimed twice.
    ///
    /// # Errors
    ///
    /// Returns [`FrontmatterError::ConflictingVariant`] when a variant (or a
    /// canonical name) would map to two different canonical names.
    pub fn from_groups(groups: &[NameGroup]) -> Result<Self, FrontmatterError> {
        let mut entries: HashMap<String, Entry> = HashMap::new();
        for group in groups {
            let names = std::iter::once(group.canonical).chain(group.variants.iter().copied());
            for name in names {
                let variant = name.to_lowercase();
                if let Some(existing) = entries.get(&variant) {
                    if existing.canonical != group.canonical {
                        return Err(FrontmatterError::ConflictingVariant {
                            variant,
                            first: existing.canonical.clone(),
                            second: group.canonical.to_string(),
                        });
                    }
                    continue;
                }
                entries.insert(
                    variant,
                    Entry {
                        canonical: group.canonical.to_string(),
                        category: group.category,
                    },
                );
            }
        }
        Ok(Self { entries })
    }

    fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key.trim().to_lowercase().as_str())
    }

    /// Canonical name for an exact (case-insensitive) variant.
    #[must_use]
    pub fn canonical(&self, key: &str) -> Option<&str> {
        self.entry(key).map(|e| e.canonical.as_str())
    }

    /// Category for an exact (case-insensitive) variant.
    #[must_use]
    pub fn category(&self, key: &str) -> Option<NameCategory> {
        self.entry(key).map(|e| e.category)
    }

    /// Canonical name for the key itself, or failing that its normalized form.
    #[must_use]
    pub fn canonical_loose(&self, key: &str) -> Option<&str> {
        self.canonical(key)
            .or_else(|| self.canonical(&normalize_key(key)))
    }

    /// Category for the key itself, or failing that its normalized form.
    #[must_use]
    pub fn category_loose(&self, key: &str) -> Option<NameCategory> {
        self.category(key)
            .or_else(|| self.category(&normalize_key(key)))
    }

    /// Number of registered spellings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Normalization and scoring
// ============================================================================

/// Prefixes stripped during normalization.
pub const STRIP_PREFIXES: &[&str] = &["page_", "post_", "meta_", "custom_", "user_", "site_"];

/// Suffixes stripped during normalization.
pub const STRIP_SUFFIXES: &[&str] = &["_value", "_text", "_data", "_info", "_meta", "_field"];

/// Shortest normalized form allowed to take part in a containment match.
pub const MIN_CONTAINMENT_LEN: usize = 3;

fn is_separator(c: char) -> bool {
    matches!(c, '_' | '-' | ' ' | '.')
}

/// Normalize a property key for fuzzy comparison.
///
/// Lower-cases, collapses runs of `_ - . space` into one `_`, then strips one
/// known prefix and one known suffix (never down to an empty string).
#[must_use]
pub fn normalize_key(key: &str) -> String {
    let mut collapsed = String::with_capacity(key.len());
    let mut pending_separator = false;
    for c in key.trim().chars().flat_map(char::to_lowercase) {
        if is_separator(c) {
            pending_separator = !collapsed.is_empty();
            continue;
        }
        if pending_separator {
            collapsed.push('_');
            pending_separator = false;
        }
        collapsed.push(c);
    }

    let mut normalized = collapsed.as_str();
    if let Some(rest) = STRIP_PREFIXES
        .iter()
        .find_map(|p| normalized.strip_prefix(p))
        .filter(|rest| !rest.is_empty())
    {
        normalized = rest;
    }
    if let Some(rest) = STRIP_SUFFIXES
        .iter()
        .find_map(|s| normalized.strip_suffix(s))
        .filter(|rest| !rest.is_empty())
    {
        normalized = rest;
    }
    normalized.to_string()
}

/// Words of a key's normalized form.
#[must_use]
pub fn key_words(key: &str) -> Vec<String> {
    normalize_key(key)
        .split('_')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// True if either normalized form contains the other (shorter side at least
/// [`MIN_CONTAINMENT_LEN`] characters).
#[must_use]
pub fn contains_either(a: &str, b: &str) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.chars().count() >= MIN_CONTAINMENT_LEN && long.contains(short)
}

/// Word-overlap score between two keys: +2 per identical word pair, +1 per
/// pair where one word contains the other.
#[must_use]
pub fn word_overlap_score(a: &str, b: &str) -> u32 {
    let left = key_words(a);
    let right = key_words(b);
    let mut score = 0;
    for lw in &left {
        for rw in &right {
            if lw == rw {
                score += 2;
            } else if lw.contains(rw.as_str()) || rw.contains(lw.as_str()) {
                score += 1;
            }
        }
    }
    score
}
