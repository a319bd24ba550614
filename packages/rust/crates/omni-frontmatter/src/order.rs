//! Standard property order.
//!
//! A fixed priority list of well-known names. Listed keys sort by list
//! position, ahead of every unlisted key.

use std::cmp::Ordering;

use crate::properties::Properties;

/// Priority order of well-known property names.
pub const STANDARD_ORDER: &[&str] = &[
    "title",
    "subtitle",
    "author",
    "date",
    "modified",
    "description",
    "tags",
    "categories",
    "layout",
    "permalink",
    "draft",
    "lang",
    "weight",
    "image",
];

/// Position of `name` in [`STANDARD_ORDER`] (ASCII case-insensitive).
#[must_use]
pub fn standard_index(name: &str) -> Option<usize> {
    STANDARD_ORDER
        .iter()
        .position(|entry| entry.eq_ignore_ascii_case(name))
}

/// Compare two property names by standard order.
///
/// Listed names compare by position and precede unlisted names; two unlisted
/// names compare ordinally.
#[must_use]
pub fn compare_names(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    match (standard_index(a), standard_index(b)) {
        (Some(ia), Some(ib)) => ia.cmp(&ib),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Reorder a mapping: listed keys in list order, then unlisted keys in their
/// original relative order.
#[must_use]
pub fn sort_properties(properties: &Properties) -> Properties {
    let mut sorted = Properties::with_capacity(properties.len());
    for entry in STANDARD_ORDER {
        for (key, value) in properties {
            if entry.eq_ignore_ascii_case(key) {
                sorted.insert(key, value.clone());
            }
        }
    }
    for (key, value) in properties {
        if standard_index(key).is_none() {
            sorted.insert(key, value.clone());
        }
    }
    sorted
}
