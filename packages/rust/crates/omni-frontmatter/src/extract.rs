//! Metadata block extraction and combination.
//!
//! A document carries metadata iff it starts with `---` followed by a line
//! break. Blocks may be stacked back to back:
//!
//! ```text
//! ---
//! title: A
//! ---
//! ---
//! tags: [x]
//! ---
//! # Body
//! ```
//!
//! Every block is parsed on its own and the results are folded left to
//! right with first-occurrence-wins semantics. If any block fails to parse
//! the document is treated as having no metadata at all.

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

use crate::error::FrontmatterError;
use crate::properties::Properties;
use crate::yaml::{parse_block, serialize_properties};

/// Block delimiter marker; must sit on its own line.
pub const DELIMITER: &str = "---";

/// Maximum number of stacked metadata sections accepted in one document.
pub const MAX_SECTIONS: usize = 100;

/// Raw split of a document: block texts in order plus the remaining body.
#[derive(Debug)]
pub(crate) struct RawSections<'a> {
    pub blocks: Vec<&'a str>,
    pub body: &'a str,
}

/// Parsed sections plus the remaining body.
#[derive(Debug)]
pub(crate) struct Extracted<'a> {
    pub sections: Vec<Properties>,
    pub body: &'a str,
}

/// True iff the document begins exactly with the delimiter and a line break.
#[must_use]
pub fn has_metadata(document: &str) -> bool {
    document
        .strip_prefix(DELIMITER)
        .is_some_and(|rest| rest.starts_with('\n') || rest.starts_with("\r\n"))
}

fn is_delimiter_line(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

/// Line starting at `start` (terminator excluded) and the offset of the next line.
fn line_at(text: &str, start: usize) -> Option<(&str, usize)> {
    if start >= text.len() {
        return None;
    }
    let rest = &text[start..];
    Some(match rest.find('\n') {
        Some(rel) => (&rest[..rel], start + rel + 1),
        None => (rest, text.len()),
    })
}

/// Split a document into raw block texts and body.
///
/// Returns `Ok(None)` when the document has no closed leading block.
pub(crate) fn split_sections(
    document: &str,
) -> Result<Option<RawSections<'_>>, FrontmatterError> {
    if !has_metadata(document) {
        return Ok(None);
    }

    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some((opening, content_start)) = line_at(document, cursor) {
        if !is_delimiter_line(opening) {
            break;
        }

        let mut pos = content_start;
        let mut closing = None;
        while let Some((line, next)) = line_at(document, pos) {
            if is_delimiter_line(line) {
                closing = Some((pos, next));
                break;
            }
            pos = next;
        }
        let Some((close_start, after_close)) = closing else {
            break;
        };

        if blocks.len() == MAX_SECTIONS {
            warn!("Document declares more than {MAX_SECTIONS} metadata sections");
            return Err(FrontmatterError::TooManySections {
                found: blocks.len() + 1,
                limit: MAX_SECTIONS,
            });
        }
        blocks.push(&document[content_start..close_start]);
        cursor = after_close;
    }

    if blocks.is_empty() {
        return Ok(None);
    }
    Ok(Some(RawSections {
        blocks,
        body: &document[cursor..],
    }))
}

/// Split and parse. `Ok(None)` covers both "no metadata" and "a block failed to parse".
pub(crate) fn extract(document: &str) -> Result<Option<Extracted<'_>>, FrontmatterError> {
    let Some(raw) = split_sections(document)? else {
        return Ok(None);
    };

    let mut sections = Vec::with_capacity(raw.blocks.len());
    for (idx, block) in raw.blocks.iter().enumerate() {
        match parse_block(block) {
            Ok(props) => sections.push(props),
            Err(e) => {
                warn!(
                    "Metadata section {} of {} failed to parse, treating document as plain text: {e}",
                    idx + 1,
                    raw.blocks.len()
                );
                return Ok(None);
            }
        }
    }
    debug!("Extracted {} metadata section(s)", sections.len());

    Ok(Some(Extracted {
        sections,
        body: raw.body,
    }))
}

/// Parse every metadata section individually, in document order.
///
/// # Errors
///
/// Returns [`FrontmatterError::TooManySections`] above [`MAX_SECTIONS`].
pub fn extract_sections(document: &str) -> Result<Option<Vec<Properties>>, FrontmatterError> {
    Ok(extract(document)?.map(|e| e.sections))
}

/// Combined metadata of all sections, or `None` if there is none (or it is malformed).
///
/// # Errors
///
/// Returns [`FrontmatterError::TooManySections`] above [`MAX_SECTIONS`].
pub fn extract_metadata(document: &str) -> Result<Option<Properties>, FrontmatterError> {
    Ok(extract(document)?.map(|e| combine_all(&e.sections)))
}

/// Deserialize the combined metadata into a typed struct.
///
/// A mapping that does not fit `T` yields `Ok(None)`.
///
/// # Errors
///
/// Returns [`FrontmatterError::TooManySections`] above [`MAX_SECTIONS`].
pub fn extract_as<T: DeserializeOwned>(document: &str) -> Result<Option<T>, FrontmatterError> {
    let Some(metadata) = extract_metadata(document)? else {
        return Ok(None);
    };
    Ok(serde_yaml::from_value(metadata.into_value()).ok())
}

/// Document text after the metadata sections; the whole document if there are none.
///
/// # Errors
///
/// Returns [`FrontmatterError::TooManySections`] above [`MAX_SECTIONS`].
pub fn extract_body(document: &str) -> Result<String, FrontmatterError> {
    Ok(extract(document)?.map_or(document, |e| e.body).to_string())
}

/// Add properties to a document.
///
/// Existing metadata is combined with `properties` (existing values win,
/// lists are unioned) into a single block. A document without metadata gets
/// a new block. An empty mapping leaves the document unchanged.
///
/// # Errors
///
/// Returns [`FrontmatterError::TooManySections`] or a serialization error.
pub fn add_metadata(document: &str, properties: &Properties) -> Result<String, FrontmatterError> {
    if properties.is_empty() {
        return Ok(document.to_string());
    }
    match extract(document)? {
        Some(existing) => {
            let combined = combine_properties(&combine_all(&existing.sections), properties);
            assemble(&combined, existing.body)
        }
        None => assemble(properties, document),
    }
}

/// Replace all metadata with `properties`; `None` or empty removes it.
///
/// # Errors
///
/// Returns [`FrontmatterError::TooManySections`] or a serialization error.
pub fn replace_metadata(
    document: &str,
    properties: Option<&Properties>,
) -> Result<String, FrontmatterError> {
    match properties {
        Some(props) if !props.is_empty() => {
            let body = extract(document)?.map_or(document, |e| e.body);
            assemble(props, body)
        }
        _ => remove_metadata(document),
    }
}

/// Strip all metadata sections, leaving the body.
///
/// # Errors
///
/// Returns [`FrontmatterError::TooManySections`] above [`MAX_SECTIONS`].
pub fn remove_metadata(document: &str) -> Result<String, FrontmatterError> {
    extract_body(document)
}

/// Render one metadata block followed by `body`.
pub(crate) fn assemble(properties: &Properties, body: &str) -> Result<String, FrontmatterError> {
    let yaml = serialize_properties(properties)?;
    Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n{body}"))
}

// ============================================================================
// Combination
// ============================================================================

/// Fold `right` into `left`.
///
/// Keys only on one side are copied. Keys on both sides: nested mappings
/// recurse, sequences are unioned (left order first), anything else keeps
/// the left value, including when the two types differ.
#[must_use]
pub fn combine_properties(left: &Properties, right: &Properties) -> Properties {
    let mut combined = Properties::with_capacity(left.len() + right.len());
    for (key, value) in left {
        let merged = match right.get(key) {
            Some(other) => combine_values(value, other),
            None => value.clone(),
        };
        combined.insert(key, merged);
    }
    for (key, value) in right {
        combined.insert_if_absent(key, value.clone());
    }
    combined
}

/// Fold all sections left to right. An empty slice yields an empty mapping.
#[must_use]
pub fn combine_all(sections: &[Properties]) -> Properties {
    let mut iter = sections.iter();
    let Some(first) = iter.next() else {
        return Properties::new();
    };
    iter.fold(first.clone(), |acc, next| combine_properties(&acc, next))
}

fn combine_values(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Mapping(l), Value::Mapping(r)) => Value::Mapping(combine_mappings(l, r)),
        (Value::Sequence(l), Value::Sequence(r)) => {
            let mut items = l.clone();
            for item in r {
                if !items.contains(item) {
                    items.push(item.clone());
                }
            }
            Value::Sequence(items)
        }
        _ => left.clone(),
    }
}

fn combine_mappings(left: &Mapping, right: &Mapping) -> Mapping {
    let mut combined = Mapping::with_capacity(left.len() + right.len());
    for (key, value) in left {
        let merged = match right.get(key) {
            Some(other) => combine_values(value, other),
            None => value.clone(),
        };
        combined.insert(key.clone(), merged);
    }
    for (key, value) in right {
        if !combined.contains_key(key) {
            combined.insert(key.clone(), value.clone());
        }
    }
    combined
}
