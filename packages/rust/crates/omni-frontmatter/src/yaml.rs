//! YAML boundary: block text to `Properties` and back.
//!
//! Low-level scalar and collection syntax is delegated to `serde_yaml`.

use crate::error::FrontmatterError;
use crate::properties::{FirstWins, Properties};

/// Parse the inner text of one metadata block.
///
/// Empty and comment-only blocks yield an empty mapping. Duplicate keys keep
/// their first declaration.
///
/// # Errors
///
/// Returns [`FrontmatterError::Yaml`] for invalid YAML and
/// [`FrontmatterError::NotAMapping`] if the block is a scalar or sequence.
pub fn parse_block(text: &str) -> Result<Properties, FrontmatterError> {
    if text.trim().is_empty() {
        return Ok(Properties::new());
    }
    let FirstWins(value) = serde_yaml::from_str(text)?;
    Properties::from_value(value)
}

/// Serialize a property mapping to block text.
///
/// The output ends with a newline; an empty mapping serializes to an empty
/// string so that reassembly produces an empty block.
///
/// # Errors
///
/// Returns [`FrontmatterError::Yaml`] if a value cannot be represented.
pub fn serialize_properties(properties: &Properties) -> Result<String, FrontmatterError> {
    if properties.is_empty() {
        return Ok(String::new());
    }
    Ok(serde_yaml::to_string(properties)?)
}
