//! Property mappings and dynamic value typing.
//!
//! Values are plain `serde_yaml::Value` trees. `Properties` is the string-keyed
//! top level of one metadata block: insertion order is retained so first-wins
//! policies and output order are reproducible, but equality ignores order.

use std::fmt;

use serde::de::{
    self, Deserialize, Deserializer, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor,
};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value};

use crate::error::FrontmatterError;

/// Variant tag of a dynamic value, used for type-homogeneity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `~` / empty scalar
    Null,
    /// `true` / `false`
    Bool,
    /// Integer or float
    Number,
    /// Plain or quoted string (dates included)
    String,
    /// Ordered sequence
    Sequence,
    /// Nested mapping
    Mapping,
    /// Explicitly tagged value (`!tag value`)
    Tagged,
}

impl ValueKind {
    /// Classify a value by its variant.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Sequence(_) => Self::Sequence,
            Value::Mapping(_) => Self::Mapping,
            Value::Tagged(_) => Self::Tagged,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool => write!(f, "bool"),
            Self::Number => write!(f, "number"),
            Self::String => write!(f, "string"),
            Self::Sequence => write!(f, "sequence"),
            Self::Mapping => write!(f, "mapping"),
            Self::Tagged => write!(f, "tagged"),
        }
    }
}

/// String-keyed property mapping of one metadata block.
///
/// Keys are unique. `insert` replaces a value in place (the key keeps its
/// original position); `insert_if_absent` implements first-wins.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    entries: Vec<(String, Value)>,
}

impl Properties {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty mapping with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Look up a value by exact key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.position(key).map(|idx| &self.entries[idx].1)
    }

    /// True when `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Insert or replace; returns the previous value if the key existed.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match self.position(&key) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Insert only if the key is not yet present. Returns true if inserted.
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if self.contains_key(&key) {
            return false;
        }
        self.entries.push((key, value));
        true
    }

    /// Remove a key, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.position(key).map(|idx| self.entries.remove(idx).1)
    }

    /// Iterate `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Convert a parsed YAML value into a property mapping.
    ///
    /// `Null` (an empty or comment-only block) becomes an empty mapping.
    /// Non-string scalar keys are rendered to text; if two keys render to
    /// the same text the first one is kept.
    ///
    /// # Errors
    ///
    /// Returns [`FrontmatterError::NotAMapping`] for any other top-level value.
    pub fn from_value(value: Value) -> Result<Self, FrontmatterError> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Mapping(mapping) => {
                let mut props = Self::with_capacity(mapping.len());
                for (key, value) in mapping {
                    props.insert_if_absent(key_to_string(&key), value);
                }
                Ok(props)
            }
            other => Err(FrontmatterError::NotAMapping(ValueKind::of(&other))),
        }
    }

    /// Convert into a nested YAML mapping value.
    #[must_use]
    pub fn into_value(self) -> Value {
        let mut mapping = Mapping::with_capacity(self.entries.len());
        for (key, value) in self.entries {
            mapping.insert(Value::String(key), value);
        }
        Value::Mapping(mapping)
    }
}

/// Render a mapping key as property-name text.
#[must_use]
pub fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

impl PartialEq for Properties {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|v| v == value))
    }
}

impl FromIterator<(String, Value)> for Properties {
    /// Later duplicates replace earlier values (the key keeps its first position).
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut props = Self::new();
        for (key, value) in iter {
            props.insert(key, value);
        }
        props
    }
}

impl IntoIterator for Properties {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Properties {
    type Item = (&'a str, &'a Value);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, Value)>,
        fn(&'a (String, Value)) -> (&'a str, &'a Value),
    >;

    fn into_iter(self) -> Self::IntoIter {
        fn split(entry: &(String, Value)) -> (&str, &Value) {
            (entry.0.as_str(), &entry.1)
        }
        self.entries
            .iter()
            .map(split as fn(&'a (String, Value)) -> (&'a str, &'a Value))
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Properties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let FirstWins(value) = FirstWins::deserialize(deserializer)?;
        Self::from_value(value).map_err(de::Error::custom)
    }
}

// ============================================================================
// First-wins decoding
// ============================================================================

/// A YAML value decoded so that the first declaration of a duplicated
/// mapping key is kept, at every nesting level.
///
/// `serde_yaml::Value` rejects duplicate keys outright.
pub(crate) struct FirstWins(pub(crate) Value);

impl<'de> Deserialize<'de> for FirstWins {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FirstWinsVisitor).map(FirstWins)
    }
}

struct FirstWinsVisitor;

impl<'de> Visitor<'de> for FirstWinsVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any YAML value")
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, i: i64) -> Result<Value, E> {
        Ok(Value::Number(i.into()))
    }

    fn visit_u64<E: de::Error>(self, u: u64) -> Result<Value, E> {
        Ok(Value::Number(u.into()))
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> Result<Value, E> {
        Ok(Value::Number(f.into()))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<Value, E> {
        Ok(Value::String(s.to_owned()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> Result<Value, E> {
        Ok(Value::String(s))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        FirstWins::deserialize(deserializer).map(|v| v.0)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(FirstWins(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut mapping = Mapping::new();
        while let Some(FirstWins(key)) = map.next_key()? {
            let FirstWins(value) = map.next_value()?;
            if !mapping.contains_key(&key) {
                mapping.insert(key, value);
            }
        }
        Ok(Value::Mapping(mapping))
    }

    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Value, A::Error> {
        let (tag, contents): (String, _) = data.variant()?;
        let FirstWins(value) = contents.newtype_variant()?;
        if tag.is_empty() {
            return Ok(value);
        }
        Ok(Value::Tagged(Box::new(TaggedValue {
            tag: Tag::new(tag),
            value,
        })))
    }
}
