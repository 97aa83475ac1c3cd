//! An untyped YAML document tree with deep merge and sanitation.
//!
//! Manifests are decoded into typed [`k8s_openapi`] objects, but some operations only make sense
//! on the raw document: stripping server populated fields before writing a file back, or
//! combining configuration fragments. [`Value`] models such a document as a recursive tagged
//! value. Mappings are kept in a [`BTreeMap`], so serializing a [`Value`] always emits keys in
//! sorted order.
use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize, de, ser::SerializeMap};
use snafu::{ResultExt, Snafu};

/// Keys which are removed from every mapping by [`Value::sanitize`].
///
/// These fields are filled in by the API server and never belong in a manifest file.
pub const SANITIZED_KEYS: [&str; 3] = ["status", "creationTimestamp", "dataSource"];

/// The key which is removed by [`Value::sanitize`] when it holds an empty mapping.
pub const EMPTY_RESOURCES_KEY: &str = "resources";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read file {path:?}"))]
    ReadFile {
        source: std::io::Error,
        path: std::path::PathBuf,
    },

    #[snafu(display("failed to parse YAML from file {path:?}"))]
    ParseYaml {
        source: serde_yaml::Error,
        path: std::path::PathBuf,
    },

    #[snafu(display("failed to serialize document as YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("failed to serialize document as JSON"))]
    SerializeJson { source: serde_json::Error },

    #[snafu(display("mapping keys must be scalars, got a {found} key"))]
    UnsupportedKey { found: &'static str },
}

/// A mapping of string keys to document values, sorted by key.
pub type Mapping = BTreeMap<String, Value>;

/// A node of an untyped YAML document.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Mapping(Mapping),
    Sequence(Vec<Value>),
    Scalar(Scalar),
}

/// A leaf node of an untyped YAML document.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_yaml::Number),
    String(String),
}

impl Default for Value {
    fn default() -> Self {
        Self::Mapping(Mapping::new())
    }
}

impl Value {
    /// Returns the mapping if this value is one.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    /// Returns the string if this value is a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Looks up `key` if this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_mapping().and_then(|mapping| mapping.get(key))
    }

    fn is_empty_mapping(&self) -> bool {
        matches!(self, Self::Mapping(mapping) if mapping.is_empty())
    }

    /// Deep merges `from` into `self`. See [`merge`] for the exact semantics.
    pub fn merge(&mut self, from: &Self) {
        merge(self, from);
    }

    /// Removes fields which must not be persisted, at any depth.
    ///
    /// Every mapping loses the keys listed in [`SANITIZED_KEYS`] as well as a
    /// [`EMPTY_RESOURCES_KEY`] entry holding an empty mapping. Sequences are descended into
    /// element by element. Children are sanitized before the empty check, so a `resources`
    /// mapping which only contained removed keys is dropped in the same pass.
    pub fn sanitize(&mut self) {
        match self {
            Self::Mapping(mapping) => {
                for key in SANITIZED_KEYS {
                    mapping.remove(key);
                }
                mapping.values_mut().for_each(Self::sanitize);
                if mapping
                    .get(EMPTY_RESOURCES_KEY)
                    .is_some_and(Self::is_empty_mapping)
                {
                    mapping.remove(EMPTY_RESOURCES_KEY);
                }
            }
            Self::Sequence(sequence) => sequence.iter_mut().for_each(Self::sanitize),
            Self::Scalar(_) => {}
        }
    }

    /// Serializes the document as YAML with sorted mapping keys.
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context(SerializeYamlSnafu)
    }

    /// Serializes the document as pretty printed JSON with sorted mapping keys.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context(SerializeJsonSnafu)
    }
}

/// Deep merges `from` into `into`.
///
/// For every key of `from`: if both sides hold a mapping at that key, the two mappings are merged
/// recursively. Otherwise the value from `from` replaces whatever `into` held, which includes keys
/// missing in `into` as well as scalars and sequences on either side. Sequences are never merged
/// element wise.
///
/// If either argument is not a mapping, nothing happens.
///
/// ```
/// use kubegen::document::{Value, merge};
///
/// let mut into: Value = serde_yaml::from_str("{one: {two: foo}, keep: true}").unwrap();
/// let from: Value = serde_yaml::from_str("{one: {three: bar}}").unwrap();
/// merge(&mut into, &from);
///
/// let expected: Value = serde_yaml::from_str("{one: {two: foo, three: bar}, keep: true}").unwrap();
/// assert_eq!(into, expected);
/// ```
pub fn merge(into: &mut Value, from: &Value) {
    if let (Value::Mapping(into), Value::Mapping(from)) = (into, from) {
        merge_mappings(into, from);
    }
}

fn merge_mappings(into: &mut Mapping, from: &Mapping) {
    for (key, from_value) in from {
        if let (Some(Value::Mapping(into_child)), Value::Mapping(from_child)) =
            (into.get_mut(key), from_value)
        {
            merge_mappings(into_child, from_child);
            continue;
        }

        into.insert(key.clone(), from_value.clone());
    }
}

/// Reads a whole file into a [`String`].
pub fn read_string(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path).context(ReadFileSnafu { path })
}

/// Reads and parses a YAML document from a file.
pub fn read_yaml(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let contents = read_string(path)?;
    serde_yaml::from_str(&contents).context(ParseYamlSnafu { path })
}

impl TryFrom<serde_yaml::Value> for Value {
    type Error = Error;

    fn try_from(value: serde_yaml::Value) -> Result<Self> {
        Ok(match value {
            serde_yaml::Value::Null => Self::Scalar(Scalar::Null),
            serde_yaml::Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            serde_yaml::Value::Number(n) => Self::Scalar(Scalar::Number(n)),
            serde_yaml::Value::String(s) => Self::Scalar(Scalar::String(s)),
            serde_yaml::Value::Sequence(sequence) => Self::Sequence(
                sequence
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<_>>()?,
            ),
            serde_yaml::Value::Mapping(mapping) => Self::Mapping(
                mapping
                    .into_iter()
                    .map(|(key, value)| Ok((mapping_key(key)?, Self::try_from(value)?)))
                    .collect::<Result<_>>()?,
            ),
            // Manifests don't use custom tags, the tag itself is dropped
            serde_yaml::Value::Tagged(tagged) => Self::try_from(tagged.value)?,
        })
    }
}

/// Turns a YAML mapping key into its string form. Non string scalars use their plain YAML
/// representation, so `1: foo` ends up with the key `"1"`.
fn mapping_key(key: serde_yaml::Value) -> Result<String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Null => Ok("null".to_owned()),
        serde_yaml::Value::Sequence(_) => UnsupportedKeySnafu { found: "sequence" }.fail(),
        serde_yaml::Value::Mapping(_) => UnsupportedKeySnafu { found: "mapping" }.fail(),
        serde_yaml::Value::Tagged(tagged) => mapping_key(tagged.value),
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Mapping(mapping) => {
                let mut map = serializer.serialize_map(Some(mapping.len()))?;
                for (key, value) in mapping {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Self::Sequence(sequence) => serializer.collect_seq(sequence),
            Self::Scalar(scalar) => scalar.serialize(serializer),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_yaml::Value::deserialize(deserializer)?;
        Self::try_from(value).map_err(de::Error::custom)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Scalar(Scalar::String(value.to_owned()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Scalar(Scalar::String(value))
    }
}

impl From<Mapping> for Value {
    fn from(value: Mapping) -> Self {
        Self::Mapping(value)
    }
}
