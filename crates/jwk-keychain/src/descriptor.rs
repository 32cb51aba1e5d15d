//! Descriptor model
//!
//! A descriptor declares which keys a chain holds. It is a tree whose inner
//! nodes are named groups and whose leaves are [`LeafSpec`]s:
//!
//! ```json
//! { "token":    { "sig": { "alg": "RS256", "modulusLength": 2048 } },
//!   "id_token": { "sig": { "alg": "ES384" } } }
//! ```
//!
//! The shape is decided once, at parse time: an object with an `alg` member is a
//! leaf, any other object is a nested node, anything else is rejected.

use std::{collections::BTreeMap, str::FromStr};

use jwk_keychain_crypto::KeyUsage;
use serde::{Deserialize, Deserializer, Serialize, Serializer, ser::SerializeMap};
use serde_json::{Map, Value};

use crate::errors::{KeyChainError, Result};

/// Top level names used by the serialized KeyChain form
pub const RESERVED_NAMES: [&str; 2] = ["descriptor", "jwks"];

/// RSA public exponent, either as a number (`65537`) or big-endian bytes (`[1, 0, 1]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublicExponent {
    Number(u32),
    Bytes(Vec<u8>),
}

impl PublicExponent {
    /// Minimal big-endian encoding
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PublicExponent::Number(value) => {
                let bytes = value.to_be_bytes();
                let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
                bytes[first..].to_vec()
            }
            PublicExponent::Bytes(bytes) => bytes.clone(),
        }
    }
}

/// Parameters of a single key in the descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafSpec {
    pub alg: String,
    #[serde(rename = "modulusLength", default, skip_serializing_if = "Option::is_none")]
    pub modulus_length: Option<usize>,
    #[serde(rename = "publicExponent", default, skip_serializing_if = "Option::is_none")]
    pub public_exponent: Option<PublicExponent>,
    #[serde(rename = "namedCurve", default, skip_serializing_if = "Option::is_none")]
    pub named_curve: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usages: Option<Vec<KeyUsage>>,
    /// Members this crate doesn't interpret, kept so the descriptor serializes back unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LeafSpec {
    pub fn new(alg: &str) -> Self {
        LeafSpec {
            alg: alg.to_string(),
            modulus_length: None,
            public_exponent: None,
            named_curve: None,
            usages: None,
            extra: Map::new(),
        }
    }

    pub fn with_modulus_length(mut self, modulus_length: usize) -> Self {
        self.modulus_length = Some(modulus_length);
        self
    }

    pub fn with_public_exponent(mut self, public_exponent: PublicExponent) -> Self {
        self.public_exponent = Some(public_exponent);
        self
    }

    pub fn with_named_curve(mut self, named_curve: &str) -> Self {
        self.named_curve = Some(named_curve.to_string());
        self
    }

    pub fn with_usages(mut self, usages: &[KeyUsage]) -> Self {
        self.usages = Some(usages.to_vec());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorEntry {
    Leaf(LeafSpec),
    Node(Descriptor),
}

impl Serialize for DescriptorEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            DescriptorEntry::Leaf(leaf) => leaf.serialize(serializer),
            DescriptorEntry::Node(node) => node.serialize(serializer),
        }
    }
}

/// A named group of descriptor entries. Never mutated by the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Descriptor {
    entries: BTreeMap<String, DescriptorEntry>,
}

impl Descriptor {
    pub fn new() -> Self {
        Descriptor::default()
    }

    /// Parses a root descriptor, rejecting the reserved top level names
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(KeyChainError::invalid_descriptor(
                &["descriptor".to_string()],
                value,
            ));
        };

        if let Some(name) = RESERVED_NAMES.iter().find(|name| map.contains_key(**name)) {
            return Err(KeyChainError::invalid_descriptor(
                &[name.to_string()],
                &map[*name],
            ));
        }

        Descriptor::parse_node(&[], map)
    }

    fn parse_node(path: &[String], map: &Map<String, Value>) -> Result<Self> {
        let mut entries = BTreeMap::new();

        for (name, value) in map {
            let mut path = path.to_vec();
            path.push(name.clone());

            let entry = match value {
                Value::Object(child) => match child.get("alg") {
                    Some(Value::String(_)) => DescriptorEntry::Leaf(
                        serde_json::from_value(value.clone())
                            .map_err(|_| KeyChainError::invalid_descriptor(&path, value))?,
                    ),
                    Some(_) => return Err(KeyChainError::invalid_descriptor(&path, value)),
                    None => DescriptorEntry::Node(Descriptor::parse_node(&path, child)?),
                },
                _ => return Err(KeyChainError::invalid_descriptor(&path, value)),
            };

            entries.insert(name.clone(), entry);
        }

        Ok(Descriptor { entries })
    }

    pub fn with_leaf(mut self, name: &str, leaf: LeafSpec) -> Self {
        self.entries.insert(name.to_string(), DescriptorEntry::Leaf(leaf));
        self
    }

    pub fn with_node(mut self, name: &str, node: Descriptor) -> Self {
        self.entries.insert(name.to_string(), DescriptorEntry::Node(node));
        self
    }

    pub fn get(&self, name: &str) -> Option<&DescriptorEntry> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DescriptorEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of leaves in the whole tree
    pub fn leaf_count(&self) -> usize {
        self.entries
            .values()
            .map(|entry| match entry {
                DescriptorEntry::Leaf(_) => 1,
                DescriptorEntry::Node(node) => node.leaf_count(),
            })
            .sum()
    }
}

impl IntoIterator for Descriptor {
    type Item = (String, DescriptorEntry);
    type IntoIter = std::collections::btree_map::IntoIter<String, DescriptorEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromStr for Descriptor {
    type Err = KeyChainError;

    fn from_str(s: &str) -> Result<Self> {
        Descriptor::from_value(&serde_json::from_str(s)?)
    }
}

impl Serialize for Descriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, entry) in &self.entries {
            map.serialize_entry(name, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Descriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Descriptor::from_value(&value).map_err(serde::de::Error::custom)
    }
}
