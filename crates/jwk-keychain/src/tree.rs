//! Materialized key tree
//!
//! Mirrors the shape of a [`crate::Descriptor`]. Each leaf position holds either
//! a generated pair ([`KeyEntry`]) or, when restored from a hand written file, a
//! single JWK ([`JwkEntry`]).
//!
//! Live [`CryptoKey`] handles are only reachable through accessors. Serializing
//! a tree writes the JWKs and nothing else.

use std::collections::BTreeMap;

use jwk_keychain_crypto::{CryptoKey, JWK};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};
use serde_json::{Map, Value};

use crate::errors::{KeyChainError, Result};

/// Serializable view of a key pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPairJwks {
    #[serde(rename = "privateJwk")]
    pub private_jwk: JWK,
    #[serde(rename = "publicJwk")]
    pub public_jwk: JWK,
}

/// A key pair: both JWKs plus the handles once generated or imported
#[derive(Debug, Clone)]
pub struct KeyEntry {
    jwks: KeyPairJwks,
    private_key: Option<CryptoKey>,
    public_key: Option<CryptoKey>,
}

impl KeyEntry {
    pub fn new(jwks: KeyPairJwks, private_key: CryptoKey, public_key: CryptoKey) -> Self {
        KeyEntry {
            jwks,
            private_key: Some(private_key),
            public_key: Some(public_key),
        }
    }

    /// An entry read from serialized form, handles are attached on import
    pub fn detached(jwks: KeyPairJwks) -> Self {
        KeyEntry {
            jwks,
            private_key: None,
            public_key: None,
        }
    }

    pub fn private_jwk(&self) -> &JWK {
        &self.jwks.private_jwk
    }

    pub fn public_jwk(&self) -> &JWK {
        &self.jwks.public_jwk
    }

    pub fn private_key(&self) -> Option<&CryptoKey> {
        self.private_key.as_ref()
    }

    pub fn public_key(&self) -> Option<&CryptoKey> {
        self.public_key.as_ref()
    }

    /// The JWKs only, safe to serialize
    pub fn jwks(&self) -> &KeyPairJwks {
        &self.jwks
    }

    pub fn is_attached(&self) -> bool {
        self.private_key.is_some() && self.public_key.is_some()
    }

    pub(crate) fn attach(&mut self, private_key: Option<CryptoKey>, public_key: Option<CryptoKey>) {
        if self.private_key.is_none() {
            self.private_key = private_key;
        }
        if self.public_key.is_none() {
            self.public_key = public_key;
        }
    }
}

/// A single JWK at a leaf position
#[derive(Debug, Clone)]
pub struct JwkEntry {
    jwk: JWK,
    private_key: Option<CryptoKey>,
    public_key: Option<CryptoKey>,
}

impl JwkEntry {
    pub fn new(jwk: JWK) -> Self {
        JwkEntry {
            jwk,
            private_key: None,
            public_key: None,
        }
    }

    pub fn jwk(&self) -> &JWK {
        &self.jwk
    }

    pub fn private_key(&self) -> Option<&CryptoKey> {
        self.private_key.as_ref()
    }

    pub fn public_key(&self) -> Option<&CryptoKey> {
        self.public_key.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.private_key.is_some() || self.public_key.is_some()
    }

    pub(crate) fn attach_private(&mut self, key: CryptoKey) {
        self.private_key.get_or_insert(key);
    }

    pub(crate) fn attach_public(&mut self, key: CryptoKey) {
        self.public_key.get_or_insert(key);
    }
}

#[derive(Debug, Clone)]
pub enum KeyNode {
    Pair(KeyEntry),
    Single(JwkEntry),
    Branch(KeyTree),
}

impl KeyNode {
    /// Restore rules: `privateJwk`/`publicJwk` is a pair, `alg` is a single JWK,
    /// any other object is a branch.
    pub fn from_value(path: &[String], value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(KeyChainError::invalid_descriptor(path, value));
        };

        if map.contains_key("privateJwk") || map.contains_key("publicJwk") {
            let jwks: KeyPairJwks = serde_json::from_value(value.clone())
                .map_err(|_| KeyChainError::invalid_descriptor(path, value))?;
            Ok(KeyNode::Pair(KeyEntry::detached(jwks)))
        } else if map.contains_key("alg") {
            Ok(KeyNode::Single(JwkEntry::new(serde_json::from_value(value.clone())?)))
        } else {
            Ok(KeyNode::Branch(KeyTree::from_map(path, map)?))
        }
    }
}

impl Serialize for KeyNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            KeyNode::Pair(entry) => entry.jwks.serialize(serializer),
            KeyNode::Single(entry) => entry.jwk.serialize(serializer),
            KeyNode::Branch(tree) => tree.serialize(serializer),
        }
    }
}

/// Named key nodes, one level of the tree
#[derive(Debug, Clone, Default)]
pub struct KeyTree {
    nodes: BTreeMap<String, KeyNode>,
}

impl KeyTree {
    pub fn new() -> Self {
        KeyTree::default()
    }

    pub(crate) fn from_map(path: &[String], map: &Map<String, Value>) -> Result<Self> {
        let mut nodes = BTreeMap::new();
        for (name, value) in map {
            let mut path = path.to_vec();
            path.push(name.clone());
            nodes.insert(name.clone(), KeyNode::from_value(&path, value)?);
        }
        Ok(KeyTree { nodes })
    }

    pub fn insert(&mut self, name: String, node: KeyNode) {
        self.nodes.insert(name, node);
    }

    pub fn get(&self, name: &str) -> Option<&KeyNode> {
        self.nodes.get(name)
    }

    /// Follows `path` through nested branches
    pub fn get_path(&self, path: &[&str]) -> Option<&KeyNode> {
        let (last, branches) = path.split_last()?;
        let mut tree = self;
        for name in branches {
            match tree.nodes.get(*name)? {
                KeyNode::Branch(next) => tree = next,
                _ => return None,
            }
        }
        tree.nodes.get(*last)
    }

    /// Key pair at `path`, if that position holds one
    pub fn entry(&self, path: &[&str]) -> Option<&KeyEntry> {
        match self.get_path(path)? {
            KeyNode::Pair(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &KeyNode)> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Public JWKs of every pair, plus single JWKs without private members
    pub fn public_jwks(&self) -> Vec<JWK> {
        let mut jwks = Vec::new();
        self.collect_public(&mut jwks);
        jwks
    }

    fn collect_public(&self, jwks: &mut Vec<JWK>) {
        for node in self.nodes.values() {
            match node {
                KeyNode::Pair(entry) => jwks.push(entry.public_jwk().to_public()),
                KeyNode::Single(entry) if !entry.jwk().is_private() => {
                    jwks.push(entry.jwk().clone())
                }
                KeyNode::Single(_) => {}
                KeyNode::Branch(tree) => tree.collect_public(jwks),
            }
        }
    }
}

impl FromIterator<(String, KeyNode)> for KeyTree {
    fn from_iter<I: IntoIterator<Item = (String, KeyNode)>>(iter: I) -> Self {
        KeyTree {
            nodes: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for KeyTree {
    type Item = (String, KeyNode);
    type IntoIter = std::collections::btree_map::IntoIter<String, KeyNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl Serialize for KeyTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.nodes.len()))?;
        for (name, node) in &self.nodes {
            map.serialize_entry(name, node)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ec_jwk(kid: &str, d: Option<&str>) -> Value {
        let mut jwk = json!({ "kty": "EC", "kid": kid, "alg": "ES256", "crv": "P-256", "x": "x", "y": "y" });
        if let Some(d) = d {
            jwk["d"] = json!(d);
        }
        jwk
    }

    #[test]
    fn restore_shapes() {
        let value = json!({
            "token": {
                "sig": { "privateJwk": ec_jwk("a", Some("d")), "publicJwk": ec_jwk("b", None) }
            },
            "legacy": ec_jwk("c", None),
            "empty": {}
        });
        let Value::Object(map) = &value else { unreachable!() };

        let tree = KeyTree::from_map(&[], map).unwrap();
        assert!(matches!(tree.get("legacy"), Some(KeyNode::Single(_))));
        assert!(matches!(tree.get("empty"), Some(KeyNode::Branch(t)) if t.is_empty()));

        let entry = tree.entry(&["token", "sig"]).unwrap();
        assert_eq!(entry.private_jwk().key_id.as_deref(), Some("a"));
        assert!(!entry.is_attached());

        let kids: Vec<_> = tree
            .public_jwks()
            .into_iter()
            .filter_map(|jwk| jwk.key_id)
            .collect();
        assert_eq!(kids, vec!["c", "b"]);
    }

    #[test]
    fn restore_rejects_non_objects() {
        let value = json!({ "token": { "sig": "nope" } });
        let Value::Object(map) = &value else { unreachable!() };

        let err = KeyTree::from_map(&[], map).unwrap_err();
        assert!(matches!(err, KeyChainError::InvalidDescriptor { path, .. } if path == "token.sig"));
    }

    #[test]
    fn half_pair_is_invalid() {
        let value = json!({ "token": { "sig": { "privateJwk": ec_jwk("a", Some("d")) } } });
        let Value::Object(map) = &value else { unreachable!() };

        let err = KeyTree::from_map(&[], map).unwrap_err();
        assert!(matches!(err, KeyChainError::InvalidDescriptor { path, .. } if path == "token.sig"));
    }

    #[test]
    fn serializes_jwks_only() {
        let value = json!({
            "sig": { "privateJwk": ec_jwk("a", Some("d")), "publicJwk": ec_jwk("b", None) }
        });
        let Value::Object(map) = &value else { unreachable!() };
        let tree = KeyTree::from_map(&[], map).unwrap();

        assert_eq!(serde_json::to_value(&tree).unwrap(), value);
    }

    #[test]
    fn get_path_stops_at_leaves() {
        let value = json!({ "legacy": ec_jwk("c", None) });
        let Value::Object(map) = &value else { unreachable!() };
        let tree = KeyTree::from_map(&[], map).unwrap();

        assert!(tree.get_path(&["legacy"]).is_some());
        assert!(tree.get_path(&["legacy", "deeper"]).is_none());
        assert!(tree.get_path(&[]).is_none());
        assert!(tree.entry(&["legacy"]).is_none());
    }
}
