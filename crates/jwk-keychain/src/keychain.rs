//! KeyChain engine
//!
//! Walks a [`Descriptor`] and materializes it into a [`KeyTree`] of the same
//! shape, keeping a JWK Set of the public keys alongside. Every sibling at a
//! level is spawned as its own task before any of them is awaited; the level
//! fails with the first error while the remaining siblings run to completion
//! in the background.
//!
//! Lifecycle:
//! ```text
//! Empty --rotate--> Materializing --> Ready --rotate--> Materializing --> Ready
//! Empty --import_keys--> Importing --> Ready
//! any failure --> Failed (terminal)
//! ```

use std::{fmt, sync::Arc};

use futures_util::future::{BoxFuture, try_join_all};
use jwk_keychain_crypto::{CryptoKey, JWK, JwkSet, KeyType};
use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::{Map, Value};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    KeyChainConfig,
    descriptor::{Descriptor, DescriptorEntry, LeafSpec, RESERVED_NAMES},
    errors::{KeyChainError, Result},
    registry::Operation,
    strategy::StrategyParams,
    tree::{KeyEntry, KeyNode, KeyTree},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyChainState {
    Empty,
    Materializing,
    Importing,
    Ready,
    Failed,
}

impl fmt::Display for KeyChainState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KeyChainState::Empty => write!(f, "empty"),
            KeyChainState::Materializing => write!(f, "materializing"),
            KeyChainState::Importing => write!(f, "importing"),
            KeyChainState::Ready => write!(f, "ready"),
            KeyChainState::Failed => write!(f, "failed"),
        }
    }
}

type SharedJwks = Arc<Mutex<Vec<JWK>>>;

/// A descriptor together with the keys materialized from it
#[derive(Debug)]
pub struct KeyChain {
    descriptor: Descriptor,
    keys: KeyTree,
    jwks: JwkSet,
    jwk_set: Option<String>,
    state: KeyChainState,
    config: KeyChainConfig,
}

impl KeyChain {
    /// An empty chain, call [`KeyChain::rotate`] to generate its keys
    pub fn new(descriptor: Descriptor, config: KeyChainConfig) -> Self {
        KeyChain {
            descriptor,
            keys: KeyTree::new(),
            jwks: JwkSet::default(),
            jwk_set: None,
            state: KeyChainState::Empty,
            config,
        }
    }

    /// Creates a chain and generates every key in `descriptor`
    pub async fn generate(descriptor: Descriptor, config: KeyChainConfig) -> Result<Self> {
        let mut chain = KeyChain::new(descriptor, config);
        chain.rotate().await?;
        Ok(chain)
    }

    /// Generates the key pair for a single leaf
    pub async fn generate_key(leaf: &LeafSpec, config: &KeyChainConfig) -> Result<KeyEntry> {
        let constructor = config.registry.resolve(Operation::GenerateKey, &leaf.alg)?;
        let strategy = constructor(StrategyParams::from_leaf(leaf, config))?;

        strategy.generate_key().await
    }

    /// Loads a serialized chain (`{ descriptor, <keys>, jwks }`) without importing
    /// any key handles. A missing `jwks` is rebuilt from the public keys in the tree.
    pub fn from_serialized(data: &Value, config: KeyChainConfig) -> Result<Self> {
        let Value::Object(map) = data else {
            return Err(KeyChainError::invalid_descriptor(&[], data));
        };

        let descriptor = Descriptor::from_value(map.get("descriptor").unwrap_or(&Value::Null))?;

        let entries: Map<String, Value> = map
            .iter()
            .filter(|(name, _)| !RESERVED_NAMES.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let keys = KeyTree::from_map(&[], &entries)?;

        let jwks = match map.get("jwks") {
            Some(jwks) => {
                let loaded: JwkSet = serde_json::from_value(jwks.clone())?;
                JwkSet {
                    keys: loaded.keys.iter().map(JWK::to_public).collect(),
                }
            }
            None => {
                debug!("No jwks in serialized KeyChain, rebuilding from keys");
                JwkSet {
                    keys: keys.public_jwks(),
                }
            }
        };

        Ok(KeyChain {
            descriptor,
            keys,
            jwks,
            jwk_set: None,
            state: KeyChainState::Empty,
            config,
        })
    }

    /// [`KeyChain::from_serialized`] from a JSON string
    pub fn from_json(data: &str, config: KeyChainConfig) -> Result<Self> {
        KeyChain::from_serialized(&serde_json::from_str(data)?, config)
    }

    /// Loads a serialized chain and imports every key handle
    pub async fn restore(data: &Value, config: KeyChainConfig) -> Result<Self> {
        let mut chain = KeyChain::from_serialized(data, config)?;
        chain.import_keys().await?;
        Ok(chain)
    }

    /// Regenerates every key in the descriptor and republishes the JWK Set
    pub async fn rotate(&mut self) -> Result<&mut Self> {
        self.check_state("rotate")?;
        debug!(
            "Rotating {} keys ({})",
            self.descriptor.leaf_count(),
            self.state
        );
        self.state = KeyChainState::Materializing;

        let jwks: SharedJwks = Arc::new(Mutex::new(Vec::new()));
        let keys = match materialize(
            self.descriptor.clone(),
            Vec::new(),
            self.config.clone(),
            jwks.clone(),
        )
        .await
        {
            Ok(keys) => keys,
            Err(e) => return Err(self.fail(e)),
        };

        self.keys = keys;
        self.jwks = JwkSet {
            keys: std::mem::take(&mut *jwks.lock().await),
        };
        self.publish()?;
        Ok(self)
    }

    /// Attaches key handles to every JWK in the tree.
    /// A chain that is already `Ready` is left untouched and no provider calls are made.
    pub async fn import_keys(&mut self) -> Result<&mut Self> {
        if self.state == KeyChainState::Ready {
            debug!("Keys already imported");
            return Ok(self);
        }
        self.check_state("import keys")?;
        self.state = KeyChainState::Importing;

        let keys = std::mem::take(&mut self.keys);
        match import_tree(keys, Vec::new(), self.config.clone()).await {
            Ok(keys) => self.keys = keys,
            Err(e) => return Err(self.fail(e)),
        }

        self.publish()?;
        Ok(self)
    }

    pub fn state(&self) -> KeyChainState {
        self.state
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn keys(&self) -> &KeyTree {
        &self.keys
    }

    /// Key pair at `path`, e.g. `&["token", "sig"]`
    pub fn entry(&self, path: &[&str]) -> Option<&KeyEntry> {
        self.keys.entry(path)
    }

    /// Published public keys
    pub fn jwks(&self) -> &JwkSet {
        &self.jwks
    }

    /// Cached JSON serialization of [`KeyChain::jwks`], set once the chain is ready
    pub fn jwk_set(&self) -> Option<&str> {
        self.jwk_set.as_deref()
    }

    pub fn config(&self) -> &KeyChainConfig {
        &self.config
    }

    fn check_state(&self, operation: &str) -> Result<()> {
        match self.state {
            KeyChainState::Empty | KeyChainState::Ready => Ok(()),
            state => Err(KeyChainError::InvalidState(format!(
                "Can't {operation} a KeyChain that is {state}"
            ))),
        }
    }

    /// Caches the JWK Set and marks the chain ready
    fn publish(&mut self) -> Result<()> {
        match serde_json::to_string(&self.jwks) {
            Ok(jwk_set) => {
                self.jwk_set = Some(jwk_set);
                self.state = KeyChainState::Ready;
                debug!("KeyChain ready, publishing {} keys", self.jwks.keys.len());
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    fn fail(&mut self, error: KeyChainError) -> KeyChainError {
        warn!("KeyChain {} failed: {error}", self.state);
        self.state = KeyChainState::Failed;
        self.keys = KeyTree::new();
        self.jwks = JwkSet::default();
        self.jwk_set = None;
        error
    }
}

/// Serializes as `{ descriptor, <keys>, jwks }`, key handles are never written
impl Serialize for KeyChain {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.keys.len() + 2))?;
        map.serialize_entry("descriptor", &self.descriptor)?;
        for (name, node) in self.keys.iter() {
            map.serialize_entry(name, node)?;
        }
        map.serialize_entry("jwks", &self.jwks)?;
        map.end()
    }
}

async fn join<T>(handle: JoinHandle<Result<T>>) -> Result<T> {
    handle
        .await
        .map_err(|e| KeyChainError::Task(e.to_string()))?
}

fn materialize(
    descriptor: Descriptor,
    path: Vec<String>,
    config: KeyChainConfig,
    jwks: SharedJwks,
) -> BoxFuture<'static, Result<KeyTree>> {
    Box::pin(async move {
        let handles: Vec<JoinHandle<Result<(String, KeyNode)>>> = descriptor
            .into_iter()
            .map(|(name, entry)| {
                let mut path = path.clone();
                path.push(name.clone());
                let config = config.clone();
                let jwks = jwks.clone();

                tokio::spawn(async move {
                    let node = match entry {
                        DescriptorEntry::Leaf(leaf) => {
                            debug!("Generating {} key at {}", leaf.alg, path.join("."));
                            let entry = KeyChain::generate_key(&leaf, &config).await?;
                            jwks.lock().await.push(entry.public_jwk().to_public());
                            KeyNode::Pair(entry)
                        }
                        DescriptorEntry::Node(node) => {
                            KeyNode::Branch(materialize(node, path, config, jwks).await?)
                        }
                    };
                    Ok::<_, KeyChainError>((name, node))
                })
            })
            .collect();

        Ok(try_join_all(handles.into_iter().map(join))
            .await?
            .into_iter()
            .collect())
    })
}

async fn import_jwk(jwk: &JWK, config: &KeyChainConfig) -> Result<CryptoKey> {
    let params = StrategyParams::from_jwk(jwk, config)?;
    let constructor = config.registry.resolve(Operation::ImportKey, &params.alg)?;
    let strategy = constructor(params)?;

    strategy.import_key(jwk).await
}

fn import_tree(
    keys: KeyTree,
    path: Vec<String>,
    config: KeyChainConfig,
) -> BoxFuture<'static, Result<KeyTree>> {
    Box::pin(async move {
        let handles: Vec<JoinHandle<Result<(String, KeyNode)>>> = keys
            .into_iter()
            .map(|(name, node)| {
                let mut path = path.clone();
                path.push(name.clone());
                let config = config.clone();

                tokio::spawn(async move {
                    let node = match node {
                        KeyNode::Pair(mut entry) => {
                            if !entry.is_attached() {
                                debug!("Importing key pair at {}", path.join("."));
                                let (private_key, public_key) = tokio::try_join!(
                                    import_jwk(entry.private_jwk(), &config),
                                    import_jwk(entry.public_jwk(), &config)
                                )?;
                                if private_key.key_type() != KeyType::Private
                                    || public_key.key_type() != KeyType::Public
                                {
                                    return Err(KeyChainError::UnsupportedAlgorithmParameters(
                                        format!(
                                            "{} imported as a {} / {} key pair",
                                            path.join("."),
                                            private_key.key_type(),
                                            public_key.key_type()
                                        ),
                                    ));
                                }
                                entry.attach(Some(private_key), Some(public_key));
                            }
                            KeyNode::Pair(entry)
                        }
                        KeyNode::Single(mut entry) => {
                            if !entry.is_attached() {
                                debug!("Importing JWK at {}", path.join("."));
                                let key = import_jwk(entry.jwk(), &config).await?;
                                match key.key_type() {
                                    KeyType::Private => entry.attach_private(key),
                                    KeyType::Public => entry.attach_public(key),
                                    KeyType::Secret => {
                                        return Err(KeyChainError::UnsupportedAlgorithmParameters(
                                            format!("{} imported as a secret key", path.join(".")),
                                        ));
                                    }
                                }
                            }
                            KeyNode::Single(entry)
                        }
                        KeyNode::Branch(tree) => {
                            KeyNode::Branch(import_tree(tree, path, config).await?)
                        }
                    };
                    Ok::<_, KeyChainError>((name, node))
                })
            })
            .collect();

        Ok(try_join_all(handles.into_iter().map(join))
            .await?
            .into_iter()
            .collect())
    })
}
