//! Opaque key handles

use std::{any::Any, fmt, sync::Arc};

use crate::{KeyAlgorithm, KeyUsage};

/// Kind of key material held by a [`CryptoKey`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Private,
    Public,
    Secret,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KeyType::Private => write!(f, "private"),
            KeyType::Public => write!(f, "public"),
            KeyType::Secret => write!(f, "secret"),
        }
    }
}

/// A live key handle owned by a crypto provider.
///
/// The key material itself is opaque to everything except the provider that
/// created it. A `CryptoKey` is a capability, not data: it deliberately does not
/// implement `Serialize`, and its `Debug` output never includes the material.
#[derive(Clone)]
pub struct CryptoKey {
    key_type: KeyType,
    algorithm: KeyAlgorithm,
    extractable: bool,
    usages: Vec<KeyUsage>,
    material: Arc<dyn Any + Send + Sync>,
}

impl CryptoKey {
    /// Wraps provider specific key material into a handle
    pub fn new(
        key_type: KeyType,
        algorithm: KeyAlgorithm,
        extractable: bool,
        usages: Vec<KeyUsage>,
        material: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        CryptoKey {
            key_type,
            algorithm,
            extractable,
            usages,
            material,
        }
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn algorithm(&self) -> &KeyAlgorithm {
        &self.algorithm
    }

    pub fn extractable(&self) -> bool {
        self.extractable
    }

    pub fn usages(&self) -> &[KeyUsage] {
        &self.usages
    }

    /// Provider access to the underlying material.
    /// Returns None if the material is not of type `T`.
    pub fn material<T: Any>(&self) -> Option<&T> {
        self.material.downcast_ref::<T>()
    }
}

impl fmt::Debug for CryptoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoKey")
            .field("type", &self.key_type)
            .field("algorithm", &self.algorithm)
            .field("extractable", &self.extractable)
            .field("usages", &self.usages)
            .finish_non_exhaustive()
    }
}

/// Private and public halves of a freshly generated key pair
#[derive(Clone, Debug)]
pub struct CryptoKeyPair {
    pub private_key: CryptoKey,
    pub public_key: CryptoKey,
}
