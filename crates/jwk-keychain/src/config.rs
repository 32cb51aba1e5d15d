//! Handles the configuration for a [`crate::KeyChain`].
//!
//! Call the [KeyChainConfigBuilder] to create a new configuration.
//!
//! Example: defaults (RustCrypto provider, RS*/ES* algorithms, 8 byte key IDs):
//! ```rust
//! use jwk_keychain::KeyChainConfigBuilder;
//! let config = KeyChainConfigBuilder::default().build();
//! ```
//!
//! Example: custom settings:
//! ```rust
//! use std::sync::Arc;
//! use jwk_keychain::{AlgorithmRegistry, KeyChainConfigBuilder};
//! use jwk_keychain::jwk_keychain_crypto::RustCryptoProvider;
//!
//! let config = KeyChainConfigBuilder::default()
//!     .with_provider(Arc::new(RustCryptoProvider::new()))
//!     .with_registry(AlgorithmRegistry::default())
//!     .with_kid_length(16)
//!     .build();
//! ```

use std::{fmt, sync::Arc};

use jwk_keychain_crypto::{CryptoProvider, RustCryptoProvider};

use crate::{registry::AlgorithmRegistry, strategy::DEFAULT_KID_LENGTH};

/// Configuration for a KeyChain.
///
/// Cloning is cheap, the provider and registry are shared.
#[derive(Clone)]
pub struct KeyChainConfig {
    pub(crate) provider: Arc<dyn CryptoProvider>,
    pub(crate) registry: Arc<AlgorithmRegistry>,
    pub(crate) kid_length: usize,
}

impl KeyChainConfig {
    pub fn provider(&self) -> &Arc<dyn CryptoProvider> {
        &self.provider
    }

    pub fn registry(&self) -> &AlgorithmRegistry {
        &self.registry
    }

    pub fn kid_length(&self) -> usize {
        self.kid_length
    }
}

impl Default for KeyChainConfig {
    fn default() -> Self {
        KeyChainConfigBuilder::default().build()
    }
}

impl fmt::Debug for KeyChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyChainConfig")
            .field("provider", &self.provider.name())
            .field("registry", &self.registry)
            .field("kid_length", &self.kid_length)
            .finish()
    }
}

/// KeyChain Config Builder
///
/// - provider: crypto provider used for every strategy call (default: RustCryptoProvider).
/// - registry: algorithms that can be generated and imported (default: RS256/384/512, ES256/384/512).
/// - kid_length: random bytes per key ID (default: 8).
pub struct KeyChainConfigBuilder {
    provider: Option<Arc<dyn CryptoProvider>>,
    registry: Option<AlgorithmRegistry>,
    kid_length: usize,
}

impl Default for KeyChainConfigBuilder {
    fn default() -> Self {
        Self {
            provider: None,
            registry: None,
            kid_length: DEFAULT_KID_LENGTH,
        }
    }
}

impl KeyChainConfigBuilder {
    /// Use a specific crypto provider instead of [RustCryptoProvider]
    pub fn with_provider(mut self, provider: Arc<dyn CryptoProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Replace the algorithm registry
    pub fn with_registry(mut self, registry: AlgorithmRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Number of random bytes in each generated `kid`
    /// Default: 8
    pub fn with_kid_length(mut self, kid_length: usize) -> Self {
        self.kid_length = kid_length;
        self
    }

    /// Build the [KeyChainConfig].
    pub fn build(self) -> KeyChainConfig {
        KeyChainConfig {
            provider: self
                .provider
                .unwrap_or_else(|| Arc::new(RustCryptoProvider::new())),
            registry: Arc::new(self.registry.unwrap_or_default()),
            kid_length: self.kid_length,
        }
    }
}
