//! Key-pair strategies
//!
//! A strategy owns the algorithm specific knowledge for one family of JWA
//! identifiers: it validates and normalizes the leaf parameters when it is
//! constructed, then asks the [`CryptoProvider`] to generate or import keys.
//! Construction never touches the provider, so parameter errors surface before
//! any key material is created.

use std::{future::Future, pin::Pin, sync::Arc};

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use jwk_keychain_crypto::{AlgorithmParams, CryptoKey, CryptoProvider, JWK, KeyUsage, Params};
use tracing::debug;

use crate::{
    KeyChainConfig,
    descriptor::LeafSpec,
    errors::{KeyChainError, Result},
    tree::{KeyEntry, KeyPairJwks},
};

pub mod ec;
pub mod rsa;

pub use ec::EcKeyPair;
pub use rsa::RsaKeyPair;

/// Default `kid` length in random bytes
pub const DEFAULT_KID_LENGTH: usize = 8;

/// Usages applied when a leaf doesn't specify any
pub const DEFAULT_USAGES: [KeyUsage; 2] = [KeyUsage::Sign, KeyUsage::Verify];

/// Boxed future returned by strategy operations
pub type StrategyFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Generates or imports key pairs for a family of algorithm identifiers
pub trait KeyPairStrategy: Send + Sync {
    /// JWA identifier this strategy was constructed for (e.g. `RS256`)
    fn alg(&self) -> &str;

    /// Generate a fresh key pair, exported to JWK with a random `kid` on each half
    fn generate_key(&self) -> StrategyFuture<'_, KeyEntry>;

    /// Import a single JWK, using the JWK's `key_ops` as the usages
    fn import_key<'a>(&'a self, jwk: &'a JWK) -> StrategyFuture<'a, CryptoKey>;
}

/// Normalized input handed to a strategy constructor
#[derive(Clone)]
pub struct StrategyParams {
    pub alg: String,
    pub modulus_length: Option<usize>,
    /// Big-endian public exponent bytes
    pub public_exponent: Option<Vec<u8>>,
    pub named_curve: Option<String>,
    pub usages: Option<Vec<KeyUsage>>,
    pub provider: Arc<dyn CryptoProvider>,
    pub kid_length: usize,
}

impl StrategyParams {
    pub fn new(alg: &str, provider: Arc<dyn CryptoProvider>) -> Self {
        StrategyParams {
            alg: alg.to_string(),
            modulus_length: None,
            public_exponent: None,
            named_curve: None,
            usages: None,
            provider,
            kid_length: DEFAULT_KID_LENGTH,
        }
    }

    /// Parameters for generating the key pair described by `leaf`
    pub fn from_leaf(leaf: &LeafSpec, config: &KeyChainConfig) -> Self {
        StrategyParams {
            alg: leaf.alg.clone(),
            modulus_length: leaf.modulus_length,
            public_exponent: leaf.public_exponent.as_ref().map(|e| e.to_bytes()),
            named_curve: leaf.named_curve.clone(),
            usages: leaf.usages.clone(),
            provider: config.provider.clone(),
            kid_length: config.kid_length,
        }
    }

    /// Parameters for importing `jwk`. The curve of an EC key comes from its `crv`.
    pub fn from_jwk(jwk: &JWK, config: &KeyChainConfig) -> Result<Self> {
        let Some(alg) = &jwk.alg else {
            return Err(KeyChainError::UnsupportedAlgorithmParameters(format!(
                "JWK ({}) has no alg",
                jwk.key_id.as_deref().unwrap_or("no kid")
            )));
        };

        let mut params = StrategyParams::new(alg, config.provider.clone());
        params.kid_length = config.kid_length;
        params.usages = jwk.key_ops.clone();
        if let Params::EC(ec) = &jwk.params {
            params.named_curve = Some(ec.curve.clone());
        }

        Ok(params)
    }
}

/// Mints a random key ID from `len` provider-sourced bytes
pub fn mint_kid(provider: &dyn CryptoProvider, len: usize) -> Result<String> {
    Ok(BASE64_URL_SAFE_NO_PAD.encode(provider.random_bytes(len)?))
}

/// Shared generate path: create the pair, export both halves, stamp `kid` and `alg`
pub(crate) async fn generate_entry(
    provider: &dyn CryptoProvider,
    kid_length: usize,
    alg: &str,
    algorithm: &AlgorithmParams,
    usages: &[KeyUsage],
) -> Result<KeyEntry> {
    let pair = provider.generate_key_pair(algorithm, true, usages).await?;

    let (mut private_jwk, mut public_jwk) = tokio::try_join!(
        provider.export_key(&pair.private_key),
        provider.export_key(&pair.public_key)
    )?;

    private_jwk.key_id = Some(mint_kid(provider, kid_length)?);
    private_jwk.alg = Some(alg.to_string());
    public_jwk.key_id = Some(mint_kid(provider, kid_length)?);
    public_jwk.alg = Some(alg.to_string());

    debug!(
        "Generated {alg} key pair (private kid: {:?}, public kid: {:?})",
        private_jwk.key_id, public_jwk.key_id
    );

    Ok(KeyEntry::new(
        KeyPairJwks {
            private_jwk,
            public_jwk,
        },
        pair.private_key,
        pair.public_key,
    ))
}
