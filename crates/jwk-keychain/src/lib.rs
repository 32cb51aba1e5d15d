/*!
 * JWK KeyChain
 *
 * Manages a hierarchy of signing keys described by a declarative descriptor.
 *
 * A [`KeyChain`] is built from a [`Descriptor`] and can be:
 * 1. Generated (or rotated) - every leaf becomes a fresh key pair
 * 2. Serialized - JWKs only, live key handles are never written
 * 3. Restored - JWKs are imported back into key handles
 *
 * The public halves are published as a JWK Set ([`KeyChain::jwks`]), with a
 * cached JSON rendering in [`KeyChain::jwk_set`].
 *
 * ```rust,no_run
 * use jwk_keychain::{Descriptor, KeyChain, KeyChainConfig};
 *
 * # async fn run() -> jwk_keychain::errors::Result<()> {
 * let descriptor: Descriptor = r#"{ "token": { "sig": { "alg": "ES256" } } }"#.parse()?;
 * let chain = KeyChain::generate(descriptor, KeyChainConfig::default()).await?;
 * println!("{}", chain.jwk_set().unwrap_or_default());
 * # Ok(())
 * # }
 * ```
 */

pub mod config;
pub mod descriptor;
pub mod errors;
pub mod keychain;
pub mod registry;
pub mod strategy;
pub mod tree;

pub use config::{KeyChainConfig, KeyChainConfigBuilder};
pub use descriptor::{Descriptor, DescriptorEntry, LeafSpec, PublicExponent};
pub use errors::{KeyChainError, NotSupportedError};
pub use keychain::{KeyChain, KeyChainState};
pub use registry::{AlgorithmRegistry, Operation, StrategyConstructor};
pub use strategy::{EcKeyPair, KeyPairStrategy, RsaKeyPair, StrategyParams};
pub use tree::{JwkEntry, KeyEntry, KeyNode, KeyPairJwks, KeyTree};

// Provider surface
pub use jwk_keychain_crypto;
