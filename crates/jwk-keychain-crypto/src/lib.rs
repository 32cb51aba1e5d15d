//! JWK types and crypto provider capability for jwk-keychain
//!
//! This crate provides:
//! - JWK (JSON Web Key) and JWK Set types per RFC 7517
//! - Opaque key handles ([`CryptoKey`]) owned by a provider
//! - The [`CryptoProvider`] capability trait consumed by the keychain engine
//! - [`RustCryptoProvider`], a provider built on the RustCrypto crates
//!   (RSASSA-PKCS1-v1_5 and ECDSA over P-256, P-384 and P-521)

mod algorithm;
mod error;
mod jwk;
mod key;
mod provider;
mod rust_crypto;

pub use algorithm::{AlgorithmName, AlgorithmParams, HashAlgorithm, ImportParams, KeyAlgorithm, NamedCurve};
pub use error::{CryptoError, Result};
pub use jwk::{ECParams, JWK, JwkSet, KeyUsage, Params, RSAParams};
pub use key::{CryptoKey, CryptoKeyPair, KeyType};
pub use provider::{CryptoProvider, ProviderFuture};
pub use rust_crypto::RustCryptoProvider;
