//! Crypto provider capability surface.
//!
//! The keychain engine never touches key material directly. Everything it
//! needs (generate, import, export, random bytes) is requested from a
//! [`CryptoProvider`], which may run the work on its own thread pool.
//!
//! The trait is dyn-compatible so a provider can be chosen per keychain at
//! runtime and shared as `Arc<dyn CryptoProvider>`.

use std::{future::Future, pin::Pin};

use crate::{AlgorithmParams, CryptoKey, CryptoKeyPair, ImportParams, JWK, KeyUsage, Result};

/// Boxed future returned by provider operations
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

pub trait CryptoProvider: Send + Sync {
    /// Human-readable name for this provider (e.g., `"RustCryptoProvider"`).
    fn name(&self) -> &str;

    /// Generate an asymmetric key pair.
    ///
    /// `usages` is split between the two halves: signing style usages land on
    /// the private key, verification style usages on the public key.
    fn generate_key_pair<'a>(
        &'a self,
        algorithm: &'a AlgorithmParams,
        extractable: bool,
        usages: &'a [KeyUsage],
    ) -> ProviderFuture<'a, CryptoKeyPair>;

    /// Import a single key from its JWK form.
    /// The returned handle reports `Private` or `Public` depending on the JWK.
    fn import_key<'a>(
        &'a self,
        jwk: &'a JWK,
        algorithm: &'a ImportParams,
        extractable: bool,
        usages: &'a [KeyUsage],
    ) -> ProviderFuture<'a, CryptoKey>;

    /// Export a key handle to JWK form.
    fn export_key<'a>(&'a self, key: &'a CryptoKey) -> ProviderFuture<'a, JWK>;

    /// Fill a buffer of `len` bytes from a cryptographically secure source.
    fn random_bytes(&self, len: usize) -> Result<Vec<u8>>;
}
