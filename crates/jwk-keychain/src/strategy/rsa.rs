//! RSASSA-PKCS1-v1_5 key pairs (`RS256`, `RS384`, `RS512`)

use std::sync::Arc;

use jwk_keychain_crypto::{
    AlgorithmParams, CryptoKey, CryptoProvider, HashAlgorithm, ImportParams, JWK, KeyUsage,
};
use tracing::debug;

use super::{
    DEFAULT_USAGES, KeyPairStrategy, StrategyFuture, StrategyParams, generate_entry,
};
use crate::{
    errors::{KeyChainError, Result},
    tree::KeyEntry,
};

/// Modulus length used when a leaf doesn't set `modulusLength`
pub const DEFAULT_MODULUS_LENGTH: usize = 4096;

/// 65537
pub const DEFAULT_PUBLIC_EXPONENT: [u8; 3] = [0x01, 0x00, 0x01];

pub struct RsaKeyPair {
    alg: String,
    algorithm: AlgorithmParams,
    hash: HashAlgorithm,
    usages: Vec<KeyUsage>,
    provider: Arc<dyn CryptoProvider>,
    kid_length: usize,
}

impl RsaKeyPair {
    /// Validates and normalizes the parameters. The hash is taken from the
    /// trailing digits of `alg`; anything other than 256, 384 or 512 is rejected.
    pub fn new(params: StrategyParams) -> Result<Self> {
        let hash = ["256", "384", "512"]
            .iter()
            .find(|suffix| params.alg.ends_with(*suffix))
            .and_then(|suffix| suffix.parse().ok())
            .and_then(HashAlgorithm::from_bits)
            .ok_or_else(|| {
                KeyChainError::UnsupportedAlgorithmParameters(format!(
                    "Invalid hash length ({})",
                    params.alg
                ))
            })?;

        let algorithm = AlgorithmParams::RsassaPkcs1V15 {
            modulus_length: params.modulus_length.unwrap_or(DEFAULT_MODULUS_LENGTH),
            public_exponent: params
                .public_exponent
                .unwrap_or_else(|| DEFAULT_PUBLIC_EXPONENT.to_vec()),
            hash,
        };

        Ok(RsaKeyPair {
            alg: params.alg,
            algorithm,
            hash,
            usages: params.usages.unwrap_or_else(|| DEFAULT_USAGES.to_vec()),
            provider: params.provider,
            kid_length: params.kid_length,
        })
    }

    /// Generation parameters handed to the provider
    pub fn algorithm(&self) -> &AlgorithmParams {
        &self.algorithm
    }

    pub fn usages(&self) -> &[KeyUsage] {
        &self.usages
    }
}

impl KeyPairStrategy for RsaKeyPair {
    fn alg(&self) -> &str {
        &self.alg
    }

    fn generate_key(&self) -> StrategyFuture<'_, KeyEntry> {
        Box::pin(async move {
            generate_entry(
                self.provider.as_ref(),
                self.kid_length,
                &self.alg,
                &self.algorithm,
                &self.usages,
            )
            .await
        })
    }

    fn import_key<'a>(&'a self, jwk: &'a JWK) -> StrategyFuture<'a, CryptoKey> {
        Box::pin(async move {
            debug!("Importing {} JWK ({:?})", self.alg, jwk.key_id);
            let usages = jwk.key_ops.clone().unwrap_or_default();
            let key = self
                .provider
                .import_key(
                    jwk,
                    &ImportParams::RsassaPkcs1V15 { hash: self.hash },
                    true,
                    &usages,
                )
                .await?;
            Ok(key)
        })
    }
}
