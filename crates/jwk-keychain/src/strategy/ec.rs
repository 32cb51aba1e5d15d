//! ECDSA key pairs (`ES256`, `ES384`, `ES512`)

use std::sync::Arc;

use jwk_keychain_crypto::{
    AlgorithmParams, CryptoKey, CryptoProvider, HashAlgorithm, ImportParams, JWK, KeyUsage,
    NamedCurve,
};
use tracing::debug;

use super::{DEFAULT_USAGES, KeyPairStrategy, StrategyFuture, StrategyParams, generate_entry};
use crate::{
    errors::{KeyChainError, Result},
    tree::KeyEntry,
};

/// Fixed mapping from JWA identifier to curve and digest.
/// ES512 is P-521, there is no P-512.
pub fn curve_for(alg: &str) -> Option<(NamedCurve, HashAlgorithm)> {
    match alg {
        "ES256" => Some((NamedCurve::P256, HashAlgorithm::Sha256)),
        "ES384" => Some((NamedCurve::P384, HashAlgorithm::Sha384)),
        "ES512" => Some((NamedCurve::P521, HashAlgorithm::Sha512)),
        _ => None,
    }
}

pub struct EcKeyPair {
    alg: String,
    named_curve: NamedCurve,
    hash: HashAlgorithm,
    usages: Vec<KeyUsage>,
    provider: Arc<dyn CryptoProvider>,
    kid_length: usize,
}

impl EcKeyPair {
    /// `namedCurve` overrides the curve from the table, the hash always follows `alg`
    pub fn new(params: StrategyParams) -> Result<Self> {
        let (default_curve, hash) = curve_for(&params.alg).ok_or_else(|| {
            KeyChainError::UnsupportedAlgorithmParameters(format!(
                "Unsupported EC algorithm: {}",
                params.alg
            ))
        })?;

        let named_curve = match params.named_curve.as_deref() {
            Some(curve) => NamedCurve::try_from(curve)
                .map_err(|e| KeyChainError::UnsupportedAlgorithmParameters(e.to_string()))?,
            None => default_curve,
        };

        Ok(EcKeyPair {
            alg: params.alg,
            named_curve,
            hash,
            usages: params.usages.unwrap_or_else(|| DEFAULT_USAGES.to_vec()),
            provider: params.provider,
            kid_length: params.kid_length,
        })
    }

    pub fn named_curve(&self) -> NamedCurve {
        self.named_curve
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    pub fn usages(&self) -> &[KeyUsage] {
        &self.usages
    }
}

impl KeyPairStrategy for EcKeyPair {
    fn alg(&self) -> &str {
        &self.alg
    }

    fn generate_key(&self) -> StrategyFuture<'_, KeyEntry> {
        Box::pin(async move {
            let algorithm = AlgorithmParams::Ecdsa {
                named_curve: self.named_curve,
                hash: self.hash,
            };

            generate_entry(
                self.provider.as_ref(),
                self.kid_length,
                &self.alg,
                &algorithm,
                &self.usages,
            )
            .await
        })
    }

    fn import_key<'a>(&'a self, jwk: &'a JWK) -> StrategyFuture<'a, CryptoKey> {
        Box::pin(async move {
            debug!("Importing {} ({}) JWK ({:?})", self.alg, self.named_curve, jwk.key_id);
            let algorithm = ImportParams::Ecdsa {
                named_curve: self.named_curve,
                hash: self.hash,
            };
            let usages = jwk.key_ops.clone().unwrap_or_default();

            Ok(self.provider.import_key(jwk, &algorithm, true, &usages).await?)
        })
    }
}
