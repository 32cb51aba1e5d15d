//! [`CryptoProvider`] built on the RustCrypto crates.
//!
//! Key material is stored inside [`CryptoKey`] handles as the native RustCrypto
//! types (`rsa::RsaPrivateKey`, `p256::SecretKey`, ...). RSA key generation is
//! moved onto tokio's blocking pool so it never stalls the executor.

use std::{any::Any, sync::Arc};

use rand::{RngCore, rngs::OsRng};
#[cfg(feature = "rsa")]
use ::rsa::traits::PublicKeyParts;
use tracing::debug;

use crate::{
    AlgorithmName, AlgorithmParams, CryptoError, CryptoKey, CryptoKeyPair, CryptoProvider,
    ImportParams, JWK, KeyAlgorithm, KeyType, KeyUsage, NamedCurve, Params, ProviderFuture,
    error::Result,
};

mod ec;
#[cfg(feature = "rsa")]
mod rsa;

#[cfg(feature = "p256")]
use ec::p256_keys;
#[cfg(feature = "p384")]
use ec::p384_keys;
#[cfg(feature = "p521")]
use ec::p521_keys;

type Material = Arc<dyn Any + Send + Sync>;

/// Default crypto provider (RSASSA-PKCS1-v1_5, ECDSA P-256/P-384/P-521)
#[derive(Clone, Debug, Default)]
pub struct RustCryptoProvider;

impl RustCryptoProvider {
    pub fn new() -> Self {
        RustCryptoProvider
    }
}

/// Splits requested usages into (private, public) halves.
/// Both supported algorithms are signature algorithms, so only `sign` and
/// `verify` are meaningful.
fn split_usages(name: AlgorithmName, usages: &[KeyUsage]) -> Result<(Vec<KeyUsage>, Vec<KeyUsage>)> {
    let mut private = Vec::new();
    let mut public = Vec::new();

    for usage in usages {
        let target = match usage {
            KeyUsage::Sign => &mut private,
            KeyUsage::Verify => &mut public,
            other => {
                return Err(CryptoError::InvalidUsage(format!(
                    "{other} isn't a valid usage for {name}"
                )));
            }
        };
        if !target.contains(usage) {
            target.push(*usage);
        }
    }

    Ok((private, public))
}

fn material<T: Any>(key: &CryptoKey) -> Result<&T> {
    key.material::<T>().ok_or_else(|| {
        CryptoError::KeyError("Key material wasn't created by RustCryptoProvider".into())
    })
}

#[allow(unreachable_patterns)]
fn ec_pair(named_curve: NamedCurve) -> Result<(Material, Material)> {
    match named_curve {
        #[cfg(feature = "p256")]
        NamedCurve::P256 => {
            let (secret, public) = p256_keys::generate();
            Ok((Arc::new(secret), Arc::new(public)))
        }
        #[cfg(feature = "p384")]
        NamedCurve::P384 => {
            let (secret, public) = p384_keys::generate();
            Ok((Arc::new(secret), Arc::new(public)))
        }
        #[cfg(feature = "p521")]
        NamedCurve::P521 => {
            let (secret, public) = p521_keys::generate();
            Ok((Arc::new(secret), Arc::new(public)))
        }
        _ => Err(CryptoError::UnsupportedAlgorithm(format!(
            "{named_curve} support isn't enabled"
        ))),
    }
}

#[allow(unreachable_patterns)]
fn ec_import(named_curve: NamedCurve, jwk: &JWK) -> Result<(KeyType, Material)> {
    let Params::EC(params) = &jwk.params else {
        return Err(CryptoError::KeyError(format!(
            "Expected an EC JWK, found kty {}",
            jwk.kty()
        )));
    };
    if params.curve != named_curve.to_string() {
        return Err(CryptoError::KeyError(format!(
            "JWK curve {} doesn't match {named_curve}",
            params.curve
        )));
    }

    macro_rules! import {
        ($module:ident) => {
            if params.d.is_some() {
                Ok((KeyType::Private, Arc::new($module::import_private(params)?) as Material))
            } else {
                Ok((KeyType::Public, Arc::new($module::import_public(params)?) as Material))
            }
        };
    }

    match named_curve {
        #[cfg(feature = "p256")]
        NamedCurve::P256 => import!(p256_keys),
        #[cfg(feature = "p384")]
        NamedCurve::P384 => import!(p384_keys),
        #[cfg(feature = "p521")]
        NamedCurve::P521 => import!(p521_keys),
        _ => Err(CryptoError::UnsupportedAlgorithm(format!(
            "{named_curve} support isn't enabled"
        ))),
    }
}

#[allow(unreachable_patterns)]
fn ec_export(key: &CryptoKey) -> Result<JWK> {
    let named_curve = key
        .algorithm()
        .named_curve
        .ok_or_else(|| CryptoError::KeyError("ECDSA key without a named curve".into()))?;

    macro_rules! export {
        ($module:ident, $krate:ident) => {
            match key.key_type() {
                KeyType::Private => $module::private_jwk(material::<$krate::SecretKey>(key)?),
                KeyType::Public => $module::public_jwk(material::<$krate::PublicKey>(key)?),
                KeyType::Secret => Err(CryptoError::KeyError(
                    "ECDSA keys are never secret keys".into(),
                )),
            }
        };
    }

    match named_curve {
        #[cfg(feature = "p256")]
        NamedCurve::P256 => export!(p256_keys, p256),
        #[cfg(feature = "p384")]
        NamedCurve::P384 => export!(p384_keys, p384),
        #[cfg(feature = "p521")]
        NamedCurve::P521 => export!(p521_keys, p521),
        _ => Err(CryptoError::UnsupportedAlgorithm(format!(
            "{named_curve} support isn't enabled"
        ))),
    }
}

#[cfg(feature = "rsa")]
async fn rsa_pair(modulus_length: usize, public_exponent: Vec<u8>) -> Result<(Material, Material)> {
    let secret = tokio::task::spawn_blocking(move || rsa::generate(modulus_length, &public_exponent))
        .await
        .map_err(|e| CryptoError::KeyError(format!("RSA key generation task failed: {e}")))??;
    let public = secret.to_public_key();

    Ok((Arc::new(secret), Arc::new(public)))
}

#[cfg(not(feature = "rsa"))]
async fn rsa_pair(_modulus_length: usize, _public_exponent: Vec<u8>) -> Result<(Material, Material)> {
    Err(CryptoError::UnsupportedAlgorithm("RSA support isn't enabled".into()))
}

#[cfg(feature = "rsa")]
fn rsa_import(hash_bits: u16, jwk: &JWK) -> Result<(KeyType, KeyAlgorithm, Material)> {
    let Params::RSA(params) = &jwk.params else {
        return Err(CryptoError::KeyError(format!(
            "Expected an RSA JWK, found kty {}",
            jwk.kty()
        )));
    };
    let expected = format!("RS{hash_bits}");
    if let Some(alg) = &jwk.alg
        && alg != &expected
    {
        return Err(CryptoError::KeyError(format!(
            "JWK alg {alg} doesn't match {expected}"
        )));
    }

    if params.d.is_some() {
        let key = rsa::import_private(params)?;
        let algorithm = (rsa::modulus_length(&key), key.e().to_bytes_be());
        Ok((KeyType::Private, rsa_algorithm(hash_bits, algorithm)?, Arc::new(key)))
    } else {
        let key = rsa::import_public(params)?;
        let algorithm = (rsa::modulus_length(&key), key.e().to_bytes_be());
        Ok((KeyType::Public, rsa_algorithm(hash_bits, algorithm)?, Arc::new(key)))
    }
}

#[cfg(feature = "rsa")]
fn rsa_algorithm(hash_bits: u16, (modulus_length, exponent): (usize, Vec<u8>)) -> Result<KeyAlgorithm> {
    let hash = crate::HashAlgorithm::from_bits(hash_bits)
        .ok_or_else(|| CryptoError::UnsupportedAlgorithm(format!("SHA-{hash_bits}")))?;
    Ok(KeyAlgorithm::rsa(hash, modulus_length, exponent))
}

#[cfg(not(feature = "rsa"))]
fn rsa_import(_hash_bits: u16, _jwk: &JWK) -> Result<(KeyType, KeyAlgorithm, Material)> {
    Err(CryptoError::UnsupportedAlgorithm("RSA support isn't enabled".into()))
}

#[cfg(feature = "rsa")]
fn rsa_export(key: &CryptoKey) -> Result<JWK> {
    let mut jwk = match key.key_type() {
        KeyType::Private => rsa::private_jwk(material::<::rsa::RsaPrivateKey>(key)?)?,
        KeyType::Public => rsa::public_jwk(material::<::rsa::RsaPublicKey>(key)?),
        KeyType::Secret => {
            return Err(CryptoError::KeyError("RSA keys are never secret keys".into()));
        }
    };
    jwk.alg = key.algorithm().hash.map(|hash| format!("RS{}", hash.bits()));
    Ok(jwk)
}

#[cfg(not(feature = "rsa"))]
fn rsa_export(_key: &CryptoKey) -> Result<JWK> {
    Err(CryptoError::UnsupportedAlgorithm("RSA support isn't enabled".into()))
}

impl CryptoProvider for RustCryptoProvider {
    fn name(&self) -> &str {
        "RustCryptoProvider"
    }

    fn generate_key_pair<'a>(
        &'a self,
        algorithm: &'a AlgorithmParams,
        extractable: bool,
        usages: &'a [KeyUsage],
    ) -> ProviderFuture<'a, CryptoKeyPair> {
        Box::pin(async move {
            let (private_usages, public_usages) = split_usages(algorithm.name(), usages)?;
            if private_usages.is_empty() {
                return Err(CryptoError::InvalidUsage(
                    "A private key needs at least one usage".into(),
                ));
            }

            let (key_algorithm, (secret, public)) = match algorithm {
                AlgorithmParams::RsassaPkcs1V15 {
                    modulus_length,
                    public_exponent,
                    hash,
                } => {
                    debug!("Generating {modulus_length} bit RSA key pair");
                    (
                        KeyAlgorithm::rsa(*hash, *modulus_length, public_exponent.clone()),
                        rsa_pair(*modulus_length, public_exponent.clone()).await?,
                    )
                }
                AlgorithmParams::Ecdsa { named_curve, hash } => {
                    debug!("Generating {named_curve} key pair");
                    (KeyAlgorithm::ec(*named_curve, *hash), ec_pair(*named_curve)?)
                }
            };

            Ok(CryptoKeyPair {
                private_key: CryptoKey::new(
                    KeyType::Private,
                    key_algorithm.clone(),
                    extractable,
                    private_usages,
                    secret,
                ),
                // public keys are always extractable
                public_key: CryptoKey::new(KeyType::Public, key_algorithm, true, public_usages, public),
            })
        })
    }

    fn import_key<'a>(
        &'a self,
        jwk: &'a JWK,
        algorithm: &'a ImportParams,
        extractable: bool,
        usages: &'a [KeyUsage],
    ) -> ProviderFuture<'a, CryptoKey> {
        Box::pin(async move {
            if jwk.ext == Some(false) && extractable {
                return Err(CryptoError::KeyError(
                    "Can't import a non-extractable JWK as extractable".into(),
                ));
            }

            let (key_type, key_algorithm, material) = match algorithm {
                ImportParams::RsassaPkcs1V15 { hash } => rsa_import(hash.bits(), jwk)?,
                ImportParams::Ecdsa { named_curve, hash } => {
                    let (key_type, material) = ec_import(*named_curve, jwk)?;
                    (key_type, KeyAlgorithm::ec(*named_curve, *hash), material)
                }
            };

            let (private_usages, public_usages) = split_usages(algorithm.name(), usages)?;
            let usages = match key_type {
                KeyType::Private if !public_usages.is_empty() => {
                    return Err(CryptoError::InvalidUsage(
                        "verify isn't a valid usage for a private key".into(),
                    ));
                }
                KeyType::Public if !private_usages.is_empty() => {
                    return Err(CryptoError::InvalidUsage(
                        "sign isn't a valid usage for a public key".into(),
                    ));
                }
                KeyType::Private => private_usages,
                _ => public_usages,
            };

            debug!("Imported {key_type} {} key", key_algorithm.name);
            Ok(CryptoKey::new(key_type, key_algorithm, extractable, usages, material))
        })
    }

    fn export_key<'a>(&'a self, key: &'a CryptoKey) -> ProviderFuture<'a, JWK> {
        Box::pin(async move {
            if !key.extractable() {
                return Err(CryptoError::NotExtractable);
            }

            let mut jwk = match key.algorithm().name {
                AlgorithmName::RsassaPkcs1V15 => rsa_export(key)?,
                AlgorithmName::Ecdsa => ec_export(key)?,
            };
            jwk.key_ops = Some(key.usages().to_vec());
            jwk.ext = Some(true);

            Ok(jwk)
        })
    }

    fn random_bytes(&self, len: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; len];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::Random(e.to_string()))?;
        Ok(bytes)
    }
}
