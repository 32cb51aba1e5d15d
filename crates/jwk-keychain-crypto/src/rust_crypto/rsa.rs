//! RSA key operations

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::rngs::OsRng;
use rsa::{
    BigUint, RsaPrivateKey, RsaPublicKey,
    traits::{PrivateKeyParts, PublicKeyParts},
};

use super::ec::decode;
use crate::{CryptoError, JWK, Params, RSAParams, error::Result};

/// Generates a private key; the public half is derived from it.
/// This is CPU heavy and should be run off the async executor.
pub(crate) fn generate(modulus_length: usize, public_exponent: &[u8]) -> Result<RsaPrivateKey> {
    let exponent = BigUint::from_bytes_be(public_exponent);

    RsaPrivateKey::new_with_exp(&mut OsRng, modulus_length, &exponent)
        .map_err(|e| CryptoError::KeyError(format!("RSA key generation failed: {e}")))
}

fn encode(value: &BigUint) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(value.to_bytes_be())
}

fn uint(member: &str, value: &str) -> Result<BigUint> {
    Ok(BigUint::from_bytes_be(&decode(member, value)?))
}

fn required<'a>(member: &str, value: &'a Option<String>) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| CryptoError::KeyError(format!("JWK is missing member '{member}'")))
}

fn jwk(params: RSAParams) -> JWK {
    JWK {
        key_id: None,
        alg: None,
        key_ops: None,
        ext: None,
        params: Params::RSA(params),
    }
}

pub(crate) fn public_jwk(key: &RsaPublicKey) -> JWK {
    jwk(RSAParams {
        n: encode(key.n()),
        e: encode(key.e()),
        d: None,
        p: None,
        q: None,
        dp: None,
        dq: None,
        qi: None,
    })
}

pub(crate) fn private_jwk(key: &RsaPrivateKey) -> Result<JWK> {
    let [p, q] = key.primes() else {
        return Err(CryptoError::KeyError(
            "Only two-prime RSA keys can be exported".into(),
        ));
    };

    let one = BigUint::from(1u8);
    let dp = key.d() % (p - &one);
    let dq = key.d() % (q - &one);
    let qi = key
        .crt_coefficient()
        .ok_or_else(|| CryptoError::KeyError("Couldn't compute RSA CRT coefficient".into()))?;

    Ok(jwk(RSAParams {
        n: encode(key.n()),
        e: encode(key.e()),
        d: Some(encode(key.d())),
        p: Some(encode(p)),
        q: Some(encode(q)),
        dp: Some(encode(&dp)),
        dq: Some(encode(&dq)),
        qi: Some(encode(&qi)),
    }))
}

pub(crate) fn import_public(params: &RSAParams) -> Result<RsaPublicKey> {
    RsaPublicKey::new(uint("n", &params.n)?, uint("e", &params.e)?)
        .map_err(|e| CryptoError::KeyError(format!("RSA public key isn't valid: {e}")))
}

pub(crate) fn import_private(params: &RSAParams) -> Result<RsaPrivateKey> {
    let primes = vec![
        uint("p", required("p", &params.p)?)?,
        uint("q", required("q", &params.q)?)?,
    ];

    let key = RsaPrivateKey::from_components(
        uint("n", &params.n)?,
        uint("e", &params.e)?,
        uint("d", required("d", &params.d)?)?,
        primes,
    )
    .map_err(|e| CryptoError::KeyError(format!("RSA private key isn't valid: {e}")))?;

    key.validate()
        .map_err(|e| CryptoError::KeyError(format!("RSA private key isn't valid: {e}")))?;

    Ok(key)
}

/// Modulus length in bits
pub(crate) fn modulus_length(key: &impl PublicKeyParts) -> usize {
    key.size() * 8
}
