//! ECDSA key operations over the NIST curves (P-256, P-384, P-521)
//!
//! Each curve gets an identical module generated by `curve_module!`, the only
//! difference being the RustCrypto crate backing it.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};

use crate::{CryptoError, ECParams, JWK, Params, error::Result};

/// Decodes a base64url JWK member
pub(crate) fn decode(member: &str, value: &str) -> Result<Vec<u8>> {
    BASE64_URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| CryptoError::Decoding(format!("JWK member '{member}' isn't valid base64url: {e}")))
}

fn jwk(params: ECParams) -> JWK {
    JWK {
        key_id: None,
        alg: None,
        key_ops: None,
        ext: None,
        params: Params::EC(params),
    }
}

macro_rules! curve_module {
    ($module:ident, $krate:ident, $feature:literal, $curve:expr) => {
        #[cfg(feature = $feature)]
        pub(crate) mod $module {
            use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
            use rand::rngs::OsRng;
            use $krate::{PublicKey, SecretKey, elliptic_curve::sec1::ToEncodedPoint};

            use super::{decode, jwk};
            use crate::{CryptoError, ECParams, JWK, NamedCurve, error::Result};

            pub(crate) const CURVE: NamedCurve = $curve;

            /// Generates a random key pair
            pub(crate) fn generate() -> (SecretKey, PublicKey) {
                let secret = SecretKey::random(&mut OsRng);
                let public = secret.public_key();
                (secret, public)
            }

            fn public_params(public: &PublicKey) -> Result<ECParams> {
                let point = public.to_encoded_point(false);

                Ok(ECParams {
                    curve: CURVE.to_string(),
                    x: BASE64_URL_SAFE_NO_PAD.encode(
                        point
                            .x()
                            .ok_or_else(|| CryptoError::KeyError("Couldn't get X coordinate".into()))?,
                    ),
                    y: BASE64_URL_SAFE_NO_PAD.encode(
                        point
                            .y()
                            .ok_or_else(|| CryptoError::KeyError("Couldn't get Y coordinate".into()))?,
                    ),
                    d: None,
                })
            }

            /// Public JWK, never carries `d`
            pub(crate) fn public_jwk(public: &PublicKey) -> Result<JWK> {
                Ok(jwk(public_params(public)?))
            }

            /// Private JWK, carries `d` alongside the public coordinates
            pub(crate) fn private_jwk(secret: &SecretKey) -> Result<JWK> {
                let mut params = public_params(&secret.public_key())?;
                params.d = Some(BASE64_URL_SAFE_NO_PAD.encode(secret.to_bytes()));
                Ok(jwk(params))
            }

            pub(crate) fn import_public(params: &ECParams) -> Result<PublicKey> {
                let x = decode("x", &params.x)?;
                let y = decode("y", &params.y)?;
                if x.len() != y.len() {
                    return Err(CryptoError::KeyError(format!(
                        "{CURVE} coordinates have mismatched lengths"
                    )));
                }

                // Leading byte '4' denotes uncompressed
                let mut sec1 = Vec::with_capacity(1 + x.len() + y.len());
                sec1.push(4);
                sec1.extend_from_slice(&x);
                sec1.extend_from_slice(&y);

                PublicKey::from_sec1_bytes(&sec1)
                    .map_err(|e| CryptoError::KeyError(format!("{CURVE} public key isn't valid: {e}")))
            }

            pub(crate) fn import_private(params: &ECParams) -> Result<SecretKey> {
                let d = params
                    .d
                    .as_deref()
                    .ok_or_else(|| CryptoError::KeyError("JWK is missing member 'd'".into()))?;
                let secret = SecretKey::from_slice(&decode("d", d)?).map_err(|e| {
                    CryptoError::KeyError(format!("{CURVE} secret material isn't valid: {e}"))
                })?;

                let public = import_public(params)?;
                if secret.public_key().to_encoded_point(false) != public.to_encoded_point(false) {
                    return Err(CryptoError::KeyError(format!(
                        "{CURVE} private key doesn't match its public coordinates"
                    )));
                }

                Ok(secret)
            }
        }
    };
}

curve_module!(p256_keys, p256, "p256", NamedCurve::P256);
curve_module!(p384_keys, p384, "p384", NamedCurve::P384);
curve_module!(p521_keys, p521, "p521", NamedCurve::P521);
