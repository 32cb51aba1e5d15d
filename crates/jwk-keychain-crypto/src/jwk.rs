//! JWK (JSON Web Key) types per RFC 7517

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// RFC 7517 JWK Struct
///
/// Member names follow the JOSE registry (`kid`, `alg`, `key_ops`, `ext`) and the
/// key type specific members are flattened in from [`Params`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JWK {
    #[serde(rename = "kid")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<KeyUsage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<bool>,
    #[serde(flatten)]
    pub params: Params,
}

impl JWK {
    /// JWK `kty` value for this key
    pub fn kty(&self) -> &'static str {
        match &self.params {
            Params::EC(_) => "EC",
            Params::RSA(_) => "RSA",
        }
    }

    /// Returns true if the JWK carries private key material
    pub fn is_private(&self) -> bool {
        match &self.params {
            Params::EC(params) => params.d.is_some(),
            Params::RSA(params) => params.d.is_some(),
        }
    }

    /// Returns a copy of this JWK with all private members removed
    pub fn to_public(&self) -> JWK {
        let params = match &self.params {
            Params::EC(params) => Params::EC(ECParams {
                curve: params.curve.clone(),
                x: params.x.clone(),
                y: params.y.clone(),
                d: None,
            }),
            Params::RSA(params) => Params::RSA(RSAParams {
                n: params.n.clone(),
                e: params.e.clone(),
                d: None,
                p: None,
                q: None,
                dp: None,
                dq: None,
                qi: None,
            }),
        };

        JWK {
            key_id: self.key_id.clone(),
            alg: self.alg.clone(),
            key_ops: self.key_ops.clone(),
            ext: self.ext,
            params,
        }
    }
}

/// JWK Key Types and associated Parameters
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kty")]
pub enum Params {
    EC(ECParams),
    RSA(RSAParams),
}

/// Elliptic Curve parameters (P-256, P-384, P-521)
#[derive(Debug, Serialize, Deserialize, Clone, Zeroize, PartialEq, ZeroizeOnDrop)]
pub struct ECParams {
    #[serde(rename = "crv")]
    pub curve: String,
    pub x: String,
    pub y: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

/// RSA parameters, private members are only present on private keys
#[derive(Debug, Serialize, Deserialize, Clone, Zeroize, PartialEq, ZeroizeOnDrop)]
pub struct RSAParams {
    pub n: String,
    pub e: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
}

/// Permitted key operations (`key_ops` / Web Crypto key usages)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum KeyUsage {
    Sign,
    Verify,
    Encrypt,
    Decrypt,
    WrapKey,
    UnwrapKey,
    DeriveKey,
    DeriveBits,
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KeyUsage::Sign => write!(f, "sign"),
            KeyUsage::Verify => write!(f, "verify"),
            KeyUsage::Encrypt => write!(f, "encrypt"),
            KeyUsage::Decrypt => write!(f, "decrypt"),
            KeyUsage::WrapKey => write!(f, "wrapKey"),
            KeyUsage::UnwrapKey => write!(f, "unwrapKey"),
            KeyUsage::DeriveKey => write!(f, "deriveKey"),
            KeyUsage::DeriveBits => write!(f, "deriveBits"),
        }
    }
}

/// JWK Set, the published bundle of public keys
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct JwkSet {
    pub keys: Vec<JWK>,
}

impl JwkSet {
    /// Finds a key by its `kid`
    pub fn find(&self, key_id: &str) -> Option<&JWK> {
        self.keys
            .iter()
            .find(|jwk| jwk.key_id.as_deref() == Some(key_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_ec_jwk() {
        let raw = r#"{
            "crv": "P-256",
            "d": "kQrTUKhBU-6bHbCdiY0dIfg3knd5U2-1FlLGGHSbF6U",
            "kty": "EC",
            "x": "sl56LMzaiR5efwwWU1jzC_dfbxQ8gzyLj_N1q2cJmkE",
            "y": "UnAimUtlHMPj_T_wIDVPoJAolKHy8DoXXTb8wch4hgU",
            "key_ops": ["sign"],
            "ext": true
        }"#;

        let jwk: JWK = serde_json::from_str(raw).expect("Couldn't deserialize JWK");

        assert_eq!(
            jwk.params,
            Params::EC(ECParams {
                curve: "P-256".to_string(),
                x: "sl56LMzaiR5efwwWU1jzC_dfbxQ8gzyLj_N1q2cJmkE".to_string(),
                y: "UnAimUtlHMPj_T_wIDVPoJAolKHy8DoXXTb8wch4hgU".to_string(),
                d: Some("kQrTUKhBU-6bHbCdiY0dIfg3knd5U2-1FlLGGHSbF6U".to_string())
            })
        );
        assert_eq!(jwk.key_ops, Some(vec![KeyUsage::Sign]));
        assert!(jwk.is_private());
        assert_eq!(jwk.kty(), "EC");
    }

    #[test]
    fn deserialize_rsa_public_jwk() {
        let raw = r#"{
            "kty": "RSA",
            "kid": "abc",
            "alg": "RS256",
            "n": "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw",
            "e": "AQAB"
        }"#;

        let jwk: JWK = serde_json::from_str(raw).expect("Couldn't deserialize JWK");

        assert_eq!(jwk.kty(), "RSA");
        assert_eq!(jwk.key_id.as_deref(), Some("abc"));
        assert!(!jwk.is_private());
    }

    #[test]
    fn to_public_strips_private_members() {
        let jwk = JWK {
            key_id: Some("kid".into()),
            alg: Some("RS256".into()),
            key_ops: Some(vec![KeyUsage::Sign]),
            ext: Some(true),
            params: Params::RSA(RSAParams {
                n: "n".into(),
                e: "AQAB".into(),
                d: Some("d".into()),
                p: Some("p".into()),
                q: Some("q".into()),
                dp: Some("dp".into()),
                dq: Some("dq".into()),
                qi: Some("qi".into()),
            }),
        };

        let public = jwk.to_public();
        assert!(!public.is_private());

        let value = serde_json::to_value(&public).unwrap();
        for member in ["d", "p", "q", "dp", "dq", "qi"] {
            assert!(value.get(member).is_none(), "{member} leaked");
        }
        assert_eq!(value["kty"], "RSA");
        assert_eq!(value["kid"], "kid");
    }

    #[test]
    fn key_usage_names() {
        let usages: Vec<KeyUsage> =
            serde_json::from_str(r#"["sign","verify","wrapKey","deriveBits"]"#).unwrap();
        assert_eq!(
            usages,
            vec![
                KeyUsage::Sign,
                KeyUsage::Verify,
                KeyUsage::WrapKey,
                KeyUsage::DeriveBits
            ]
        );
        assert_eq!(KeyUsage::UnwrapKey.to_string(), "unwrapKey");
    }

    #[test]
    fn jwk_set_find() {
        let raw = r#"{"keys":[{"kty":"EC","kid":"one","crv":"P-256","x":"a","y":"b"}]}"#;
        let set: JwkSet = serde_json::from_str(raw).unwrap();
        assert!(set.find("one").is_some());
        assert!(set.find("two").is_none());
    }
}
