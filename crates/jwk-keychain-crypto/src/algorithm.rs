//! Algorithm parameter records passed to a [`crate::CryptoProvider`]

use std::fmt;

use crate::CryptoError;

/// Digest used by a signature algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Maps a digest length in bits to the SHA-2 variant
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            256 => Some(HashAlgorithm::Sha256),
            384 => Some(HashAlgorithm::Sha384),
            512 => Some(HashAlgorithm::Sha512),
            _ => None,
        }
    }

    pub fn bits(&self) -> u16 {
        match self {
            HashAlgorithm::Sha256 => 256,
            HashAlgorithm::Sha384 => 384,
            HashAlgorithm::Sha512 => 512,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SHA-{}", self.bits())
    }
}

/// NIST curves supported for ECDSA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedCurve {
    P256,
    P384,
    P521,
}

impl TryFrom<&str> for NamedCurve {
    type Error = CryptoError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "P-256" => Ok(NamedCurve::P256),
            "P-384" => Ok(NamedCurve::P384),
            "P-521" => Ok(NamedCurve::P521),
            _ => Err(CryptoError::UnsupportedAlgorithm(format!(
                "Unsupported named curve: {value}"
            ))),
        }
    }
}

impl fmt::Display for NamedCurve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NamedCurve::P256 => write!(f, "P-256"),
            NamedCurve::P384 => write!(f, "P-384"),
            NamedCurve::P521 => write!(f, "P-521"),
        }
    }
}

/// Web Crypto algorithm names reported by key handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmName {
    RsassaPkcs1V15,
    Ecdsa,
}

impl fmt::Display for AlgorithmName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AlgorithmName::RsassaPkcs1V15 => write!(f, "RSASSA-PKCS1-v1_5"),
            AlgorithmName::Ecdsa => write!(f, "ECDSA"),
        }
    }
}

/// Parameters for generating a key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmParams {
    RsassaPkcs1V15 {
        modulus_length: usize,
        /// Big-endian public exponent, e.g. `[0x01, 0x00, 0x01]`
        public_exponent: Vec<u8>,
        hash: HashAlgorithm,
    },
    Ecdsa {
        named_curve: NamedCurve,
        hash: HashAlgorithm,
    },
}

impl AlgorithmParams {
    pub fn name(&self) -> AlgorithmName {
        match self {
            AlgorithmParams::RsassaPkcs1V15 { .. } => AlgorithmName::RsassaPkcs1V15,
            AlgorithmParams::Ecdsa { .. } => AlgorithmName::Ecdsa,
        }
    }
}

/// Parameters for importing a key from a JWK
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportParams {
    RsassaPkcs1V15 {
        hash: HashAlgorithm,
    },
    Ecdsa {
        named_curve: NamedCurve,
        hash: HashAlgorithm,
    },
}

impl ImportParams {
    pub fn name(&self) -> AlgorithmName {
        match self {
            ImportParams::RsassaPkcs1V15 { .. } => AlgorithmName::RsassaPkcs1V15,
            ImportParams::Ecdsa { .. } => AlgorithmName::Ecdsa,
        }
    }
}

/// The algorithm a live key handle was created for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAlgorithm {
    pub name: AlgorithmName,
    pub hash: Option<HashAlgorithm>,
    pub named_curve: Option<NamedCurve>,
    pub modulus_length: Option<usize>,
    pub public_exponent: Option<Vec<u8>>,
}

impl KeyAlgorithm {
    pub fn rsa(hash: HashAlgorithm, modulus_length: usize, public_exponent: Vec<u8>) -> Self {
        KeyAlgorithm {
            name: AlgorithmName::RsassaPkcs1V15,
            hash: Some(hash),
            named_curve: None,
            modulus_length: Some(modulus_length),
            public_exponent: Some(public_exponent),
        }
    }

    pub fn ec(named_curve: NamedCurve, hash: HashAlgorithm) -> Self {
        KeyAlgorithm {
            name: AlgorithmName::Ecdsa,
            hash: Some(hash),
            named_curve: Some(named_curve),
            modulus_length: None,
            public_exponent: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_from_bits() {
        assert_eq!(HashAlgorithm::from_bits(384), Some(HashAlgorithm::Sha384));
        assert_eq!(HashAlgorithm::from_bits(222), None);
        assert_eq!(HashAlgorithm::Sha512.to_string(), "SHA-512");
    }

    #[test]
    fn named_curve_names() {
        assert_eq!(NamedCurve::try_from("P-521").unwrap(), NamedCurve::P521);
        assert_eq!(NamedCurve::P521.to_string(), "P-521");
        assert!(NamedCurve::try_from("P-512").is_err());
    }

    #[test]
    fn algorithm_names() {
        assert_eq!(AlgorithmName::RsassaPkcs1V15.to_string(), "RSASSA-PKCS1-v1_5");
        assert_eq!(AlgorithmName::Ecdsa.to_string(), "ECDSA");
    }
}
