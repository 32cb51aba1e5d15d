//! Error types for crypto provider operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Key error: {0}")]
    KeyError(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Invalid key usage: {0}")]
    InvalidUsage(String),

    #[error("Key is not extractable")]
    NotExtractable,

    #[error("Random source failure: {0}")]
    Random(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
