/*!
 * KeyChain Errors
 */

use std::fmt;

use jwk_keychain_crypto::CryptoError;
use serde_json::Value;
use thiserror::Error;

/// What wasn't supported when resolving a strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotSupportedError {
    /// Operation name that isn't `generateKey` or `importKey`
    Operation(String),
    /// Algorithm identifier with nothing registered for the operation
    Algorithm(String),
}

impl NotSupportedError {
    /// The operation or algorithm name that was rejected
    pub fn name(&self) -> &str {
        match self {
            NotSupportedError::Operation(name) | NotSupportedError::Algorithm(name) => name,
        }
    }
}

impl fmt::Display for NotSupportedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NotSupportedError::Operation(operation) => {
                write!(f, "Operation '{operation}' is not supported")
            }
            NotSupportedError::Algorithm(alg) => write!(f, "{alg} is not a supported algorithm"),
        }
    }
}

impl std::error::Error for NotSupportedError {}

/// KeyChain Errors
#[derive(Error, Debug)]
pub enum KeyChainError {
    #[error("Not Supported: {0}")]
    NotSupported(#[from] NotSupportedError),

    #[error("Invalid Descriptor: '{path}' has invalid value {value}")]
    InvalidDescriptor { path: String, value: Value },

    #[error("Unsupported Algorithm Parameters: {0}")]
    UnsupportedAlgorithmParameters(String),

    #[error(transparent)]
    Provider(#[from] CryptoError),

    #[error("Invalid State: {0}")]
    InvalidState(String),

    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Task Error: {0}")]
    Task(String),
}

impl KeyChainError {
    pub(crate) fn invalid_descriptor(path: &[String], value: &Value) -> Self {
        KeyChainError::InvalidDescriptor {
            path: path.join("."),
            value: value.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KeyChainError>;
