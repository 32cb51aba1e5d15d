//! Algorithm registry
//!
//! Maps an (operation, JWA identifier) pair to the constructor of the
//! [`KeyPairStrategy`] that handles it. The registry is a plain value owned by
//! the [`crate::KeyChainConfig`], so different key chains can run with
//! different algorithm sets.
//!
//! ```rust
//! use jwk_keychain::{AlgorithmRegistry, Operation};
//!
//! let registry = AlgorithmRegistry::default();
//! assert!(registry.resolve(Operation::GenerateKey, "ES256").is_ok());
//! assert!(registry.normalize("deriveKey", "ES256").is_err());
//! ```

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use tracing::debug;

use crate::{
    errors::{NotSupportedError, Result},
    strategy::{EcKeyPair, KeyPairStrategy, RsaKeyPair, StrategyParams},
};

/// Operations a strategy can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GenerateKey,
    ImportKey,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operation::GenerateKey => write!(f, "generateKey"),
            Operation::ImportKey => write!(f, "importKey"),
        }
    }
}

impl FromStr for Operation {
    type Err = NotSupportedError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "generateKey" => Ok(Operation::GenerateKey),
            "importKey" => Ok(Operation::ImportKey),
            _ => Err(NotSupportedError::Operation(s.to_string())),
        }
    }
}

/// Builds a strategy from normalized leaf parameters
pub type StrategyConstructor =
    Arc<dyn Fn(StrategyParams) -> Result<Box<dyn KeyPairStrategy>> + Send + Sync>;

#[derive(Clone)]
pub struct AlgorithmRegistry {
    constructors: HashMap<(Operation, String), StrategyConstructor>,
}

impl AlgorithmRegistry {
    /// An empty registry, nothing resolves until [`AlgorithmRegistry::define`] is called
    pub fn new() -> Self {
        AlgorithmRegistry {
            constructors: HashMap::new(),
        }
    }

    /// Registers `constructor` for `alg` under `operation`.
    /// An existing registration is replaced.
    pub fn define<F>(&mut self, alg: &str, operation: Operation, constructor: F) -> &mut Self
    where
        F: Fn(StrategyParams) -> Result<Box<dyn KeyPairStrategy>> + Send + Sync + 'static,
    {
        debug!("Registering {alg} for {operation}");
        self.constructors
            .insert((operation, alg.to_string()), Arc::new(constructor));
        self
    }

    /// Registers `constructor` for both `generateKey` and `importKey`
    pub fn define_all<F>(&mut self, alg: &str, constructor: F) -> &mut Self
    where
        F: Fn(StrategyParams) -> Result<Box<dyn KeyPairStrategy>> + Send + Sync + 'static,
    {
        let constructor: StrategyConstructor = Arc::new(constructor);
        for operation in [Operation::GenerateKey, Operation::ImportKey] {
            self.constructors
                .insert((operation, alg.to_string()), constructor.clone());
        }
        self
    }

    /// Looks up a constructor by operation name, as found in serialized input
    pub fn normalize(&self, operation: &str, alg: &str) -> Result<StrategyConstructor> {
        self.resolve(operation.parse()?, alg)
    }

    pub fn resolve(&self, operation: Operation, alg: &str) -> Result<StrategyConstructor> {
        self.constructors
            .get(&(operation, alg.to_string()))
            .cloned()
            .ok_or_else(|| NotSupportedError::Algorithm(alg.to_string()).into())
    }

    /// Registered algorithm identifiers for `operation`, sorted
    pub fn algorithms(&self, operation: Operation) -> Vec<&str> {
        let mut algs: Vec<&str> = self
            .constructors
            .keys()
            .filter(|(op, _)| *op == operation)
            .map(|(_, alg)| alg.as_str())
            .collect();
        algs.sort_unstable();
        algs
    }
}

impl Default for AlgorithmRegistry {
    /// RS256/384/512 and ES256/384/512 for both operations
    fn default() -> Self {
        let mut registry = AlgorithmRegistry::new();

        for alg in ["RS256", "RS384", "RS512"] {
            registry.define_all(alg, |params| {
                Ok(Box::new(RsaKeyPair::new(params)?) as Box<dyn KeyPairStrategy>)
            });
        }
        for alg in ["ES256", "ES384", "ES512"] {
            registry.define_all(alg, |params| {
                Ok(Box::new(EcKeyPair::new(params)?) as Box<dyn KeyPairStrategy>)
            });
        }

        registry
    }
}

impl fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmRegistry")
            .field("generateKey", &self.algorithms(Operation::GenerateKey))
            .field("importKey", &self.algorithms(Operation::ImportKey))
            .finish()
    }
}
