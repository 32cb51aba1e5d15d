use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use jwk_keychain::{
    AlgorithmRegistry, Descriptor, KeyChain, KeyChainConfig, KeyChainConfigBuilder, KeyChainError,
    KeyChainState, KeyNode, NotSupportedError,
    jwk_keychain_crypto::{
        AlgorithmParams, CryptoError, CryptoKey, CryptoKeyPair, CryptoProvider, ImportParams, JWK,
        KeyType, KeyUsage, NamedCurve, ProviderFuture, RustCryptoProvider,
    },
};
use serde_json::{Value, json};

const RS256_DESCRIPTOR: &str =
    r#"{"id_token":{"signing":{"RS256":{"alg":"RS256","modulusLength":2048}}}}"#;

/// Delegates to RustCryptoProvider, counting calls and optionally refusing one curve
#[derive(Default)]
struct CountingProvider {
    inner: RustCryptoProvider,
    generated: AtomicUsize,
    imported: AtomicUsize,
    exported: AtomicUsize,
    random: AtomicUsize,
    refuse: Option<NamedCurve>,
}

impl CountingProvider {
    fn refusing(curve: NamedCurve) -> Self {
        CountingProvider {
            refuse: Some(curve),
            ..Default::default()
        }
    }

    fn total(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
            + self.imported.load(Ordering::SeqCst)
            + self.exported.load(Ordering::SeqCst)
            + self.random.load(Ordering::SeqCst)
    }
}

impl CryptoProvider for CountingProvider {
    fn name(&self) -> &str {
        "CountingProvider"
    }

    fn generate_key_pair<'a>(
        &'a self,
        algorithm: &'a AlgorithmParams,
        extractable: bool,
        usages: &'a [KeyUsage],
    ) -> ProviderFuture<'a, CryptoKeyPair> {
        self.generated.fetch_add(1, Ordering::SeqCst);
        if let AlgorithmParams::Ecdsa { named_curve, .. } = algorithm
            && Some(*named_curve) == self.refuse
        {
            return Box::pin(async move {
                Err::<CryptoKeyPair, _>(CryptoError::KeyError(format!("{named_curve} refused")))
            });
        }
        self.inner.generate_key_pair(algorithm, extractable, usages)
    }

    fn import_key<'a>(
        &'a self,
        jwk: &'a JWK,
        algorithm: &'a ImportParams,
        extractable: bool,
        usages: &'a [KeyUsage],
    ) -> ProviderFuture<'a, CryptoKey> {
        self.imported.fetch_add(1, Ordering::SeqCst);
        self.inner.import_key(jwk, algorithm, extractable, usages)
    }

    fn export_key<'a>(&'a self, key: &'a CryptoKey) -> ProviderFuture<'a, JWK> {
        self.exported.fetch_add(1, Ordering::SeqCst);
        self.inner.export_key(key)
    }

    fn random_bytes(&self, len: usize) -> Result<Vec<u8>, CryptoError> {
        self.random.fetch_add(1, Ordering::SeqCst);
        self.inner.random_bytes(len)
    }
}

fn config_with(provider: Arc<CountingProvider>) -> KeyChainConfig {
    KeyChainConfigBuilder::default()
        .with_provider(provider)
        .build()
}

#[tokio::test]
async fn rs256_scenario() {
    let descriptor: Descriptor = RS256_DESCRIPTOR.parse().unwrap();
    let chain = KeyChain::generate(descriptor, KeyChainConfig::default())
        .await
        .unwrap();

    let entry = chain.entry(&["id_token", "signing", "RS256"]).unwrap();
    assert_eq!(entry.private_jwk().alg.as_deref(), Some("RS256"));
    assert_eq!(entry.public_jwk().kty(), "RSA");

    assert_eq!(chain.jwks().keys.len(), 1);
    assert_eq!(chain.jwks().keys[0].kty(), "RSA");
    assert_eq!(chain.jwks().keys[0].key_id, entry.public_jwk().key_id);
}

#[tokio::test]
async fn every_supported_algorithm() {
    let descriptor = Descriptor::from_value(&json!({
        "rsa": {
            "RS256": { "alg": "RS256", "modulusLength": 2048 },
            "RS384": { "alg": "RS384", "modulusLength": 2048 },
            "RS512": { "alg": "RS512", "modulusLength": 2048 }
        },
        "ec": {
            "ES256": { "alg": "ES256" },
            "ES384": { "alg": "ES384" },
            "ES512": { "alg": "ES512" }
        }
    }))
    .unwrap();

    let chain = KeyChain::generate(descriptor, KeyChainConfig::default())
        .await
        .unwrap();

    for (family, alg, crv) in [
        ("rsa", "RS256", None),
        ("rsa", "RS384", None),
        ("rsa", "RS512", None),
        ("ec", "ES256", Some("P-256")),
        ("ec", "ES384", Some("P-384")),
        ("ec", "ES512", Some("P-521")),
    ] {
        let entry = chain.entry(&[family, alg]).unwrap();
        let private = serde_json::to_value(entry.private_jwk()).unwrap();
        let public = serde_json::to_value(entry.public_jwk()).unwrap();

        assert_eq!(private["alg"], alg);
        assert_eq!(public["alg"], alg);
        if let Some(crv) = crv {
            assert_eq!(private["crv"], crv);
            assert_eq!(public["crv"], crv);
        }
        assert_eq!(entry.private_key().unwrap().key_type(), KeyType::Private);
        assert_eq!(entry.public_key().unwrap().key_type(), KeyType::Public);
    }

    // six asymmetric leaves, six published keys, in any order
    assert_eq!(chain.jwks().keys.len(), 6);
}

#[tokio::test]
async fn parallel_fan_out_populates_every_leaf() {
    let mut leaves = serde_json::Map::new();
    for i in 0..12 {
        leaves.insert(format!("key{i}"), json!({ "alg": "ES256" }));
    }
    let descriptor =
        Descriptor::from_value(&json!({ "group": Value::Object(leaves), "empty": {} })).unwrap();
    assert_eq!(descriptor.leaf_count(), 12);

    let chain = KeyChain::generate(descriptor, KeyChainConfig::default())
        .await
        .unwrap();

    let Some(KeyNode::Branch(group)) = chain.keys().get("group") else {
        panic!("group should be a branch");
    };
    assert_eq!(group.len(), 12);
    assert_eq!(chain.jwks().keys.len(), 12);

    let mut kids: Vec<_> = chain.jwks().keys.iter().map(|k| k.key_id.clone()).collect();
    kids.sort();
    kids.dedup();
    assert_eq!(kids.len(), 12);
}

#[tokio::test]
async fn unsupported_algorithm_is_named() {
    let descriptor = Descriptor::from_value(&json!({ "token": { "sig": { "alg": "PS256" } } }))
        .unwrap();

    let err = KeyChain::generate(descriptor, KeyChainConfig::default())
        .await
        .unwrap_err();

    let KeyChainError::NotSupported(err) = err else {
        panic!("Expected NotSupported");
    };
    assert_eq!(err, NotSupportedError::Algorithm("PS256".into()));
}

#[test]
fn invalid_descriptor_is_named() {
    let err = Descriptor::from_value(&json!({ "token": { "sig": ["RS256"] } })).unwrap_err();

    let KeyChainError::InvalidDescriptor { path, value } = err else {
        panic!("Expected InvalidDescriptor");
    };
    assert_eq!(path, "token.sig");
    assert_eq!(value, json!(["RS256"]));
}

#[tokio::test]
async fn rsa_parameters_rejected_before_provider() {
    let provider = Arc::new(CountingProvider::default());
    let mut registry = AlgorithmRegistry::default();
    registry.define_all("RSA222", |params| {
        Ok(Box::new(jwk_keychain::RsaKeyPair::new(params)?) as Box<dyn jwk_keychain::KeyPairStrategy>)
    });
    let config = KeyChainConfigBuilder::default()
        .with_provider(provider.clone())
        .with_registry(registry)
        .build();

    let descriptor = Descriptor::from_value(&json!({ "sig": { "alg": "RSA222" } })).unwrap();
    let err = KeyChain::generate(descriptor, config).await.unwrap_err();

    assert!(err.to_string().contains("Invalid hash length"));
    assert_eq!(provider.total(), 0);
}

#[tokio::test]
async fn provider_override_is_used() {
    let provider = Arc::new(CountingProvider::default());
    let descriptor = Descriptor::from_value(&json!({
        "a": { "alg": "ES256" },
        "b": { "c": { "alg": "ES384" } }
    }))
    .unwrap();

    let chain = KeyChain::generate(descriptor, config_with(provider.clone()))
        .await
        .unwrap();

    assert_eq!(chain.config().provider().name(), "CountingProvider");
    assert_eq!(provider.generated.load(Ordering::SeqCst), 2);
    assert_eq!(provider.exported.load(Ordering::SeqCst), 4);
    // one kid per JWK
    assert_eq!(provider.random.load(Ordering::SeqCst), 4);
    assert_eq!(provider.imported.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn restore_is_idempotent() {
    let chain = KeyChain::generate(
        Descriptor::from_value(&json!({ "token": { "sig": { "alg": "ES256" } }, "id": { "alg": "ES512" } }))
            .unwrap(),
        KeyChainConfig::default(),
    )
    .await
    .unwrap();
    let data = serde_json::to_value(&chain).unwrap();

    let provider = Arc::new(CountingProvider::default());
    let mut restored = KeyChain::from_serialized(&data, config_with(provider.clone())).unwrap();
    assert_eq!(restored.state(), KeyChainState::Empty);
    assert!(restored.jwk_set().is_none());

    restored.import_keys().await.unwrap();
    assert_eq!(restored.state(), KeyChainState::Ready);
    assert_eq!(provider.imported.load(Ordering::SeqCst), 4);
    let before = restored.entry(&["token", "sig"]).unwrap().private_key().cloned();
    assert!(restored.jwk_set().is_some());

    // second pass attaches nothing new
    restored.import_keys().await.unwrap();
    assert_eq!(provider.imported.load(Ordering::SeqCst), 4);
    let after = restored.entry(&["token", "sig"]).unwrap().private_key().cloned();
    assert_eq!(format!("{before:?}"), format!("{after:?}"));

    assert_eq!(restored.jwks(), chain.jwks());
}

#[tokio::test]
async fn restore_single_jwks() {
    let chain = KeyChain::generate(
        Descriptor::from_value(&json!({ "sig": { "alg": "ES256" } })).unwrap(),
        KeyChainConfig::default(),
    )
    .await
    .unwrap();
    let entry = chain.entry(&["sig"]).unwrap();

    // hand written file: bare JWKs at leaf positions, no jwks member
    let data = json!({
        "descriptor": { "sig": { "alg": "ES256" } },
        "signing": serde_json::to_value(entry.private_jwk()).unwrap(),
        "verify": { "current": serde_json::to_value(entry.public_jwk()).unwrap() }
    });

    let restored = KeyChain::restore(&data, KeyChainConfig::default())
        .await
        .unwrap();

    let Some(KeyNode::Single(signing)) = restored.keys().get("signing") else {
        panic!("signing should be a single JWK");
    };
    assert_eq!(signing.private_key().unwrap().key_type(), KeyType::Private);
    assert!(signing.public_key().is_none());

    let Some(KeyNode::Single(current)) = restored.keys().get_path(&["verify", "current"]) else {
        panic!("verify.current should be a single JWK");
    };
    assert_eq!(current.public_key().unwrap().key_type(), KeyType::Public);

    // rebuilt from the public JWK only
    assert_eq!(restored.jwks().keys.len(), 1);
    assert_eq!(restored.jwks().keys[0].key_id, entry.public_jwk().key_id);
}

#[tokio::test]
async fn failed_rotate_leaves_chain_failed() {
    let provider = Arc::new(CountingProvider::refusing(NamedCurve::P384));
    let descriptor = Descriptor::from_value(&json!({
        "good": { "alg": "ES256" },
        "nested": { "bad": { "alg": "ES384" } }
    }))
    .unwrap();

    let mut chain = KeyChain::new(descriptor, config_with(provider.clone()));
    let err = chain.rotate().await.unwrap_err();

    assert!(matches!(err, KeyChainError::Provider(CryptoError::KeyError(_))));
    assert_eq!(err.to_string(), "Key error: P-384 refused");
    assert_eq!(chain.state(), KeyChainState::Failed);
    assert!(chain.keys().is_empty());
    assert!(chain.jwks().keys.is_empty());
    assert!(chain.jwk_set().is_none());

    assert!(matches!(
        chain.rotate().await,
        Err(KeyChainError::InvalidState(_))
    ));
}

#[tokio::test]
async fn published_jwks_carry_no_private_members() {
    let descriptor = Descriptor::from_value(&json!({
        "rsa": { "alg": "RS256", "modulusLength": 2048 },
        "ec": { "alg": "ES384" }
    }))
    .unwrap();
    let chain = KeyChain::generate(descriptor, KeyChainConfig::default())
        .await
        .unwrap();

    let published: Value = serde_json::from_str(chain.jwk_set().unwrap()).unwrap();
    let keys = published["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 2);
    for key in keys {
        for member in ["d", "p", "q", "dp", "dq", "qi"] {
            assert!(key.get(member).is_none(), "{member} published");
        }
    }

    let serialized = serde_json::to_value(&chain).unwrap();
    for half in ["privateJwk", "publicJwk"] {
        assert!(serialized["ec"].get(half).is_some());
    }
    assert!(serialized["ec"].get("privateKey").is_none());
    assert!(serialized["ec"].get("publicKey").is_none());
}

#[tokio::test]
async fn public_jwk_in_private_slot_is_rejected() {
    let chain = KeyChain::generate(
        Descriptor::from_value(&json!({ "sig": { "alg": "ES256" } })).unwrap(),
        KeyChainConfig::default(),
    )
    .await
    .unwrap();
    let public = serde_json::to_value(chain.entry(&["sig"]).unwrap().public_jwk()).unwrap();

    let data = json!({
        "descriptor": { "sig": { "alg": "ES256" } },
        "sig": { "privateJwk": public.clone(), "publicJwk": public }
    });

    let mut restored = KeyChain::from_serialized(&data, KeyChainConfig::default()).unwrap();
    let err = restored.import_keys().await.unwrap_err();
    assert!(
        matches!(&err, KeyChainError::UnsupportedAlgorithmParameters(msg) if msg.starts_with("sig ")),
        "unexpected error: {err}"
    );
    assert_eq!(restored.state(), KeyChainState::Failed);
    assert!(restored.entry(&["sig"]).is_none());
}

#[tokio::test]
async fn loaded_jwks_are_published_public_only() {
    let chain = KeyChain::generate(
        Descriptor::from_value(&json!({ "sig": { "alg": "ES256" } })).unwrap(),
        KeyChainConfig::default(),
    )
    .await
    .unwrap();
    let entry = chain.entry(&["sig"]).unwrap();

    let mut data = serde_json::to_value(&chain).unwrap();
    data["jwks"] = json!({ "keys": [serde_json::to_value(entry.private_jwk()).unwrap()] });

    let restored = KeyChain::restore(&data, KeyChainConfig::default())
        .await
        .unwrap();

    assert_eq!(restored.jwks().keys.len(), 1);
    assert!(!restored.jwks().keys[0].is_private());
    assert_eq!(restored.jwks().keys[0].key_id, entry.private_jwk().key_id);

    let published: Value = serde_json::from_str(restored.jwk_set().unwrap()).unwrap();
    assert!(published["keys"][0].get("d").is_none());
}

#[tokio::test]
async fn usages_flow_to_key_handles() {
    let descriptor = Descriptor::from_value(&json!({
        "sig": { "alg": "ES256", "usages": ["sign", "verify"] }
    }))
    .unwrap();
    let chain = KeyChain::generate(descriptor, KeyChainConfig::default())
        .await
        .unwrap();

    let entry = chain.entry(&["sig"]).unwrap();
    assert_eq!(entry.private_key().unwrap().usages(), &[KeyUsage::Sign]);
    assert_eq!(entry.public_jwk().key_ops, Some(vec![KeyUsage::Verify]));
}
