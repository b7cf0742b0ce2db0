//! End-to-end resolution tests against a scripted Vault and plaintext files.

use chrono::{DateTime, TimeDelta, Utc};
use hashi_profile::{Backend, CacheStore, HelperError, ProfileStore, Resolver};
use serde_json::json;
use std::sync::Arc;
use test_utils::fixtures::{
    PROD_PROFILE, STATIC_PROFILE, STATIC_VAULT_DERIVED_NOMAD, StoreDir, cached_vault, expiry_in,
};
use test_utils::mocks::{MockSecretsEngine, PlaintextCipher};

fn prod_engine() -> MockSecretsEngine {
    MockSecretsEngine::new()
        .with_login("t1", 3600)
        .with_secret("consul/creds/ops", json!({"secret_id": "c1", "accessor": "a"}), 1800)
        .with_secret("nomad/creds/ops", json!({"secret_id": "n1"}), 900)
}

fn resolver(
    dir: &StoreDir,
    cipher: &Arc<PlaintextCipher>,
    engine: MockSecretsEngine,
) -> Resolver<MockSecretsEngine> {
    let profiles = ProfileStore::new(dir.profile_file(), cipher.clone());
    let cache = CacheStore::new(dir.cache_file(), cipher.clone());
    Resolver::new(profiles, cache, engine)
}

fn cached_yaml(dir: &StoreDir) -> serde_yaml::Value {
    serde_yaml::from_str(&dir.read_cache().expect("cache written")).unwrap()
}

fn parse_expiry(value: &serde_yaml::Value) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value.as_str().unwrap())
        .unwrap()
        .with_timezone(&Utc)
}

#[tokio::test]
async fn test_first_resolution_logs_in_and_persists() {
    let dir = StoreDir::with_profiles(PROD_PROFILE);
    let cipher = Arc::new(PlaintextCipher::new());
    let mut resolver = resolver(&dir, &cipher, prod_engine());

    let before = Utc::now();
    let exports = resolver.resolve("prod").await.unwrap();

    assert_eq!(
        exports.render(),
        "export VAULT_ADDR=https://vault.prod:8200\n\
         export VAULT_TOKEN=t1\n\
         export CONSUL_HTTP_ADDR=https://consul.prod:8501\n\
         export CONSUL_HTTP_TOKEN=c1\n\
         export NOMAD_ADDR=https://nomad.prod:4646\n\
         export NOMAD_TOKEN=n1\n"
    );

    let engine = resolver.client();
    let logins = engine.login_calls();
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0].mount, "github");
    assert_eq!(logins[0].credentials, json!({"token": "abc"}));
    assert_eq!(engine.address(), Some("https://vault.prod:8200"));

    // dynamic reads authenticate with the token obtained by the login
    let reads = engine.read_calls();
    assert_eq!(reads.len(), 2);
    assert!(reads.iter().all(|r| r.token.as_deref() == Some("t1")));

    let cache = cached_yaml(&dir);
    assert_eq!(cache["prod"]["vault"]["auth"]["token"].as_str(), Some("t1"));
    let expiry = parse_expiry(&cache["prod"]["vault"]["auth"]["expire_time"]);
    assert!(expiry >= before + TimeDelta::seconds(3600));
    assert!(expiry <= Utc::now() + TimeDelta::seconds(3600));
    assert_eq!(cache["prod"]["consul"]["auth"]["token"].as_str(), Some("c1"));
    assert_eq!(cache["prod"]["nomad"]["auth"]["token"].as_str(), Some("n1"));
    assert_eq!(cipher.encrypt_count(), 1);
}

#[tokio::test]
async fn test_second_resolution_reuses_cache() {
    let dir = StoreDir::with_profiles(PROD_PROFILE);
    let cipher = Arc::new(PlaintextCipher::new());

    let first = resolver(&dir, &cipher, prod_engine())
        .resolve("prod")
        .await
        .unwrap();
    let cache_after_first = dir.read_cache();

    let mut second = resolver(&dir, &cipher, MockSecretsEngine::new());
    let exports = second.resolve("prod").await.unwrap();

    assert_eq!(exports, first);
    assert_eq!(exports.get("VAULT_TOKEN"), Some("t1"));
    assert!(second.client().login_calls().is_empty());
    assert!(second.client().read_calls().is_empty());
    // nothing refreshed, nothing written
    assert_eq!(cipher.encrypt_count(), 1);
    assert_eq!(dir.read_cache(), cache_after_first);
}

#[tokio::test]
async fn test_expired_vault_record_triggers_login() {
    let dir = StoreDir::with_profiles(PROD_PROFILE);
    let cache = format!(
        "{}  consul:\n    auth:\n      token: c0\n      expire_time: '{}'\n  nomad:\n    auth:\n      token: n0\n      expire_time: '{}'\n",
        cached_vault("prod", "t0", &expiry_in(-3600)),
        expiry_in(600),
        expiry_in(600),
    );
    dir.write_cache(&cache);
    let cipher = Arc::new(PlaintextCipher::new());
    let mut resolver = resolver(&dir, &cipher, prod_engine());

    let exports = resolver.resolve("prod").await.unwrap();

    assert_eq!(resolver.client().login_calls().len(), 1);
    assert!(resolver.client().read_calls().is_empty());
    assert_eq!(exports.get("VAULT_TOKEN"), Some("t1"));
    assert_eq!(exports.get("CONSUL_HTTP_TOKEN"), Some("c0"));
    assert_eq!(exports.get("NOMAD_TOKEN"), Some("n0"));
    assert_eq!(cached_yaml(&dir)["prod"]["vault"]["auth"]["token"].as_str(), Some("t1"));
}

#[tokio::test]
async fn test_valid_vault_record_skips_login_but_reads_invalid_backends() {
    let dir = StoreDir::with_profiles(PROD_PROFILE);
    let cache = format!(
        "{}  nomad:\n    auth:\n      token: n0\n      expire_time: '{}'\n",
        cached_vault("prod", "t0", &expiry_in(600)),
        expiry_in(600),
    );
    dir.write_cache(&cache);
    let cipher = Arc::new(PlaintextCipher::new());
    let mut resolver = resolver(&dir, &cipher, prod_engine());

    let exports = resolver.resolve("prod").await.unwrap();

    assert!(resolver.client().login_calls().is_empty());
    let reads = resolver.client().read_calls();
    assert_eq!(reads.len(), 1);
    assert_eq!(reads[0].path, "consul/creds/ops");
    assert_eq!(reads[0].token.as_deref(), Some("t0"));
    assert_eq!(exports.get("VAULT_TOKEN"), Some("t0"));
    assert_eq!(exports.get("CONSUL_HTTP_TOKEN"), Some("c1"));
    assert_eq!(exports.get("NOMAD_TOKEN"), Some("n0"));
}

#[tokio::test]
async fn test_token_without_expiry_is_reused() {
    let dir = StoreDir::with_profiles(PROD_PROFILE);
    dir.write_cache(
        "prod:\n  vault:\n    auth:\n      token: forever\n  consul:\n    auth:\n      token: c-forever\n  nomad:\n    auth:\n      token: n-forever\n",
    );
    let cipher = Arc::new(PlaintextCipher::new());
    let mut resolver = resolver(&dir, &cipher, MockSecretsEngine::new());

    let exports = resolver.resolve("prod").await.unwrap();

    assert_eq!(exports.get("VAULT_TOKEN"), Some("forever"));
    assert_eq!(exports.get("NOMAD_TOKEN"), Some("n-forever"));
    assert!(resolver.client().login_calls().is_empty());
    assert_eq!(cipher.encrypt_count(), 0);
}

#[tokio::test]
async fn test_malformed_expiry_forces_refresh() {
    let dir = StoreDir::with_profiles(PROD_PROFILE);
    dir.write_cache(&cached_vault("prod", "t0", "next tuesday"));
    let cipher = Arc::new(PlaintextCipher::new());
    let mut resolver = resolver(&dir, &cipher, prod_engine());

    let exports = resolver.resolve("prod").await.unwrap();

    assert_eq!(resolver.client().login_calls().len(), 1);
    assert_eq!(exports.get("VAULT_TOKEN"), Some("t1"));
}

#[tokio::test]
async fn test_static_profile_never_touches_cache() {
    let dir = StoreDir::with_profiles(STATIC_PROFILE);
    let existing = cached_vault("prod", "t0", &expiry_in(600));
    dir.write_cache(&existing);
    let cipher = Arc::new(PlaintextCipher::new());
    let mut resolver = resolver(&dir, &cipher, MockSecretsEngine::new());

    let exports = resolver.resolve("static").await.unwrap();

    assert_eq!(
        exports.render(),
        "export VAULT_ADDR=https://vault.lab:8200\n\
         export VAULT_TOKEN=s.static\n\
         export VAULT_UNSEAL_KEY=unseal-me\n\
         export CONSUL_HTTP_TOKEN=consul-static\n"
    );
    // only the profile file was decrypted
    assert_eq!(cipher.decrypt_count(), 1);
    assert_eq!(cipher.encrypt_count(), 0);
    assert_eq!(dir.read_cache().as_deref(), Some(existing.as_str()));
    assert_eq!(resolver.client().token(), Some("s.static"));
}

#[tokio::test]
async fn test_static_vault_token_authenticates_dynamic_reads() {
    let dir = StoreDir::with_profiles(STATIC_VAULT_DERIVED_NOMAD);
    let cipher = Arc::new(PlaintextCipher::new());
    let engine = MockSecretsEngine::new().with_secret("nomad/creds/ops", json!({"secret_id": "n9"}), 60);
    let mut resolver = resolver(&dir, &cipher, engine);

    let exports = resolver.resolve("ops").await.unwrap();

    assert_eq!(
        exports.names().collect::<Vec<_>>(),
        ["VAULT_TOKEN", "NOMAD_TOKEN"]
    );
    assert_eq!(exports.get("NOMAD_TOKEN"), Some("n9"));
    let reads = resolver.client().read_calls();
    assert_eq!(reads[0].token.as_deref(), Some("s.ops"));
    // static tokens are never cached
    let cache = cached_yaml(&dir);
    assert!(cache["ops"].get("vault").is_none());
    assert_eq!(cache["ops"]["nomad"]["auth"]["token"].as_str(), Some("n9"));
}

#[tokio::test]
async fn test_other_profiles_survive_refresh() {
    let dir = StoreDir::with_profiles(PROD_PROFILE);
    dir.write_cache(&cached_vault("staging", "s.staging", &expiry_in(-10)));
    let cipher = Arc::new(PlaintextCipher::new());

    resolver(&dir, &cipher, prod_engine())
        .resolve("prod")
        .await
        .unwrap();

    let cache = cached_yaml(&dir);
    assert_eq!(
        cache["staging"]["vault"]["auth"]["token"].as_str(),
        Some("s.staging")
    );
    assert_eq!(cache["prod"]["vault"]["auth"]["token"].as_str(), Some("t1"));
}

#[tokio::test]
async fn test_login_failure_aborts_without_persisting() {
    let dir = StoreDir::with_profiles(PROD_PROFILE);
    let cipher = Arc::new(PlaintextCipher::new());
    let engine = MockSecretsEngine::new().with_login_failure("bad credentials");
    let mut resolver = resolver(&dir, &cipher, engine);

    let err = resolver.resolve("prod").await.unwrap_err();

    match &err {
        HelperError::BackendAuth { profile, backend, .. } => {
            assert_eq!(profile, "prod");
            assert_eq!(*backend, Backend::Vault);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("bad credentials"));
    assert!(dir.read_cache().is_none());
    assert_eq!(cipher.encrypt_count(), 0);
}

#[tokio::test]
async fn test_later_backend_failure_leaves_cache_untouched() {
    let dir = StoreDir::with_profiles(PROD_PROFILE);
    let existing = cached_vault("prod", "t0", &expiry_in(-1));
    dir.write_cache(&existing);
    let cipher = Arc::new(PlaintextCipher::new());
    let engine = MockSecretsEngine::new()
        .with_login("t1", 3600)
        .with_secret("consul/creds/ops", json!({"secret_id": "c1"}), 60)
        .with_read_failure("nomad/creds/ops", "connection reset");
    let mut resolver = resolver(&dir, &cipher, engine);

    let err = resolver.resolve("prod").await.unwrap_err();

    assert!(matches!(
        err,
        HelperError::BackendAuth { backend: Backend::Nomad, .. }
    ));
    assert_eq!(dir.read_cache().as_deref(), Some(existing.as_str()));
    assert_eq!(cipher.encrypt_count(), 0);
}

#[tokio::test]
async fn test_malformed_secret_payload_is_backend_error() {
    let dir = StoreDir::with_profiles(PROD_PROFILE);
    let cipher = Arc::new(PlaintextCipher::new());
    let engine = MockSecretsEngine::new()
        .with_login("t1", 3600)
        .with_secret("consul/creds/ops", json!({"secret_id": 17}), 60);
    let mut resolver = resolver(&dir, &cipher, engine);

    let err = resolver.resolve("prod").await.unwrap_err();
    assert!(matches!(
        err,
        HelperError::BackendAuth { backend: Backend::Consul, .. }
    ));
}

#[tokio::test]
async fn test_missing_github_token_is_configuration_error() {
    let dir = StoreDir::with_profiles("prod:\n  vault:\n    auth:\n      method: github\n");
    let cipher = Arc::new(PlaintextCipher::new());
    let mut resolver = resolver(&dir, &cipher, prod_engine());

    let err = resolver.resolve("prod").await.unwrap_err();

    match err {
        HelperError::Configuration(msg) => {
            assert!(msg.contains("missing required external token"), "{msg}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(resolver.client().login_calls().is_empty());
}

#[tokio::test]
async fn test_missing_creds_path_is_configuration_error() {
    let dir = StoreDir::with_profiles(
        "prod:\n  vault:\n    auth:\n      token: s.x\n  consul:\n    auth:\n      method: vault\n",
    );
    let cipher = Arc::new(PlaintextCipher::new());
    let mut resolver = resolver(&dir, &cipher, MockSecretsEngine::new());

    let err = resolver.resolve("prod").await.unwrap_err();
    assert!(matches!(err, HelperError::Configuration(msg) if msg.contains("creds_path")));
}

#[tokio::test]
async fn test_unsupported_method_is_configuration_error() {
    let dir = StoreDir::with_profiles("prod:\n  vault:\n    auth:\n      method: approle\n");
    let cipher = Arc::new(PlaintextCipher::new());
    let mut resolver = resolver(&dir, &cipher, MockSecretsEngine::new());

    let err = resolver.resolve("prod").await.unwrap_err();
    assert!(matches!(err, HelperError::Configuration(msg) if msg.contains("approle")));
}

#[tokio::test]
async fn test_custom_mount_is_used() {
    let dir = StoreDir::with_profiles(
        "prod:\n  vault:\n    auth:\n      method: github\n      github_token: abc\n      mount: gh-corp\n",
    );
    let cipher = Arc::new(PlaintextCipher::new());
    let mut resolver = resolver(&dir, &cipher, prod_engine());

    resolver.resolve("prod").await.unwrap();
    assert_eq!(resolver.client().login_calls()[0].mount, "gh-corp");
}

#[tokio::test]
async fn test_profile_lookup_errors() {
    let dir = StoreDir::with_profiles(PROD_PROFILE);
    let cipher = Arc::new(PlaintextCipher::new());
    let mut resolver = resolver(&dir, &cipher, MockSecretsEngine::new());

    let err = resolver.resolve("nope").await.unwrap_err();
    assert!(
        matches!(err, HelperError::Configuration(ref msg) if msg == "No profile with the name 'nope' was found")
    );

    let err = resolver.resolve("").await.unwrap_err();
    assert!(matches!(err, HelperError::Configuration(_)));
    assert!(dir.read_cache().is_none());
}

#[tokio::test]
async fn test_missing_profile_file_is_configuration_error() {
    let dir = StoreDir::new();
    let cipher = Arc::new(PlaintextCipher::new());
    let mut resolver = resolver(&dir, &cipher, MockSecretsEngine::new());

    let err = resolver.resolve("prod").await.unwrap_err();
    assert!(matches!(err, HelperError::Configuration(msg) if msg.contains("does not exist")));
}

#[tokio::test]
async fn test_corrupt_cache_is_fatal() {
    let dir = StoreDir::with_profiles(PROD_PROFILE);
    dir.write_cache("prod: [this is: not, a cache");
    let cipher = Arc::new(PlaintextCipher::new());
    let mut resolver = resolver(&dir, &cipher, prod_engine());

    let err = resolver.resolve("prod").await.unwrap_err();
    assert!(matches!(err, HelperError::CacheCorruption { .. }));
    assert!(resolver.client().login_calls().is_empty());
}

#[tokio::test]
async fn test_encrypt_failure_is_best_effort_by_default() {
    let dir = StoreDir::with_profiles(PROD_PROFILE);
    let cipher = Arc::new(PlaintextCipher::new());
    cipher.fail_encrypt(true);
    let mut resolver = resolver(&dir, &cipher, prod_engine());

    let exports = resolver.resolve("prod").await.unwrap();

    assert_eq!(exports.get("VAULT_TOKEN"), Some("t1"));
    assert_eq!(cipher.encrypt_count(), 1);
    assert!(dir.read_cache().is_none());
}

#[tokio::test]
async fn test_encrypt_failure_is_fatal_in_strict_mode() {
    let dir = StoreDir::with_profiles(PROD_PROFILE);
    let cipher = Arc::new(PlaintextCipher::new());
    cipher.fail_encrypt(true);
    let profiles = ProfileStore::new(dir.profile_file(), cipher.clone());
    let cache = CacheStore::new(dir.cache_file(), cipher.clone()).with_strict_persistence(true);
    let mut resolver = Resolver::new(profiles, cache, prod_engine());

    let err = resolver.resolve("prod").await.unwrap_err();
    assert!(matches!(err, HelperError::Persistence { .. }));
    assert_eq!(err.exit_code(), 74);
}

#[tokio::test]
async fn test_github_login_falls_back_to_auth_token() {
    let dir = StoreDir::with_profiles(
        "dev:\n  vault:\n    server: https://vault.dev:8200\n    auth:\n      method: github\n      token: gh-dev\n",
    );
    let cipher = Arc::new(PlaintextCipher::new());
    let mut resolver = resolver(&dir, &cipher, prod_engine());

    let exports = resolver.resolve("dev").await.unwrap();

    assert_eq!(
        resolver.client().login_calls()[0].credentials,
        json!({"token": "gh-dev"})
    );
    // the login input is not a Vault token and is never exported
    assert_eq!(
        exports.render(),
        "export VAULT_ADDR=https://vault.dev:8200\nexport VAULT_TOKEN=t1\n"
    );
}

#[tokio::test]
async fn test_null_profile_sections_resolve() {
    let dir = StoreDir::with_profiles(&format!("empty: ~\npartial:\n  vault:\n  consul: ~\n{PROD_PROFILE}"));
    dir.write_cache("prod: ~\nstale:\n  vault: ~\n");
    let cipher = Arc::new(PlaintextCipher::new());
    let mut resolver = resolver(&dir, &cipher, prod_engine());

    assert!(resolver.resolve("empty").await.unwrap().is_empty());
    assert!(resolver.resolve("partial").await.unwrap().is_empty());

    // a null cache entry is a cache miss, not corruption
    let exports = resolver.resolve("prod").await.unwrap();
    assert_eq!(exports.get("VAULT_TOKEN"), Some("t1"));
    assert_eq!(resolver.client().login_calls().len(), 1);
}

#[tokio::test]
async fn test_unsupported_method_is_reported_before_cache_is_read() {
    let dir = StoreDir::with_profiles(
        "prod:\n  vault:\n    auth:\n      method: github\n      github_token: abc\n  nomad:\n    auth:\n      method: approle\n",
    );
    dir.write_cache("prod: [this is: not, a cache");
    let cipher = Arc::new(PlaintextCipher::new());
    let mut resolver = resolver(&dir, &cipher, prod_engine());

    let err = resolver.resolve("prod").await.unwrap_err();

    assert!(matches!(err, HelperError::Configuration(msg) if msg.contains("approle")));
    // only the profile file was decrypted
    assert_eq!(cipher.decrypt_count(), 1);
    assert!(resolver.client().login_calls().is_empty());
}
