use mockito::{Matcher, Server};
use now_playing_proxy as lib;
use lib::api::spotify_auth::TokenManager;
use lib::config::Config;
use lib::error::ProxyError;
use lib::models::AccessToken;
use lib::store::{KvStore, MemoryStore};
use serde_json::json;
use std::sync::Arc;

const NOW: i64 = 1_700_000_000_000;

fn test_config(base: &str) -> Config {
    Config {
        client_id: "test_client".into(),
        auth_base: base.to_string(),
        api_base: base.to_string(),
        ..Config::default()
    }
}

fn stored_token(expires_at: i64) -> String {
    json!({
        "access_token": "old-access",
        "refresh_token": "old-refresh",
        "token_type": "Bearer",
        "expires_in": 3600,
        "expires_at": expires_at
    })
    .to_string()
}

async fn seeded_store(cfg: &Config, token_json: &str) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.put(&cfg.keys.token, token_json).await.expect("seed token");
    store
}

#[test]
fn token_inside_buffer_is_refreshed_and_keeps_refresh_token() {
    let mut server = Server::new();
    let cfg = test_config(&server.url());

    let m = server
        .mock("POST", "/api/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "old-refresh".into()),
            Matcher::UrlEncoded("client_id".into(), "test_client".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"access_token": "new-access", "token_type": "Bearer", "expires_in": 3600}).to_string())
        .expect(1)
        .create();

    let rt = tokio::runtime::Runtime::new().expect("rt");
    rt.block_on(async {
        // 4 minutes left: inside the 5 minute buffer
        let store = seeded_store(&cfg, &stored_token(NOW + 4 * 60 * 1000)).await;
        let manager = TokenManager::new(&cfg, store.clone(), reqwest::Client::new());

        let token = manager.get_valid_token_at(NOW).await.expect("token");
        assert_eq!(token.access_token, "new-access");
        assert_eq!(token.refresh_token, "old-refresh");
        assert_eq!(token.expires_at, NOW + 3600 * 1000);

        let persisted = store.get(&cfg.keys.token).await.unwrap().expect("persisted");
        let persisted: AccessToken = serde_json::from_str(&persisted).unwrap();
        assert_eq!(persisted, token);
    });
    m.assert();
}

#[test]
fn token_outside_buffer_is_used_as_is() {
    let mut server = Server::new();
    let cfg = test_config(&server.url());
    let m = server.mock("POST", "/api/token").expect(0).create();

    let rt = tokio::runtime::Runtime::new().expect("rt");
    rt.block_on(async {
        let raw = stored_token(NOW + 6 * 60 * 1000);
        let store = seeded_store(&cfg, &raw).await;
        let manager = TokenManager::new(&cfg, store.clone(), reqwest::Client::new());

        let token = manager.get_valid_token_at(NOW).await.expect("token");
        assert_eq!(token.access_token, "old-access");
        // nothing written back when no refresh happened
        assert_eq!(store.get(&cfg.keys.token).await.unwrap().unwrap(), raw);
    });
    m.assert();
}

#[test]
fn rotated_refresh_token_replaces_old_one() {
    let mut server = Server::new();
    let cfg = test_config(&server.url());
    let _m = server
        .mock("POST", "/api/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"access_token": "new-access", "expires_in": 1800, "refresh_token": "rotated"}).to_string())
        .create();

    let rt = tokio::runtime::Runtime::new().expect("rt");
    rt.block_on(async {
        let store = seeded_store(&cfg, &stored_token(0)).await;
        let manager = TokenManager::new(&cfg, store.clone(), reqwest::Client::new());
        let token = manager.get_valid_token_at(NOW).await.expect("token");
        assert_eq!(token.refresh_token, "rotated");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 1800);
        assert_eq!(token.expires_at, NOW + 1_800_000);
    });
}

#[test]
fn rejected_refresh_is_authentication_error() {
    let mut server = Server::new();
    let cfg = test_config(&server.url());
    let _m = server
        .mock("POST", "/api/token")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(json!({"error": "invalid_grant"}).to_string())
        .create();

    let rt = tokio::runtime::Runtime::new().expect("rt");
    rt.block_on(async {
        let raw = stored_token(NOW - 1000);
        let store = seeded_store(&cfg, &raw).await;
        let manager = TokenManager::new(&cfg, store.clone(), reqwest::Client::new());
        let err = manager.get_valid_token_at(NOW).await.unwrap_err();
        match &err {
            ProxyError::Authentication(msg) => assert!(msg.contains("400")),
            other => panic!("expected authentication error, got {:?}", other),
        }
        assert_eq!(err.status_code(), 401);
        // old token left untouched
        assert_eq!(store.get(&cfg.keys.token).await.unwrap().unwrap(), raw);
    });
}

#[tokio::test]
async fn missing_token_is_authentication_error() {
    let cfg = test_config("http://127.0.0.1:9");
    let store = Arc::new(MemoryStore::new());
    let manager = TokenManager::new(&cfg, store, reqwest::Client::new());
    let err = manager.get_valid_token_at(NOW).await.unwrap_err();
    assert!(matches!(err, ProxyError::Authentication(_)));
}

#[tokio::test]
async fn unreadable_token_is_uncategorized() {
    let cfg = test_config("http://127.0.0.1:9");
    let store = seeded_store(&cfg, "not json").await;
    let manager = TokenManager::new(&cfg, store, reqwest::Client::new());
    let err = manager.get_valid_token_at(NOW).await.unwrap_err();
    assert!(matches!(err, ProxyError::Uncategorized(_)));
    assert_eq!(err.status_code(), 500);
}

#[tokio::test]
async fn legacy_expires_field_is_honoured() {
    let cfg = test_config("http://127.0.0.1:9");
    let raw = json!({
        "access_token": "legacy",
        "refresh_token": "r",
        "token_type": "Bearer",
        "expires_in": 3600,
        "expires": NOW + 60 * 60 * 1000
    })
    .to_string();
    let store = seeded_store(&cfg, &raw).await;
    let manager = TokenManager::new(&cfg, store, reqwest::Client::new());
    let token = manager.get_valid_token_at(NOW).await.expect("token");
    assert_eq!(token.access_token, "legacy");
}

#[test]
fn huge_expires_in_is_uncategorized_and_not_persisted() {
    let mut server = Server::new();
    let cfg = test_config(&server.url());
    let _m = server
        .mock("POST", "/api/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"x","expires_in":9223372036854775}"#)
        .create();

    let rt = tokio::runtime::Runtime::new().expect("rt");
    rt.block_on(async {
        let raw = stored_token(0);
        let store = seeded_store(&cfg, &raw).await;
        let manager = TokenManager::new(&cfg, store.clone(), reqwest::Client::new());
        let err = manager.get_valid_token_at(NOW).await.unwrap_err();
        assert!(matches!(err, ProxyError::Uncategorized(_)));
        assert_eq!(err.status_code(), 500);
        assert_eq!(store.get(&cfg.keys.token).await.unwrap().unwrap(), raw);
    });
}

#[test]
fn extreme_expiry_values_do_not_overflow_validity_check() {
    let token: AccessToken = serde_json::from_str(&stored_token(i64::MIN)).unwrap();
    assert!(!token.is_usable_at(NOW, 5 * 60 * 1000));
    assert!(!token.is_usable_at(NOW, i64::MAX));

    let token: AccessToken = serde_json::from_str(&stored_token(i64::MAX)).unwrap();
    assert!(token.is_usable_at(NOW, 5 * 60 * 1000));
}
