//! Session lifecycle against the fake API: sign-in, persistence across
//! restarts, token expiry and an unreachable server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use secrecy::SecretString;
use shopswift_client::storage::TOKEN_KEY;
use shopswift_client::{
    ApiClient, ClientSession, FileStore, KeyValueStore, NoticeLevel, SessionError, SessionManager,
    SessionState,
};
use shopswift_integration_tests::{FakeShop, config_for, unreachable_api_url};
use tempfile::TempDir;

const EMAIL: &str = "ada@example.com";
const PASSWORD: &str = "correct horse";

fn password(raw: &str) -> SecretString {
    SecretString::from(raw.to_owned())
}

fn session(shop: &FakeShop, dir: &TempDir) -> ClientSession {
    let config = shop.config(&dir.path().join("session.json"));
    let api = ApiClient::new(&config).unwrap();
    SessionManager::create(api, FileStore::new(&config.token_file))
}

#[tokio::test]
async fn test_login_persists_token_across_restart() {
    let shop = FakeShop::start().await;
    shop.add_user(EMAIL, PASSWORD, false);
    let dir = TempDir::new().unwrap();

    let first = session(&shop, &dir);
    let user = first.login(EMAIL, &password(PASSWORD)).await.unwrap();
    assert_eq!(user.email, EMAIL);
    assert!(first.snapshot().is_authenticated());
    let store = first.teardown().expect("last handle returns the store");
    assert!(store.get(TOKEN_KEY).unwrap().is_some());

    let second = session(&shop, &dir);
    assert_eq!(second.snapshot().state(), SessionState::Authenticating);
    assert!(second.check_auth().await);
    assert_eq!(second.require_user().unwrap().email, EMAIL);
    assert_eq!(shop.hits("GET /api/auth/me"), 1);
}

#[tokio::test]
async fn test_wrong_password_leaves_session_anonymous() {
    let shop = FakeShop::start().await;
    shop.add_user(EMAIL, PASSWORD, false);
    let dir = TempDir::new().unwrap();
    let manager = session(&shop, &dir);
    let mut notices = manager.notices();

    let err = manager.login(EMAIL, &password("wrong")).await.unwrap_err();

    assert!(
        matches!(&err, SessionError::InvalidCredentials(reason) if reason == "Incorrect email or password")
    );
    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, "Incorrect email or password");

    let snapshot = manager.snapshot();
    assert_eq!(snapshot.state(), SessionState::Anonymous);
    assert!(!snapshot.is_loading());
    assert!(!dir.path().join("session.json").exists());
}

#[tokio::test]
async fn test_register_signs_in_and_rejects_duplicates() {
    let shop = FakeShop::start().await;
    let dir = TempDir::new().unwrap();
    let manager = session(&shop, &dir);

    let user = manager
        .register("grace@example.com", &password(PASSWORD), Some("Grace Hopper"))
        .await
        .unwrap();
    assert_eq!(user.display_name(), "Grace Hopper");
    assert!(manager.snapshot().is_authenticated());

    manager.logout();
    let err = manager
        .register("grace@example.com", &password(PASSWORD), None)
        .await
        .unwrap_err();
    assert!(
        matches!(&err, SessionError::InvalidCredentials(reason) if reason == "Email already registered")
    );
}

#[tokio::test]
async fn test_malformed_email_is_rejected_locally() {
    let shop = FakeShop::start().await;
    let dir = TempDir::new().unwrap();
    let manager = session(&shop, &dir);

    let err = manager
        .register("not-an-email", &password(PASSWORD), None)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::InvalidEmail(_)));
    assert_eq!(shop.total_hits(), 0);
}

#[tokio::test]
async fn test_expired_token_is_cleared_by_check_auth() {
    let shop = FakeShop::start().await;
    shop.add_user(EMAIL, PASSWORD, false);
    let dir = TempDir::new().unwrap();

    let manager = session(&shop, &dir);
    manager.login(EMAIL, &password(PASSWORD)).await.unwrap();
    shop.expire_tokens();

    assert!(!manager.check_auth().await);
    let snapshot = manager.snapshot();
    assert_eq!(snapshot.state(), SessionState::Anonymous);
    assert!(!snapshot.has_token());

    let store = manager.teardown().unwrap();
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_admin_login_greets_admin() {
    let shop = FakeShop::start().await;
    shop.add_user("root@example.com", PASSWORD, true);
    let dir = TempDir::new().unwrap();
    let manager = session(&shop, &dir);
    let mut notices = manager.notices();

    manager
        .login("root@example.com", &password(PASSWORD))
        .await
        .unwrap();

    assert_eq!(notices.recv().await.unwrap().message, "Welcome back, Admin!");
    assert!(manager.require_admin().is_ok());
}

#[tokio::test]
async fn test_unreachable_server_is_network_failure() {
    let dir = TempDir::new().unwrap();
    let config = config_for(
        &unreachable_api_url().await,
        &dir.path().join("session.json"),
    );
    let manager = SessionManager::create(
        ApiClient::new(&config).unwrap(),
        FileStore::new(&config.token_file),
    );

    let err = manager.login(EMAIL, &password(PASSWORD)).await.unwrap_err();

    assert!(matches!(err, SessionError::NetworkFailure(_)));
    assert_eq!(manager.snapshot().state(), SessionState::Anonymous);
    assert!(!manager.snapshot().is_loading());
}

#[tokio::test]
async fn test_unreachable_server_clears_persisted_token() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");
    FileStore::new(&path).set(TOKEN_KEY, "stale-token").unwrap();

    let config = config_for(&unreachable_api_url().await, &path);
    let manager = SessionManager::create(ApiClient::new(&config).unwrap(), FileStore::new(&path));
    assert!(manager.snapshot().has_token());

    assert!(!manager.check_auth().await);
    assert_eq!(manager.snapshot().state(), SessionState::Anonymous);
    assert_eq!(FileStore::new(&path).get(TOKEN_KEY).unwrap(), None);
}
