use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;
use session_gate::web::{extract_authenticated, extract_session, RequestAdapter};
use session_gate::{
    flash, AuthError, AuthGate, ControllerScope, CookiePolicy, CookieSessionStore, Credentials,
    CredentialDirectory, DataAccess, DataAccessError, Document, FlashEntry, FlashStatus,
    InMemoryRepository, ListQuery, Page, Principal, RequestIdentity, ScopeError, Secret,
    SessionRecord, SessionStore, SigningKeys,
};

/// Collaborator that counts calls and always fails.
#[derive(Default)]
struct BrokenRepository {
    calls: AtomicUsize,
}

impl BrokenRepository {
    fn fail(&self) -> DataAccessError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        DataAccessError::new("database unavailable")
    }
}

#[async_trait]
impl DataAccess for BrokenRepository {
    async fn find(&self, _: &str, _: &str) -> Result<Option<Document>, DataAccessError> {
        Err(self.fail())
    }

    async fn list(&self, _: &str, _: &ListQuery) -> Result<Page<Document>, DataAccessError> {
        Err(self.fail())
    }

    async fn insert(&self, _: &str, _: Document) -> Result<String, DataAccessError> {
        Err(self.fail())
    }

    async fn update(&self, _: &str, _: &str, _: Document) -> Result<bool, DataAccessError> {
        Err(self.fail())
    }

    async fn delete(&self, _: &str, _: &str) -> Result<bool, DataAccessError> {
        Err(self.fail())
    }
}

fn store(secrets: &[&str]) -> CookieSessionStore {
    let keys = SigningKeys::new(secrets.iter().copied()).unwrap();
    CookieSessionStore::new(CookiePolicy::new(keys))
}

/// Simulates the browser: keeps the `name=value` part of a `Set-Cookie`.
fn browser_cookie(store: &CookieSessionStore, record: &SessionRecord) -> String {
    let set_cookie = store.commit(record).unwrap();
    set_cookie.as_str().split(';').next().unwrap().to_string()
}

#[test]
fn secret_is_fully_redacted() {
    let signing_key = Secret::new("sk-secret123".to_string());

    let debug_out = format!("{:?}", signing_key);
    assert_eq!(debug_out, "[REDACTED]");
    assert!(!debug_out.contains("sk-secret"));

    let display_out = format!("{}", signing_key);
    assert_eq!(display_out, "[REDACTED]");

    let keys = SigningKeys::new(["sk-secret123"]).unwrap();
    assert!(!format!("{:?}", keys).contains("sk-secret"));
}

#[tokio::test]
async fn login_persists_identity_across_requests() {
    let store = store(&["k1"]);
    let directory = CredentialDirectory::new()
        .with_user(Principal::new("user-1"), "a@b.com", "Secret123")
        .unwrap();

    let credentials = Credentials {
        email: "a@b.com".to_string(),
        password: Secret::new("Secret123".to_string()),
    };
    let principal = AuthGate::authenticate(&directory, &credentials).await.unwrap();
    let record = AuthGate::login(SessionRecord::new(), &principal);

    let adapter = RequestAdapter::new("req-next").with_cookie_header(browser_cookie(&store, &record));
    let session = extract_authenticated(&store, &adapter).unwrap();

    assert_eq!(session.identity, RequestIdentity::Authenticated(principal));
}

#[tokio::test]
async fn anonymous_session_never_reaches_data_access() {
    let store = store(&["k1"]);
    let repo = BrokenRepository::default();

    let adapter = RequestAdapter::new("req-anon").with_cookie_header("__session=tampered.value");
    let session = extract_session(&store, &adapter);
    assert_eq!(
        extract_authenticated(&store, &adapter).unwrap_err(),
        AuthError::NotAuthenticated
    );

    let scope = ControllerScope::open(session.request_id, session.identity, &repo);
    let err = scope.insert("stock", Document::new()).await.unwrap_err();

    assert!(err.is_not_authenticated());
    assert_eq!(err.operation(), "records.insert");
    assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn data_access_failure_becomes_flash_error() {
    let store = store(&["k1"]);
    let repo = BrokenRepository::default();
    let record = AuthGate::login(SessionRecord::new(), &Principal::new("op-1"));

    let identity = AuthGate::require_authenticated(&record).unwrap();
    let scope = ControllerScope::open("req-1", identity, &repo);
    let err = scope.delete("stock", "7").await.unwrap_err();

    assert_eq!(repo.calls.load(Ordering::SeqCst), 1);
    match &err {
        ScopeError::DataAccess { operation, source } => {
            assert_eq!(*operation, "records.delete");
            assert_eq!(source.message(), "database unavailable");
        }
        other => panic!("unexpected error: {}", other),
    }

    let record = flash::put(record, FlashEntry::error("Could not delete record"));
    let next = store.load(Some(&browser_cookie(&store, &record)));
    let (entry, _) = flash::take_one(next);

    let entry = entry.unwrap();
    assert_eq!(entry.status, FlashStatus::Error);
    assert_eq!(entry.title, "Could not delete record");
}

#[tokio::test]
async fn full_request_cycle_with_rotation() {
    let old = store(&["old-key"]);
    let rotated = store(&["new-key", "old-key"]);
    let repo = InMemoryRepository::new();

    // Cookie issued before the rotation
    let record = AuthGate::login(SessionRecord::new(), &Principal::new("op-1"));
    let cookie = browser_cookie(&old, &record);

    // First request after rotation: still authenticated, writes a flash
    let adapter = RequestAdapter::new("req-1").with_cookie_header(cookie);
    let session = extract_authenticated(&rotated, &adapter).unwrap();
    let scope = ControllerScope::open(session.request_id.clone(), session.identity.clone(), &repo);
    let document = json!({"name": "Widget"}).as_object().cloned().unwrap();
    scope.insert("stock", document).await.unwrap();

    let record = flash::put(session.record, FlashEntry::success("Saved"));
    let cookie = browser_cookie(&rotated, &record);

    // Re-signed with the new key, so dropping the old key keeps it valid
    let retired = store(&["new-key"]);
    let next = retired.load(Some(&cookie));
    assert!(AuthGate::identify(&next).is_authenticated());

    let (entry, next) = flash::take_one(next);
    assert_eq!(entry, Some(FlashEntry::success("Saved")));
    assert_eq!(flash::peek(&next), None);
    assert_eq!(repo.count("stock"), 1);
}

#[test]
fn logout_keeps_flash_written_in_same_request() {
    let store = store(&["k1"]);
    let record = AuthGate::login(SessionRecord::new(), &Principal::new("user-1"));

    let record = flash::put(record, FlashEntry::success("Signed out"));
    let record = AuthGate::logout(record);

    let next = store.load(Some(&browser_cookie(&store, &record)));
    assert!(!AuthGate::identify(&next).is_authenticated());
    assert_eq!(flash::peek(&next), Some(FlashEntry::success("Signed out")));
}
