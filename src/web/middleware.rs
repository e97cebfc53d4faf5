//! Session extraction at the request boundary.
//!
//! These functions read the session once per request and derive the
//! [`RequestIdentity`] from it. They do not render responses: a caller that
//! gets [`AuthError::NotAuthenticated`] from [`extract_authenticated`] must
//! redirect to the login page.
//!
//! ```text
//! HTTP Request
//!   ↓
//! RequestAdapter (request id, Cookie header)
//!   ↓
//! extract_session() or extract_authenticated()
//!   ↓
//! SessionExtraction { request_id, record, identity }
//!   ↓
//! ControllerScope::open(request_id, identity, data)
//! ```

use crate::error::AuthError;
use crate::gate::AuthGate;
use crate::identity::{Principal, RequestIdentity};
use crate::record::SessionRecord;
use crate::store::SessionStore;

use super::RequestAdapter;

/// The session state of one request.
#[derive(Debug, Clone)]
pub struct SessionExtraction {
    /// Request id for logging and audit
    pub request_id: String,
    /// Record as loaded from the cookie
    pub record: SessionRecord,
    /// Identity derived from `record`
    pub identity: RequestIdentity,
}

impl SessionExtraction {
    /// Returns the principal when authenticated.
    pub fn principal(&self) -> Option<&Principal> {
        self.identity.principal()
    }
}

/// Loads the session for any request.
///
/// Never fails. A missing or invalid cookie produces an anonymous extraction.
///
/// # Examples
///
/// ```
/// use session_gate::web::{extract_session, RequestAdapter};
/// use session_gate::{CookiePolicy, CookieSessionStore, SigningKeys};
///
/// let store = CookieSessionStore::new(CookiePolicy::new(SigningKeys::new(["k1"]).unwrap()));
/// let adapter = RequestAdapter::new("req-001").with_cookie_header("__session=forged");
///
/// let extraction = extract_session(&store, &adapter);
/// assert_eq!(extraction.request_id, "req-001");
/// assert!(!extraction.identity.is_authenticated());
/// ```
pub fn extract_session<S>(store: &S, adapter: &RequestAdapter) -> SessionExtraction
where
    S: SessionStore + ?Sized,
{
    let record = store.load(adapter.cookie_header());
    let identity = AuthGate::identify(&record);

    SessionExtraction {
        request_id: adapter.request_id().to_string(),
        record,
        identity,
    }
}

/// Loads the session and requires an authenticated identity.
///
/// # Errors
///
/// Returns [`AuthError::NotAuthenticated`] for anonymous requests.
pub fn extract_authenticated<S>(
    store: &S,
    adapter: &RequestAdapter,
) -> Result<SessionExtraction, AuthError>
where
    S: SessionStore + ?Sized,
{
    let record = store.load(adapter.cookie_header());
    let identity = AuthGate::require_authenticated(&record)?;

    Ok(SessionExtraction {
        request_id: adapter.request_id().to_string(),
        record,
        identity,
    })
}
