//! Cookie-backed session store.
//!
//! All session state lives in the client-held cookie, so the store never
//! mutates server-side state: [`SessionStore::load`] reads a request's
//! `Cookie` header, [`SessionStore::commit`] and [`SessionStore::destroy`]
//! produce the `Set-Cookie` value for the response.

use std::fmt;

use cookie::time::Duration;
use cookie::{Cookie, SameSite};

use crate::codec::{self, CookieValue, SigningKeys};
use crate::error::EncodeError;
use crate::record::SessionRecord;

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "__session";

/// Default session lifetime: 30 days.
pub const DEFAULT_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

/// Attributes and keys used for the session cookie.
///
/// `HttpOnly`, `SameSite=Lax` and `Path=/` are always set. `Secure` is set
/// unless the policy was built for a plaintext local context.
#[derive(Debug)]
pub struct CookiePolicy {
    name: String,
    max_age_secs: i64,
    secure: bool,
    keys: SigningKeys,
}

impl CookiePolicy {
    /// Creates a policy with the default name and lifetime, `Secure` on.
    pub fn new(keys: SigningKeys) -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            secure: true,
            keys,
        }
    }

    /// Sets the cookie name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the cookie lifetime in seconds.
    pub fn with_max_age_secs(mut self, max_age_secs: i64) -> Self {
        self.max_age_secs = max_age_secs;
        self
    }

    /// Sets whether the cookie carries `Secure`.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Cookie name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie lifetime in seconds.
    pub fn max_age_secs(&self) -> i64 {
        self.max_age_secs
    }

    /// Whether `Secure` is set.
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Signing keys, current first.
    pub fn keys(&self) -> &SigningKeys {
        &self.keys
    }

    fn build<'c>(&self, value: String) -> Cookie<'c> {
        Cookie::build((self.name.clone(), value))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(Duration::seconds(self.max_age_secs))
            .secure(self.secure)
            .build()
    }
}

/// A rendered `Set-Cookie` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie(String);

impl SetCookie {
    /// Returns the header value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads and writes the per-request session record.
pub trait SessionStore: Send + Sync {
    /// Loads the session from a request's `Cookie` header.
    ///
    /// Never fails. A missing header, a missing cookie or one that does not
    /// decode all yield an empty record, which is the anonymous state.
    fn load(&self, cookie_header: Option<&str>) -> SessionRecord;

    /// Encodes `record` into a `Set-Cookie` value.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if the record cannot be encoded within the
    /// cookie size limit.
    fn commit(&self, record: &SessionRecord) -> Result<SetCookie, EncodeError>;

    /// Produces a `Set-Cookie` value that makes the browser drop the session.
    fn destroy(&self, record: &SessionRecord) -> SetCookie;
}

/// [`SessionStore`] that keeps the whole record in a signed cookie.
///
/// # Examples
///
/// ```
/// use session_gate::{CookiePolicy, CookieSessionStore, SessionRecord, SessionStore, SigningKeys};
///
/// let policy = CookiePolicy::new(SigningKeys::new(["current"]).unwrap()).with_secure(false);
/// let store = CookieSessionStore::new(policy);
///
/// let set_cookie = store.commit(&SessionRecord::new().with("id", "user-1")).unwrap();
/// let pair = set_cookie.as_str().split(';').next().unwrap();
///
/// let loaded = store.load(Some(pair));
/// assert_eq!(loaded.get_str("id"), Some("user-1"));
/// ```
#[derive(Debug)]
pub struct CookieSessionStore {
    policy: CookiePolicy,
}

impl CookieSessionStore {
    /// Creates a store with `policy`.
    pub fn new(policy: CookiePolicy) -> Self {
        Self { policy }
    }

    /// Returns the cookie policy.
    pub fn policy(&self) -> &CookiePolicy {
        &self.policy
    }
}

impl SessionStore for CookieSessionStore {
    fn load(&self, cookie_header: Option<&str>) -> SessionRecord {
        let Some(header) = cookie_header else {
            return SessionRecord::new();
        };

        let candidates = Cookie::split_parse(header)
            .filter_map(Result::ok)
            .filter(|cookie| cookie.name() == self.policy.name);

        for cookie in candidates {
            match codec::decode(&CookieValue::new(cookie.value()), &self.policy.keys) {
                Ok(record) => return record,
                Err(e) => tracing::debug!(error = %e, "ignoring session cookie"),
            }
        }

        SessionRecord::new()
    }

    fn commit(&self, record: &SessionRecord) -> Result<SetCookie, EncodeError> {
        let value = codec::encode(record, &self.policy.keys)?;
        Ok(SetCookie(self.policy.build(value.into_inner()).to_string()))
    }

    fn destroy(&self, record: &SessionRecord) -> SetCookie {
        tracing::debug!(keys = record.len(), "destroying session cookie");
        let mut cookie = self.policy.build(String::new());
        cookie.make_removal();
        SetCookie(cookie.to_string())
    }
}
