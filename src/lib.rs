//! Signed cookie sessions with flash messages and request-scoped auth gating.
//!
//! This crate keeps all session state in a client-held, tamper-evident cookie
//! and gates protected operations on the identity stored in it:
//! - **Codec**: HMAC-SHA256 signed cookie values with ordered key rotation
//! - **Store**: reads the `Cookie` header and renders `Set-Cookie` values with fixed attributes
//! - **Flash**: a single one-shot message slot consumed by the next render
//! - **Gate**: the only code that moves a session between anonymous and authenticated
//! - **Scope**: per-request binding of identity to data access that fails fast when anonymous
//!
//! # Core Types
//!
//! - [`SessionRecord`]: the key-value state carried by the cookie
//! - [`SigningKeys`]: ordered secrets, current key first
//! - [`CookieSessionStore`]: [`SessionStore`] over signed cookies
//! - [`AuthGate`]: `require_authenticated`, `login`, `logout`
//! - [`ControllerScope`]: protected CRUD over an injected [`DataAccess`]
//! - [`Secret<T>`]: wrapper that redacts sensitive values in logs/output
//!
//! # Examples
//!
//! ```
//! use session_gate::{
//!     flash, AuthGate, CookiePolicy, CookieSessionStore, FlashEntry, Principal, SessionRecord,
//!     SessionStore, SigningKeys,
//! };
//!
//! let keys = SigningKeys::new(["current-key", "retired-key"]).unwrap();
//! let store = CookieSessionStore::new(CookiePolicy::new(keys));
//!
//! // Log in and schedule a flash for the next page
//! let record = AuthGate::login(SessionRecord::new(), &Principal::new("user-1"));
//! let record = flash::put(record, FlashEntry::success("Welcome back"));
//! let set_cookie = store.commit(&record).unwrap();
//!
//! // Next request: the browser sends the cookie back
//! let cookie_header = set_cookie.as_str().split(';').next().unwrap();
//! let record = store.load(Some(cookie_header));
//! let identity = AuthGate::require_authenticated(&record).unwrap();
//! assert_eq!(identity.principal().unwrap().id, "user-1");
//!
//! let (entry, _record) = flash::take_one(record);
//! assert_eq!(entry.unwrap().title, "Welcome back");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod codec;
pub mod config;
mod error;
pub mod flash;
mod gate;
mod identity;
mod logging;
mod record;
pub mod repository;
mod scope;
mod secret;
mod store;
pub mod validate;
pub mod verify;
pub mod web;

pub use codec::{CookieValue, SigningKeys, MAX_COOKIE_BYTES};
pub use self::config::AppConfig;
pub use error::{
    AuthError, ConfigError, DataAccessError, DecodeError, EncodeError, ScopeError,
    ValidationError,
};
pub use flash::{FlashEntry, FlashStatus};
pub use gate::AuthGate;
pub use identity::{Credentials, Principal, RequestIdentity};
pub use logging::{init_tracing, RequestLog};
pub use record::{SessionRecord, FLASH_KEY, IDENTITY_KEY, ROLES_KEY};
pub use repository::{DataAccess, DateRange, Document, InMemoryRepository, ListQuery, Page};
pub use scope::ControllerScope;
pub use secret::Secret;
pub use store::{
    CookiePolicy, CookieSessionStore, SessionStore, SetCookie, DEFAULT_COOKIE_NAME,
    DEFAULT_MAX_AGE_SECS,
};
pub use verify::{CredentialDirectory, IdentityVerifier};
