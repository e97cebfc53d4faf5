//! Web integration surface.
//!
//! The boundary between HTTP and the session core:
//! - [`RequestAdapter`] maps a request's headers to a request id and the raw
//!   `Cookie` header, with no framework types beyond `http::HeaderMap`
//! - [`extract_session`] and [`extract_authenticated`] load the record once per
//!   request and derive its identity
//! - [`router`] wires the bundled axum handlers, which decide redirects,
//!   renders and the single `Set-Cookie` each response carries
//!
//! # Example Flow
//!
//! ```ignore
//! let adapter = RequestAdapter::from_headers(&headers);
//! let session = extract_authenticated(&store, &adapter)?; // else redirect to /login
//!
//! let scope = ControllerScope::open(session.request_id, session.identity, &repo);
//! scope.insert("stock", document).await?;
//!
//! let record = flash::put(session.record, FlashEntry::success("Saved"));
//! let set_cookie = store.commit(&record)?;
//! ```

mod adapter;
pub mod handlers;
mod middleware;
pub mod response;
mod router;

pub use adapter::{RequestAdapter, REQUEST_ID_HEADER};
pub use handlers::{AppState, HOME_PATH, LOGIN_PATH};
pub use middleware::{extract_authenticated, extract_session, SessionExtraction};
pub use router::router;
