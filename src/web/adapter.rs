//! Request adapter for mapping HTTP requests to session-gate types.

use axum::http::{header, HeaderMap};
use uuid::Uuid;

/// Header carrying a caller-supplied request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// The parts of an HTTP request the session layer reads.
///
/// `RequestAdapter` holds simple, owned data so it can be built from any
/// framework's request type. [`from_headers`](Self::from_headers) covers the
/// `http` crate used by axum.
///
/// # Examples
///
/// ```
/// use session_gate::web::RequestAdapter;
///
/// let adapter = RequestAdapter::new("req-12345").with_cookie_header("__session=abc");
///
/// assert_eq!(adapter.request_id(), "req-12345");
/// assert_eq!(adapter.cookie_header(), Some("__session=abc"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestAdapter {
    request_id: String,
    cookie_header: Option<String>,
}

impl RequestAdapter {
    /// Creates an adapter with the given request id and no cookies.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            cookie_header: None,
        }
    }

    /// Sets the raw `Cookie` header.
    pub fn with_cookie_header(mut self, cookie_header: impl Into<String>) -> Self {
        self.cookie_header = Some(cookie_header.into());
        self
    }

    /// Builds an adapter from request headers.
    ///
    /// The request id is taken from `x-request-id` when it is present and
    /// printable, otherwise a fresh UUID v4 is generated. Multiple `Cookie`
    /// headers are joined the way HTTP/2 requires.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let cookies: Vec<&str> = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();

        Self {
            request_id,
            cookie_header: (!cookies.is_empty()).then(|| cookies.join("; ")),
        }
    }

    /// Returns the request id.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the raw `Cookie` header, if any.
    pub fn cookie_header(&self) -> Option<&str> {
        self.cookie_header.as_deref()
    }
}
