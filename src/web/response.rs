//! Response helpers shared by the handlers.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::flash::FlashEntry;
use crate::store::SetCookie;
use crate::validate::FieldErrors;

/// A rendered page: the page's own fields plus the one-shot flash.
///
/// `flash_message` is always present in the output and is `null` when no
/// flash was pending.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRender<T> {
    #[serde(flatten)]
    body: T,
    flash_message: Option<FlashEntry>,
}

impl<T: Serialize> PageRender<T> {
    /// Wraps `body` with the flash consumed by this request.
    pub fn new(body: T, flash_message: Option<FlashEntry>) -> Self {
        Self {
            body,
            flash_message,
        }
    }
}

fn with_cookie(mut response: Response, set_cookie: Option<SetCookie>) -> Response {
    if let Some(set_cookie) = set_cookie {
        match HeaderValue::try_from(set_cookie.into_inner()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!(error = %e, "Set-Cookie value is not a valid header"),
        }
    }
    response
}

/// `302 Found` to `location`, optionally updating the session.
pub fn redirect(location: &str, set_cookie: Option<SetCookie>) -> Response {
    let response = (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response();
    with_cookie(response, set_cookie)
}

/// `200 OK` with a JSON page, optionally updating the session.
pub fn render<T: Serialize>(page: PageRender<T>, set_cookie: Option<SetCookie>) -> Response {
    with_cookie(Json(page).into_response(), set_cookie)
}

impl IntoResponse for FieldErrors {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}
