//! HTTP handlers for the bundled router.
//!
//! Each handler reads the session once through an extractor, derives a new
//! record as a value and answers with at most one `Set-Cookie` for it.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use serde::Serialize;
use serde_json::Value;

use crate::audit::{AuditEvent, AuditEventKind, AuditOutcome};
use crate::error::{ScopeError, ValidationError};
use crate::flash::{self, FlashEntry};
use crate::gate::AuthGate;
use crate::identity::Principal;
use crate::logging::RequestLog;
use crate::record::SessionRecord;
use crate::repository::{DataAccess, Document, ListQuery, Page};
use crate::scope::ControllerScope;
use crate::store::{SessionStore, SetCookie};
use crate::validate::{collection_name, FieldErrors, LoginForm, ReportQuery, Validate};
use crate::verify::IdentityVerifier;

use super::response::{redirect, render, PageRender};
use super::{extract_authenticated, extract_session, RequestAdapter, SessionExtraction};

/// Login entry point; anonymous requests to protected routes land here.
pub const LOGIN_PATH: &str = "/login";
/// Landing page after login.
pub const HOME_PATH: &str = "/";

/// Collaborators shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session cookie store
    pub store: Arc<dyn SessionStore>,
    /// Credential checker used by the login action
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Document store reached through controller scopes
    pub data: Arc<dyn DataAccess>,
}

impl AppState {
    /// Bundles the collaborators.
    pub fn new(
        store: impl SessionStore + 'static,
        verifier: impl IdentityVerifier + 'static,
        data: impl DataAccess + 'static,
    ) -> Self {
        Self {
            store: Arc::new(store),
            verifier: Arc::new(verifier),
            data: Arc::new(data),
        }
    }

    fn scope(&self, session: &SessionExtraction) -> ControllerScope<'_, dyn DataAccess> {
        ControllerScope::open(
            session.request_id.clone(),
            session.identity.clone(),
            self.data.as_ref(),
        )
    }

    /// Commits `record`, or destroys the cookie when nothing is left in it.
    fn persist(&self, request_id: &str, record: &SessionRecord) -> Option<SetCookie> {
        if record.is_empty() {
            return Some(self.store.destroy(record));
        }
        match self.store.commit(record) {
            Ok(set_cookie) => Some(set_cookie),
            Err(e) => {
                RequestLog::new(request_id).error(format_args!("session not saved: {}", e));
                None
            }
        }
    }

    /// Takes the pending flash, re-committing the session only if one was there.
    fn consume_flash(
        &self,
        request_id: &str,
        record: SessionRecord,
    ) -> (Option<FlashEntry>, Option<SetCookie>) {
        let (entry, record) = flash::take_one(record);
        let set_cookie = match entry {
            Some(_) => self.persist(request_id, &record),
            None => None,
        };
        (entry, set_cookie)
    }
}

/// Session of any request, authenticated or not.
pub struct Session(pub SessionExtraction);

impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let adapter = RequestAdapter::from_headers(&parts.headers);
        Ok(Session(extract_session(state.store.as_ref(), &adapter)))
    }
}

/// Session of an authenticated request.
///
/// Anonymous requests are rejected with a redirect to [`LOGIN_PATH`] and an
/// `AccessDenied` audit event; the handler never runs.
pub struct Authenticated(pub SessionExtraction);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let adapter = RequestAdapter::from_headers(&parts.headers);
        extract_authenticated(state.store.as_ref(), &adapter)
            .map(Authenticated)
            .map_err(|e| {
                RequestLog::new(adapter.request_id())
                    .info(format_args!("{} for {}", e, parts.uri.path()));
                AuditEvent::new(
                    adapter.request_id(),
                    None::<String>,
                    AuditEventKind::AccessDenied,
                    AuditOutcome::Denied,
                )
                .with_path(parts.uri.path())
                .emit();
                redirect(LOGIN_PATH, None)
            })
    }
}

#[derive(Serialize)]
struct LoginPage {}

#[derive(Serialize)]
struct HomePage<'a> {
    user: &'a Principal,
}

fn invalid_credentials() -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.fail(ValidationError::new("email", "Invalid email or password"));
    errors.pass("password");
    errors
}

fn listing_path(collection: &str) -> String {
    format!("/records/{}", collection)
}

fn document_from(fields: BTreeMap<String, String>) -> Document {
    fields
        .into_iter()
        .map(|(field, value)| (field, Value::String(value)))
        .collect()
}

/// GET /login
pub async fn login_page(State(state): State<AppState>, Session(session): Session) -> Response {
    if session.identity.is_authenticated() {
        return redirect(HOME_PATH, None);
    }

    let (entry, set_cookie) = state.consume_flash(&session.request_id, session.record);
    render(PageRender::new(LoginPage {}, entry), set_cookie)
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Session(session): Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let log = RequestLog::new(&session.request_id).with_operation("session.login");

    let credentials = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => return errors.into_response(),
    };

    let principal = match AuthGate::authenticate(state.verifier.as_ref(), &credentials).await {
        Ok(principal) => principal,
        Err(e) => {
            log.info(format_args!("login refused: {}", e));
            AuditEvent::new(
                &session.request_id,
                None::<String>,
                AuditEventKind::Login,
                AuditOutcome::Denied,
            )
            .emit();
            return invalid_credentials().into_response();
        }
    };

    let record = AuthGate::login(session.record, &principal);
    match state.store.commit(&record) {
        Ok(set_cookie) => {
            AuditEvent::new(
                &session.request_id,
                Some(&principal.id),
                AuditEventKind::Login,
                AuditOutcome::Success,
            )
            .emit();
            redirect(HOME_PATH, Some(set_cookie))
        }
        Err(e) => {
            log.error(format_args!("session not saved: {}", e));
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// POST /logout
pub async fn logout(State(state): State<AppState>, Session(session): Session) -> Response {
    let principal = session.principal().map(|p| p.id.clone());
    let record = AuthGate::logout(session.record);
    let set_cookie = state.persist(&session.request_id, &record);

    if principal.is_some() {
        AuditEvent::new(
            &session.request_id,
            principal,
            AuditEventKind::Logout,
            AuditOutcome::Success,
        )
        .emit();
    }
    redirect(LOGIN_PATH, set_cookie)
}

/// GET /
pub async fn home(State(state): State<AppState>, Authenticated(session): Authenticated) -> Response {
    let Some(user) = session.identity.principal() else {
        return redirect(LOGIN_PATH, None);
    };

    let (entry, set_cookie) = state.consume_flash(&session.request_id, session.record);
    render(PageRender::new(HomePage { user }, entry), set_cookie)
}

/// GET /records/{collection}
pub async fn list_records(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    Path(collection): Path<String>,
    Query(params): Query<ReportQuery>,
) -> Response {
    let collection = match collection_name(&collection) {
        Ok(collection) => collection,
        Err(e) => return FieldErrors::from(e).into_response(),
    };
    let query = match params.validate() {
        Ok(query) => query,
        Err(errors) => return errors.into_response(),
    };

    let scope = state.scope(&session);
    match scope.list(collection, &query).await {
        Ok(page) => {
            let (entry, set_cookie) = state.consume_flash(&session.request_id, session.record);
            render(PageRender::new(page, entry), set_cookie)
        }
        Err(e) if e.is_not_authenticated() => redirect(LOGIN_PATH, None),
        Err(e) => {
            // The pending flash stays in the cookie for the next render.
            audit_data_access(&session.request_id, scope.principal(), e.operation(), AuditOutcome::Error);
            let failure = FlashEntry::error("Could not load records");
            render(PageRender::new(empty_page(&query), Some(failure)), None)
        }
    }
}

fn empty_page(query: &ListQuery) -> Page<Document> {
    Page {
        items: Vec::new(),
        page: query.page.get(),
        per_page: query.per_page.get(),
        total: 0,
    }
}

/// POST /records/{collection}
pub async fn create_record(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    Path(collection): Path<String>,
    Form(fields): Form<BTreeMap<String, String>>,
) -> Response {
    let collection = match collection_name(&collection) {
        Ok(collection) => collection,
        Err(e) => return FieldErrors::from(e).into_response(),
    };

    let outcome = state
        .scope(&session)
        .insert(collection, document_from(fields))
        .await
        .map(|_| Mutation::Done("Saved"));
    finish_mutation(&state, session, collection, "records.insert", outcome, "Could not save record")
}

/// POST /records/{collection}/{id}
pub async fn update_record(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    Path((collection, id)): Path<(String, String)>,
    Form(fields): Form<BTreeMap<String, String>>,
) -> Response {
    let collection = match collection_name(&collection) {
        Ok(collection) => collection,
        Err(e) => return FieldErrors::from(e).into_response(),
    };

    let outcome = state
        .scope(&session)
        .update(collection, &id, document_from(fields))
        .await
        .map(|found| if found { Mutation::Done("Updated") } else { Mutation::Missing });
    finish_mutation(&state, session, collection, "records.update", outcome, "Could not update record")
}

/// POST /records/{collection}/{id}/delete
pub async fn delete_record(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    Path((collection, id)): Path<(String, String)>,
) -> Response {
    let collection = match collection_name(&collection) {
        Ok(collection) => collection,
        Err(e) => return FieldErrors::from(e).into_response(),
    };

    let outcome = state
        .scope(&session)
        .delete(collection, &id)
        .await
        .map(|found| if found { Mutation::Done("Deleted") } else { Mutation::Missing });
    finish_mutation(&state, session, collection, "records.delete", outcome, "Could not delete record")
}

enum Mutation {
    Done(&'static str),
    Missing,
}

fn audit_data_access(
    request_id: &str,
    principal: Option<&Principal>,
    operation: &str,
    outcome: AuditOutcome,
) {
    AuditEvent::new(
        request_id,
        principal.map(|p| p.id.as_str()),
        AuditEventKind::DataAccess,
        outcome,
    )
    .with_operation(operation)
    .emit();
}

/// Schedules the outcome flash for the next render and redirects to the listing.
fn finish_mutation(
    state: &AppState,
    session: SessionExtraction,
    collection: &str,
    operation: &'static str,
    outcome: Result<Mutation, ScopeError>,
    failure: &'static str,
) -> Response {
    let entry = match outcome {
        Ok(Mutation::Done(title)) => {
            audit_data_access(&session.request_id, session.principal(), operation, AuditOutcome::Success);
            FlashEntry::success(title)
        }
        Ok(Mutation::Missing) => FlashEntry::error("Record not found"),
        Err(e) if e.is_not_authenticated() => return redirect(LOGIN_PATH, None),
        Err(e) => {
            audit_data_access(&session.request_id, session.principal(), e.operation(), AuditOutcome::Error);
            FlashEntry::error(failure)
        }
    };

    let record = flash::put(session.record, entry);
    let set_cookie = state.persist(&session.request_id, &record);
    redirect(&listing_path(collection), set_cookie)
}
