use crate::error::{AuthError, DataAccessError, ScopeError};
use crate::identity::{Principal, RequestIdentity};
use crate::logging::RequestLog;
use crate::repository::{DataAccess, Document, ListQuery, Page};

/// Request-scoped binding of an identity to the data-access collaborator.
///
/// A scope is opened once per request, borrows the collaborator for the
/// request's lifetime and is dropped with it. It is never shared between
/// requests.
///
/// Every CRUD operation is protected: with an anonymous identity it fails
/// with [`AuthError::NotAuthenticated`] before the collaborator is called.
/// Collaborator errors are not retried; they are logged and returned tagged
/// with the operation name.
///
/// # Examples
///
/// ```
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// use session_gate::{ControllerScope, InMemoryRepository, ListQuery, Principal, RequestIdentity};
///
/// let repo = InMemoryRepository::new();
///
/// let anonymous = ControllerScope::open("req-1", RequestIdentity::Anonymous, &repo);
/// let err = anonymous.list("stock", &ListQuery::default()).await.unwrap_err();
/// assert!(err.is_not_authenticated());
///
/// let operator = RequestIdentity::Authenticated(Principal::new("op-1"));
/// let scope = ControllerScope::open("req-2", operator, &repo);
/// assert_eq!(scope.list("stock", &ListQuery::default()).await.unwrap().total, 0);
/// # });
/// ```
pub struct ControllerScope<'a, D: ?Sized> {
    request_id: String,
    identity: RequestIdentity,
    data: &'a D,
}

impl<'a, D> ControllerScope<'a, D>
where
    D: DataAccess + ?Sized,
{
    /// Opens a scope for one request.
    pub fn open(request_id: impl Into<String>, identity: RequestIdentity, data: &'a D) -> Self {
        Self {
            request_id: request_id.into(),
            identity,
            data,
        }
    }

    /// Returns the request id this scope belongs to.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the identity the scope was opened with.
    pub fn identity(&self) -> &RequestIdentity {
        &self.identity
    }

    /// Returns the principal if the request is authenticated.
    pub fn principal(&self) -> Option<&Principal> {
        self.identity.principal()
    }

    /// Checks that a protected operation may run.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Auth`] for anonymous requests.
    pub fn authorize(&self, operation: &'static str) -> Result<&Principal, ScopeError> {
        match self.identity.principal() {
            Some(principal) => Ok(principal),
            None => {
                self.log(operation)
                    .warn(format_args!("refused protected operation for anonymous request"));
                Err(ScopeError::Auth {
                    operation,
                    source: AuthError::NotAuthenticated,
                })
            }
        }
    }

    fn log(&self, operation: &'static str) -> RequestLog<'_> {
        RequestLog::new(&self.request_id).with_operation(operation)
    }

    fn tag(&self, operation: &'static str, source: DataAccessError) -> ScopeError {
        self.log(operation)
            .error(format_args!("data access failed: {}", source));
        ScopeError::DataAccess { operation, source }
    }

    /// Fetches a document.
    pub async fn find(&self, collection: &str, id: &str) -> Result<Option<Document>, ScopeError> {
        const OP: &str = "records.find";
        self.authorize(OP)?;
        self.data
            .find(collection, id)
            .await
            .map_err(|e| self.tag(OP, e))
    }

    /// Lists a collection with date-range filter and pagination.
    pub async fn list(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<Page<Document>, ScopeError> {
        const OP: &str = "records.list";
        self.authorize(OP)?;
        self.data
            .list(collection, query)
            .await
            .map_err(|e| self.tag(OP, e))
    }

    /// Stores a new document and returns its id.
    pub async fn insert(&self, collection: &str, document: Document) -> Result<String, ScopeError> {
        const OP: &str = "records.insert";
        let principal = self.authorize(OP)?;
        let id = self
            .data
            .insert(collection, document)
            .await
            .map_err(|e| self.tag(OP, e))?;
        self.log(OP).info(format_args!(
            "principal {} inserted {}/{}",
            principal.id, collection, id
        ));
        Ok(id)
    }

    /// Updates a document. Returns `false` if it does not exist.
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<bool, ScopeError> {
        const OP: &str = "records.update";
        self.authorize(OP)?;
        self.data
            .update(collection, id, document)
            .await
            .map_err(|e| self.tag(OP, e))
    }

    /// Deletes a document. Returns `false` if it does not exist.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<bool, ScopeError> {
        const OP: &str = "records.delete";
        let principal = self.authorize(OP)?;
        let removed = self
            .data
            .delete(collection, id)
            .await
            .map_err(|e| self.tag(OP, e))?;
        if removed {
            self.log(OP).info(format_args!(
                "principal {} deleted {}/{}",
                principal.id, collection, id
            ));
        }
        Ok(removed)
    }
}
