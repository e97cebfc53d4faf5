use serde::Serialize;

use crate::secret::Secret;

/// An authenticated user as returned by the identity verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Stable identifier stored in the session
    pub id: String,
    /// Roles or scopes, if the verifier assigns any
    pub roles: Vec<String>,
}

impl Principal {
    /// A principal with no roles.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
        }
    }

    /// Adds roles.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }
}

/// Who is making the current request.
///
/// Derived once from the session record at the start of request handling and
/// never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestIdentity {
    /// No valid session identity
    #[default]
    Anonymous,
    /// A logged-in principal
    Authenticated(Principal),
}

impl RequestIdentity {
    /// Returns the principal when authenticated.
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            RequestIdentity::Anonymous => None,
            RequestIdentity::Authenticated(principal) => Some(principal),
        }
    }

    /// Returns `true` when a principal is present.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, RequestIdentity::Authenticated(_))
    }
}

/// Credentials submitted on the login action.
#[derive(Debug)]
pub struct Credentials {
    /// Login email, already validated for shape
    pub email: String,
    /// Password, redacted in any formatted output
    pub password: Secret<String>,
}
