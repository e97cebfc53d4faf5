use serde_json::Value;

use crate::error::AuthError;
use crate::identity::{Credentials, Principal, RequestIdentity};
use crate::record::{SessionRecord, IDENTITY_KEY, ROLES_KEY};
use crate::verify::IdentityVerifier;

/// The authentication gate.
///
/// `AuthGate` is the only code that reads or writes identity fields in a
/// [`SessionRecord`]. A session moves from unauthenticated to authenticated
/// only through [`login`](Self::login) with a principal obtained from
/// [`authenticate`](Self::authenticate), and back through
/// [`logout`](Self::logout). A record without a usable identity field is
/// treated as unauthenticated.
///
/// # Examples
///
/// ```
/// use session_gate::{AuthGate, AuthError, Principal, RequestIdentity, SessionRecord};
///
/// let record = SessionRecord::new();
/// assert_eq!(AuthGate::require_authenticated(&record), Err(AuthError::NotAuthenticated));
///
/// let record = AuthGate::login(record, &Principal::new("user-1"));
/// let identity = AuthGate::require_authenticated(&record).unwrap();
/// assert_eq!(identity.principal().unwrap().id, "user-1");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthGate;

impl AuthGate {
    /// Derives the request identity from a session record.
    ///
    /// Never fails: anything other than a non-empty string id is anonymous.
    pub fn identify(record: &SessionRecord) -> RequestIdentity {
        let Some(id) = record.get_str(IDENTITY_KEY).filter(|id| !id.is_empty()) else {
            return RequestIdentity::Anonymous;
        };

        let roles = record
            .get(ROLES_KEY)
            .and_then(Value::as_array)
            .map(|roles| {
                roles
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        RequestIdentity::Authenticated(Principal {
            id: id.to_string(),
            roles,
        })
    }

    /// Requires an authenticated identity.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAuthenticated`] for anonymous records. Callers
    /// must answer with a redirect to the login page, never protected content.
    pub fn require_authenticated(record: &SessionRecord) -> Result<RequestIdentity, AuthError> {
        match Self::identify(record) {
            RequestIdentity::Anonymous => Err(AuthError::NotAuthenticated),
            identity => Ok(identity),
        }
    }

    /// Checks credentials with the identity verifier.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when the verifier rejects them.
    pub async fn authenticate<V>(
        verifier: &V,
        credentials: &Credentials,
    ) -> Result<Principal, AuthError>
    where
        V: IdentityVerifier + ?Sized,
    {
        verifier
            .verify(&credentials.email, &credentials.password)
            .await
    }

    /// Stores the principal's identity in the record.
    ///
    /// Any previous identity is replaced; other keys (such as a pending flash)
    /// are kept.
    pub fn login(record: SessionRecord, principal: &Principal) -> SessionRecord {
        let record = record.with(IDENTITY_KEY, principal.id.clone());
        if principal.roles.is_empty() {
            record.without(ROLES_KEY)
        } else {
            record.with(ROLES_KEY, principal.roles.clone())
        }
    }

    /// Clears identity fields, keeping everything else.
    ///
    /// A flash written earlier in the same request survives logout.
    pub fn logout(record: SessionRecord) -> SessionRecord {
        record.without(IDENTITY_KEY).without(ROLES_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::{self, FlashEntry};
    use crate::secret::Secret;
    use crate::verify::CredentialDirectory;
    use serde_json::json;

    #[test]
    fn empty_record_is_anonymous() {
        let record = SessionRecord::new();
        assert_eq!(AuthGate::identify(&record), RequestIdentity::Anonymous);
        assert_eq!(
            AuthGate::require_authenticated(&record),
            Err(AuthError::NotAuthenticated)
        );
    }

    #[test]
    fn non_string_or_empty_id_is_anonymous() {
        let numeric = SessionRecord::new().with(IDENTITY_KEY, 7);
        let empty = SessionRecord::new().with(IDENTITY_KEY, "");

        assert!(!AuthGate::identify(&numeric).is_authenticated());
        assert!(!AuthGate::identify(&empty).is_authenticated());
    }

    #[test]
    fn login_then_require_succeeds() {
        let principal = Principal::new("user-9").with_roles(["admin", "stock"]);
        let record = AuthGate::login(SessionRecord::new(), &principal);

        let identity = AuthGate::require_authenticated(&record).unwrap();
        assert_eq!(identity, RequestIdentity::Authenticated(principal));
    }

    #[test]
    fn login_without_roles_stores_only_id() {
        let record = AuthGate::login(SessionRecord::new(), &Principal::new("user-1"));

        assert_eq!(record.get_str(IDENTITY_KEY), Some("user-1"));
        assert!(!record.contains(ROLES_KEY));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn relogin_replaces_roles() {
        let admin = Principal::new("a").with_roles(["admin"]);
        let record = AuthGate::login(SessionRecord::new(), &admin);
        let record = AuthGate::login(record, &Principal::new("b"));

        assert_eq!(
            AuthGate::identify(&record),
            RequestIdentity::Authenticated(Principal::new("b"))
        );
    }

    #[test]
    fn non_string_roles_are_ignored() {
        let record = SessionRecord::new()
            .with(IDENTITY_KEY, "user-1")
            .with(ROLES_KEY, json!(["admin", 3, null]));

        let identity = AuthGate::identify(&record);
        assert_eq!(identity.principal().unwrap().roles, vec!["admin".to_string()]);
    }

    #[test]
    fn logout_keeps_pending_flash() {
        let record = AuthGate::login(SessionRecord::new(), &Principal::new("user-1"));
        let record = flash::put(record, FlashEntry::success("Signed out"));

        let record = AuthGate::logout(record);

        assert!(!AuthGate::identify(&record).is_authenticated());
        assert_eq!(flash::peek(&record), Some(FlashEntry::success("Signed out")));
    }

    #[tokio::test]
    async fn authenticate_delegates_to_verifier() {
        let directory = CredentialDirectory::new()
            .with_user(Principal::new("user-1"), "a@b.com", "Secret123")
            .unwrap();

        let good = Credentials {
            email: "a@b.com".to_string(),
            password: Secret::new("Secret123".to_string()),
        };
        let bad = Credentials {
            email: "a@b.com".to_string(),
            password: Secret::new("nope".to_string()),
        };

        assert_eq!(
            AuthGate::authenticate(&directory, &good).await.unwrap().id,
            "user-1"
        );
        assert_eq!(
            AuthGate::authenticate(&directory, &bad).await,
            Err(AuthError::InvalidCredentials)
        );
    }
}
