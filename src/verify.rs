//! Credential verification.

use std::collections::HashMap;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use thiserror::Error;

use crate::error::AuthError;
use crate::identity::Principal;
use crate::secret::Secret;

/// Checks login credentials and resolves the principal they belong to.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Returns the principal for valid credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when the email is unknown or
    /// the password does not match. Implementations must not reveal which.
    async fn verify(&self, email: &str, password: &Secret<String>) -> Result<Principal, AuthError>;
}

/// Failure while registering a user in a [`CredentialDirectory`].
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The password could not be hashed.
    #[error("password hashing failed: {0}")]
    Hash(String),
    /// The email is already registered.
    #[error("email already registered")]
    Duplicate,
}

struct Account {
    principal: Principal,
    password_hash: String,
}

/// In-memory user directory with Argon2 password hashes.
///
/// Emails are matched case-insensitively. Only the PHC hash string is kept.
#[derive(Default)]
pub struct CredentialDirectory {
    accounts: HashMap<String, Account>,
}

impl CredentialDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user, hashing `password`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Duplicate`] if the email is taken.
    pub fn with_user(
        mut self,
        principal: Principal,
        email: &str,
        password: &str,
    ) -> Result<Self, CredentialError> {
        let key = email.trim().to_lowercase();
        if self.accounts.contains_key(&key) {
            return Err(CredentialError::Duplicate);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| CredentialError::Hash(e.to_string()))?
            .to_string();

        self.accounts.insert(
            key,
            Account {
                principal,
                password_hash,
            },
        );
        Ok(self)
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns `true` if no users are registered.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl IdentityVerifier for CredentialDirectory {
    async fn verify(&self, email: &str, password: &Secret<String>) -> Result<Principal, AuthError> {
        let Some(account) = self.accounts.get(&email.trim().to_lowercase()) else {
            tracing::debug!("login attempt for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let parsed = PasswordHash::new(&account.password_hash).map_err(|e| {
            tracing::error!(error = %e, "stored password hash is unreadable");
            AuthError::InvalidCredentials
        })?;

        Argon2::default()
            .verify_password(password.expose_secret().as_bytes(), &parsed)
            .map(|_| account.principal.clone())
            .map_err(|_| AuthError::InvalidCredentials)
    }
}
