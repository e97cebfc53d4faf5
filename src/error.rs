//! Error taxonomy for sessions, authentication and request scopes.
//!
//! Each failure family has its own type so callers can map them to distinct
//! user-visible behaviour:
//! - [`DecodeError`] is always recovered into an anonymous session
//! - [`AuthError::NotAuthenticated`] becomes a redirect to the login page
//! - [`AuthError::InvalidCredentials`] and [`ValidationError`] become 400 responses
//! - [`DataAccessError`] is logged and surfaced as a generic flash message

use thiserror::Error;

/// Failure to turn a cookie value back into a session record.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// No configured signing key produced a matching tag.
    #[error("session cookie signature does not match any signing key")]
    BadSignature,
    /// The signature verified but the payload could not be parsed.
    #[error("session cookie payload is malformed")]
    Malformed,
}

/// Failure to turn a session record into a cookie value.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The encoded cookie would exceed what browsers are required to store.
    #[error("encoded session is {size} bytes, limit is {limit}")]
    Oversized {
        /// Encoded size in bytes
        size: usize,
        /// Maximum allowed size in bytes
        limit: usize,
    },
    /// The record could not be serialized.
    #[error("session record could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Authentication failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// The request carries no authenticated identity.
    #[error("authentication required")]
    NotAuthenticated,
    /// The identity verifier rejected the supplied credentials.
    #[error("invalid email or password")]
    InvalidCredentials,
}

/// A single field that failed validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    /// Name of the offending form or query field
    pub field: &'static str,
    /// Human-readable reason, suitable for inline display
    pub reason: String,
}

impl ValidationError {
    /// Creates a validation error for `field`.
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Opaque failure reported by a data-access collaborator.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DataAccessError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DataAccessError {
    /// Creates an error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the collaborator's message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors raised by a [`ControllerScope`](crate::ControllerScope) operation.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// The operation is protected and the request is anonymous.
    #[error("{operation}: {source}")]
    Auth {
        /// Operation that was refused
        operation: &'static str,
        /// Why it was refused
        source: AuthError,
    },
    /// The data-access collaborator failed.
    #[error("{operation} failed: {source}")]
    DataAccess {
        /// Operation that was attempted
        operation: &'static str,
        /// The collaborator's error, unchanged
        source: DataAccessError,
    },
}

impl ScopeError {
    /// Returns the name of the operation that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            ScopeError::Auth { operation, .. } | ScopeError::DataAccess { operation, .. } => {
                operation
            }
        }
    }

    /// Returns `true` if the failure was an authentication refusal.
    pub fn is_not_authenticated(&self) -> bool {
        matches!(
            self,
            ScopeError::Auth {
                source: AuthError::NotAuthenticated,
                ..
            }
        )
    }
}

/// Startup configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Sources could not be read or deserialized.
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    /// No usable signing secret was configured.
    #[error("at least one non-empty session signing secret is required")]
    NoSigningSecret,
    /// A value was present but unusable.
    #[error("invalid configuration value for '{key}': {reason}")]
    Invalid {
        /// Configuration key
        key: &'static str,
        /// What is wrong with it
        reason: String,
    },
}
