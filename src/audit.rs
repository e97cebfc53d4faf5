//! Security audit events for the session layer.
//!
//! Events record who did what and whether it worked: logins, logouts,
//! refused access and data-access failures. They are emitted as structured
//! `tracing` events on the `audit` target so operators can route them
//! separately from application logs.
//!
//! Events never carry passwords, cookie values or request bodies.

use std::fmt;

/// Tracing target audit events are emitted on.
pub const AUDIT_TARGET: &str = "audit";

/// Kind of audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEventKind {
    /// Login attempt
    Login,
    /// Explicit logout
    Logout,
    /// Anonymous request to a protected route
    AccessDenied,
    /// Mutating data access through a controller scope
    DataAccess,
}

impl fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEventKind::Login => write!(f, "login"),
            AuditEventKind::Logout => write!(f, "logout"),
            AuditEventKind::AccessDenied => write!(f, "access_denied"),
            AuditEventKind::DataAccess => write!(f, "data_access"),
        }
    }
}

/// Outcome of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    /// Action succeeded
    Success,
    /// Action was refused
    Denied,
    /// Action failed
    Error,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditOutcome::Success => write!(f, "success"),
            AuditOutcome::Denied => write!(f, "denied"),
            AuditOutcome::Error => write!(f, "error"),
        }
    }
}

/// A structured audit event.
///
/// ```
/// use session_gate::audit::{AuditEvent, AuditEventKind, AuditOutcome};
///
/// let event = AuditEvent::new("req-1", Some("op-7"), AuditEventKind::Login, AuditOutcome::Success);
/// assert_eq!(
///     event.to_string(),
///     "AuditEvent[kind=login, outcome=success, request_id=req-1, principal=op-7]"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    request_id: String,
    principal: Option<String>,
    kind: AuditEventKind,
    outcome: AuditOutcome,
    operation: Option<String>,
    path: Option<String>,
}

impl AuditEvent {
    /// Creates an event with the required fields.
    pub fn new(
        request_id: impl Into<String>,
        principal: Option<impl Into<String>>,
        kind: AuditEventKind,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            principal: principal.map(Into::into),
            kind,
            outcome,
            operation: None,
            path: None,
        }
    }

    /// Names the operation involved, e.g. `records.insert`.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Records the request path (without query string).
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Request identifier.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Principal id, if known.
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Event kind.
    pub fn kind(&self) -> AuditEventKind {
        self.kind
    }

    /// Event outcome.
    pub fn outcome(&self) -> AuditOutcome {
        self.outcome
    }

    /// Operation name, if set.
    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    /// Request path, if set.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Emits the event on the [`AUDIT_TARGET`] tracing target.
    pub fn emit(&self) {
        tracing::info!(
            target: AUDIT_TARGET,
            request_id = %self.request_id,
            principal = self.principal.as_deref(),
            kind = %self.kind,
            outcome = %self.outcome,
            operation = self.operation.as_deref(),
            path = self.path.as_deref(),
            "{}",
            self
        );
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AuditEvent[kind={}, outcome={}, request_id={}, principal={}",
            self.kind,
            self.outcome,
            self.request_id,
            self.principal.as_deref().unwrap_or("<none>")
        )?;

        if let Some(operation) = &self.operation {
            write!(f, ", operation={}", operation)?;
        }
        if let Some(path) = &self.path {
            write!(f, ", path={}", path)?;
        }

        write!(f, "]")
    }
}
