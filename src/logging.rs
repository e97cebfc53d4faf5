use std::fmt;

use tracing_subscriber::{fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Request-bound logging handle.
///
/// Every message carries the request id, and the operation name when one is
/// set, so controller-scope failures can be correlated with the request that
/// caused them.
///
/// Secret values are redacted automatically through their `Debug` and
/// `Display` implementations.
#[derive(Debug, Clone, Copy)]
pub struct RequestLog<'a> {
    request_id: &'a str,
    operation: Option<&'static str>,
}

impl<'a> RequestLog<'a> {
    /// Creates a handle for `request_id`.
    pub fn new(request_id: &'a str) -> Self {
        Self {
            request_id,
            operation: None,
        }
    }

    /// Tags subsequent messages with an operation name.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Returns the request id.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    /// Logs an info-level message.
    ///
    /// ```no_run
    /// # use session_gate::{RequestLog, Secret};
    /// let key = Secret::new("signing-key");
    /// RequestLog::new("req-1").info(format_args!("loaded key {:?}", key));
    /// // logs "loaded key [REDACTED]" with request_id=req-1
    /// ```
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(request_id = %self.request_id, operation = self.operation, "{}", args);
    }

    /// Logs a warning-level message.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %self.request_id, operation = self.operation, "{}", args);
    }

    /// Logs an error-level message.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(request_id = %self.request_id, operation = self.operation, "{}", args);
    }

    /// Logs a debug-level message.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, operation = self.operation, "{}", args);
    }
}

/// Installs the global JSON subscriber.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. Calling this more
/// than once is harmless; later calls are ignored.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(subscriber_fmt::layer().json())
        .try_init();
}
