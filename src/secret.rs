use std::fmt;

use serde::{Deserialize, Deserializer};

/// A wrapper that keeps signing keys and passwords out of logs.
///
/// `Secret<T>` is used for every value that must stay confidential while
/// passing through the session layer: cookie signing keys loaded from
/// configuration and passwords submitted on the login form. The wrapped
/// value is reachable only through [`expose_secret`](Self::expose_secret).
///
/// # Security Properties
///
/// - Does NOT implement `Deref`, `AsRef`, `Borrow`, `Clone`, `Copy` or `Serialize`
/// - Debug and Display output is always `[REDACTED]`
/// - Can be deserialized, so configuration can load it without an
///   intermediate plain `String` living in a config struct
///
/// # Examples
///
/// ```
/// use session_gate::Secret;
///
/// let key = Secret::new("k3y-2024-rotation".to_string());
/// assert_eq!(format!("{:?}", key), "[REDACTED]");
/// assert_eq!(key.expose_secret(), "k3y-2024-rotation");
/// ```
// Do NOT add Clone, Copy, Default or Serialize derives.
pub struct Secret<T> {
    inner: T,
}

impl<T> Secret<T> {
    /// Wraps a sensitive value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Explicitly exposes the secret value.
    ///
    /// Callers must not log or display the returned reference.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }
}

impl Secret<String> {
    /// Returns `true` if the wrapped string is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.inner.trim().is_empty()
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Secret<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Secret::new)
    }
}
