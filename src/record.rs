//! The session record carried inside the signed cookie.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key under which the authenticated principal's id is stored.
pub const IDENTITY_KEY: &str = "id";
/// Key under which the authenticated principal's roles are stored.
pub const ROLES_KEY: &str = "roles";
/// Key under which the single pending flash entry is stored.
pub const FLASH_KEY: &str = "__flash";

/// String-keyed session state.
///
/// A record is a plain value: operations that change it take `self` and
/// return the new record, so a request derives its outgoing session from the
/// incoming one without ever observing an intermediate state.
///
/// Keys are kept ordered so the same record always serializes to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionRecord {
    values: BTreeMap<String, Value>,
}

impl SessionRecord {
    /// Creates an empty (anonymous) record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns the string stored under `key`, if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns a record with `key` set to `value`, replacing any previous value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Returns a record without `key`.
    pub fn without(mut self, key: &str) -> Self {
        self.values.remove(key);
        self
    }

    /// Removes `key` and returns its previous value alongside the new record.
    pub fn take(mut self, key: &str) -> (Option<Value>, Self) {
        let value = self.values.remove(key);
        (value, self)
    }

    /// Returns `true` if no keys are set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of keys set.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Iterates over keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl FromIterator<(String, Value)> for SessionRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn with_and_without_are_pure() {
        let original = SessionRecord::new().with(IDENTITY_KEY, "user-1");
        let cleared = original.clone().without(IDENTITY_KEY);

        assert_eq!(original.get_str(IDENTITY_KEY), Some("user-1"));
        assert!(cleared.is_empty());
    }

    #[test]
    fn take_returns_value_and_remainder() {
        let record = SessionRecord::new()
            .with(FLASH_KEY, json!({"title": "Saved"}))
            .with(IDENTITY_KEY, "user-1");

        let (value, rest) = record.take(FLASH_KEY);

        assert_eq!(value, Some(json!({"title": "Saved"})));
        assert!(!rest.contains(FLASH_KEY));
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn serializes_as_flat_object_in_key_order() {
        let record = SessionRecord::new().with("b", 2).with("a", 1);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn get_str_ignores_non_strings() {
        let record = SessionRecord::new().with(IDENTITY_KEY, 42);
        assert_eq!(record.get_str(IDENTITY_KEY), None);
        assert!(record.get(IDENTITY_KEY).is_some());
    }
}
