//! Validation of untrusted form and query input.
//!
//! Validation is a tagged result, not control flow: [`Validate::validate`]
//! returns either the typed value or a [`FieldErrors`] report that the caller
//! renders inline next to the form.

use std::num::NonZeroU32;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::Credentials;
use crate::repository::{DateRange, ListQuery};
use crate::secret::Secret;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|e| panic!("email pattern: {e}"))
});

static COLLECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9_-]{0,63}$").unwrap_or_else(|e| panic!("collection pattern: {e}"))
});

const MAX_EMAIL_LEN: usize = 254;

/// Turns raw input into a typed value or a per-field error report.
pub trait Validate {
    /// The validated value.
    type Output;

    /// Validates every field and reports all failures at once.
    ///
    /// # Errors
    ///
    /// Returns [`FieldErrors`] if any field is invalid.
    fn validate(self) -> Result<Self::Output, FieldErrors>;
}

/// Per-field outcome of a validation pass.
///
/// Serializes as `{"errors": {"<field>": "<message>" | false}}`, listing every
/// checked field in order; `false` means the field passed.
///
/// ```
/// use session_gate::validate::{LoginForm, Validate};
///
/// let errors = LoginForm {
///     email: "notanemail".to_string(),
///     password: "Secret123".to_string(),
/// }
/// .validate()
/// .unwrap_err();
///
/// assert_eq!(
///     serde_json::to_value(&errors).unwrap(),
///     serde_json::json!({"errors": {"email": "Invalid email", "password": false}})
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    fields: Vec<(&'static str, Option<String>)>,
}

impl FieldErrors {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `field` passed.
    pub fn pass(&mut self, field: &'static str) {
        self.fields.push((field, None));
    }

    /// Records a failure.
    pub fn fail(&mut self, error: ValidationError) {
        self.fields.push((error.field, Some(error.reason)));
    }

    /// Records `field` as passed or failed depending on `outcome`.
    pub fn record<T>(&mut self, field: &'static str, outcome: Result<T, ValidationError>) -> Option<T> {
        match outcome {
            Ok(value) => {
                self.pass(field);
                Some(value)
            }
            Err(error) => {
                self.fail(error);
                None
            }
        }
    }

    /// Returns `true` if any field failed.
    pub fn has_errors(&self) -> bool {
        self.fields.iter().any(|(_, reason)| reason.is_some())
    }

    /// Returns the failure reason for `field`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .and_then(|(_, reason)| reason.as_deref())
    }

    /// Iterates over failures only.
    pub fn errors(&self) -> impl Iterator<Item = ValidationError> + '_ {
        self.fields.iter().filter_map(|(field, reason)| {
            reason
                .as_ref()
                .map(|reason| ValidationError::new(field, reason.clone()))
        })
    }

    /// Returns `value` if nothing failed, otherwise the report.
    pub fn finish<T>(self, value: impl FnOnce() -> Option<T>) -> Result<T, FieldErrors> {
        if self.has_errors() {
            return Err(self);
        }
        value().ok_or(self)
    }
}

impl From<ValidationError> for FieldErrors {
    fn from(error: ValidationError) -> Self {
        let mut errors = FieldErrors::new();
        errors.fail(error);
        errors
    }
}

struct FieldMap<'a>(&'a [(&'static str, Option<String>)]);

impl Serialize for FieldMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, reason) in self.0 {
            match reason {
                Some(reason) => map.serialize_entry(field, reason)?,
                None => map.serialize_entry(field, &false)?,
            }
        }
        map.end()
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("errors", &FieldMap(&self.fields))?;
        map.end()
    }
}

/// Raw login form as submitted.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Email field
    #[serde(default)]
    pub email: String,
    /// Password field
    #[serde(default)]
    pub password: String,
}

fn check_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim();
    if email.len() > MAX_EMAIL_LEN || !EMAIL.is_match(email) {
        return Err(ValidationError::new("email", "Invalid email"));
    }
    Ok(email.to_string())
}

fn check_password(raw: String) -> Result<Secret<String>, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::new("password", "Password is required"));
    }
    Ok(Secret::new(raw))
}

impl Validate for LoginForm {
    type Output = Credentials;

    fn validate(self) -> Result<Credentials, FieldErrors> {
        let mut errors = FieldErrors::new();
        let email = errors.record("email", check_email(&self.email));
        let password = errors.record("password", check_password(self.password));

        errors.finish(|| Some(Credentials {
            email: email?,
            password: password?,
        }))
    }
}

/// Raw reporting query string: `from`, `to`, `page`.
///
/// Empty values are treated as absent, matching what HTML forms submit.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// First day, `YYYY-MM-DD`
    pub from: Option<String>,
    /// Last day, `YYYY-MM-DD`
    pub to: Option<String>,
    /// One-based page number
    pub page: Option<String>,
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn check_date(field: &'static str, raw: &Option<String>) -> Result<Option<NaiveDate>, ValidationError> {
    present(raw)
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| ValidationError::new(field, "Invalid date"))
        })
        .transpose()
}

fn check_page(raw: &Option<String>) -> Result<NonZeroU32, ValidationError> {
    match present(raw) {
        None => Ok(NonZeroU32::MIN),
        Some(s) => s
            .parse::<NonZeroU32>()
            .map_err(|_| ValidationError::new("page", "Page must be a positive integer")),
    }
}

impl Validate for ReportQuery {
    type Output = ListQuery;

    fn validate(self) -> Result<ListQuery, FieldErrors> {
        let mut errors = FieldErrors::new();
        let from = errors.record("from", check_date("from", &self.from));

        let to = check_date("to", &self.to).and_then(|to| match (from.flatten(), to) {
            (Some(from), Some(to)) if from > to => Err(ValidationError::new(
                "to",
                "Start date must not be after end date",
            )),
            _ => Ok(to),
        });
        let to = errors.record("to", to);
        let page = errors.record("page", check_page(&self.page));

        errors.finish(|| {
            Some(ListQuery {
                range: DateRange {
                    from: from?,
                    to: to?,
                },
                page: page?,
                ..ListQuery::default()
            })
        })
    }
}

/// Checks a collection name taken from a request path.
///
/// Names are lowercase ASCII, start with a letter and are at most 64 bytes.
///
/// # Errors
///
/// Returns a [`ValidationError`] on the `collection` field.
pub fn collection_name(raw: &str) -> Result<&str, ValidationError> {
    if COLLECTION.is_match(raw) {
        Ok(raw)
    } else {
        Err(ValidationError::new("collection", "Invalid collection"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn login(email: &str, password: &str) -> Result<Credentials, FieldErrors> {
        LoginForm {
            email: email.to_string(),
            password: password.to_string(),
        }
        .validate()
    }

    fn report(from: Option<&str>, to: Option<&str>, page: Option<&str>) -> Result<ListQuery, FieldErrors> {
        ReportQuery {
            from: from.map(str::to_string),
            to: to.map(str::to_string),
            page: page.map(str::to_string),
        }
        .validate()
    }

    #[test]
    fn valid_login_yields_credentials() {
        let credentials = login("  a@b.com ", "Secret123").unwrap();
        assert_eq!(credentials.email, "a@b.com");
        assert_eq!(credentials.password.expose_secret(), "Secret123");
    }

    #[test]
    fn rejects_malformed_emails() {
        for bad in ["notanemail", "a@b", "@b.com", "a b@c.com", ""] {
            let errors = login(bad, "pw").unwrap_err();
            assert_eq!(errors.get("email"), Some("Invalid email"), "{bad:?}");
        }
    }

    #[test]
    fn reports_every_field() {
        let errors = login("nope", "").unwrap_err();

        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({"errors": {"email": "Invalid email", "password": "Password is required"}})
        );
        assert_eq!(errors.errors().count(), 2);
    }

    #[test]
    fn defaults_to_first_page_without_range() {
        let query = report(None, Some(""), None).unwrap();
        assert_eq!(query, ListQuery::default());
    }

    #[test]
    fn parses_range_and_page() {
        let query = report(Some("2024-01-01"), Some("2024-01-31"), Some("3")).unwrap();

        assert_eq!(query.range.from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(query.range.to, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(query.page.get(), 3);
    }

    #[test]
    fn rejects_bad_dates_and_pages() {
        let errors = report(Some("01/02/2024"), Some("2024-13-01"), Some("0")).unwrap_err();

        assert_eq!(errors.get("from"), Some("Invalid date"));
        assert_eq!(errors.get("to"), Some("Invalid date"));
        assert_eq!(errors.get("page"), Some("Page must be a positive integer"));
    }

    #[test]
    fn rejects_inverted_range() {
        let errors = report(Some("2024-02-01"), Some("2024-01-01"), None).unwrap_err();

        assert_eq!(errors.get("from"), None);
        assert_eq!(errors.get("to"), Some("Start date must not be after end date"));
    }

    #[test]
    fn negative_page_is_rejected() {
        let errors = report(None, None, Some("-1")).unwrap_err();
        assert!(errors.get("page").is_some());
    }

    #[test]
    fn collection_names() {
        assert_eq!(collection_name("stock_items"), Ok("stock_items"));
        assert!(collection_name("Stock").is_err());
        assert!(collection_name("../etc").is_err());
        assert!(collection_name("").is_err());
        assert!(collection_name(&"a".repeat(65)).is_err());
    }

    #[test]
    fn single_error_conversion() {
        let errors: FieldErrors = ValidationError::new("email", "Taken").into();
        assert!(errors.has_errors());
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({"errors": {"email": "Taken"}})
        );
    }
}
