//! Tamper-evident encoding of session records.
//!
//! A cookie value has the shape `<payload>.<tag>` where `payload` is the
//! URL-safe base64 of the record's JSON and `tag` is the URL-safe base64 of
//! `HMAC-SHA256(key, payload)`.
//!
//! New cookies are always signed with the first key in [`SigningKeys`].
//! Verification tries every key in order, so a retired key can stay in the
//! list until cookies signed with it have expired.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{ConfigError, DecodeError, EncodeError};
use crate::record::SessionRecord;
use crate::secret::Secret;

type HmacSha256 = Hmac<Sha256>;

/// Upper bound on an encoded cookie value, in bytes.
pub const MAX_COOKIE_BYTES: usize = 4096;

const SEPARATOR: char = '.';

/// Ordered, non-empty list of signing keys. The first key is current.
pub struct SigningKeys {
    keys: Vec<Secret<String>>,
}

impl SigningKeys {
    /// Builds a key list from configuration values, current key first.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoSigningSecret`] if the list is empty or any
    /// entry is blank.
    pub fn new<I, S>(secrets: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_secrets(secrets.into_iter().map(|s| Secret::new(s.into())).collect())
    }

    /// Builds a key list from already-wrapped secrets, such as those
    /// deserialized from configuration.
    ///
    /// # Errors
    ///
    /// Same as [`SigningKeys::new`].
    pub fn from_secrets(keys: Vec<Secret<String>>) -> Result<Self, ConfigError> {
        if keys.is_empty() || keys.iter().any(Secret::is_blank) {
            return Err(ConfigError::NoSigningSecret);
        }
        Ok(Self { keys })
    }

    /// Number of keys, including retired ones.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if no keys are held.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn current(&self) -> &Secret<String> {
        // Non-empty by construction.
        &self.keys[0]
    }

    fn iter(&self) -> impl Iterator<Item = &Secret<String>> {
        self.keys.iter()
    }
}

impl fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeys")
            .field("count", &self.keys.len())
            .finish()
    }
}

/// A signed cookie value as it travels in `Cookie` / `Set-Cookie` headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieValue(String);

impl CookieValue {
    /// Wraps a raw value taken from a request header.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CookieValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn mac_for(key: &Secret<String>) -> HmacSha256 {
    // HMAC accepts any key length
    HmacSha256::new_from_slice(key.expose_secret().as_bytes()).expect("HMAC key of any length")
}

/// Serializes and signs `record` with the current key.
///
/// # Errors
///
/// Returns [`EncodeError::Oversized`] if the result exceeds [`MAX_COOKIE_BYTES`].
///
/// # Examples
///
/// ```
/// use session_gate::{codec, SessionRecord, SigningKeys};
///
/// let keys = SigningKeys::new(["current"]).unwrap();
/// let record = SessionRecord::new().with("id", "user-1");
///
/// let cookie = codec::encode(&record, &keys).unwrap();
/// assert_eq!(codec::decode(&cookie, &keys).unwrap(), record);
/// ```
pub fn encode(record: &SessionRecord, keys: &SigningKeys) -> Result<CookieValue, EncodeError> {
    let json = serde_json::to_vec(record)?;
    let payload = URL_SAFE_NO_PAD.encode(json);

    let mut mac = mac_for(keys.current());
    mac.update(payload.as_bytes());
    let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    let value = format!("{payload}{SEPARATOR}{tag}");
    if value.len() > MAX_COOKIE_BYTES {
        return Err(EncodeError::Oversized {
            size: value.len(),
            limit: MAX_COOKIE_BYTES,
        });
    }

    Ok(CookieValue(value))
}

/// Verifies and parses a cookie value.
///
/// Never panics on attacker-controlled input.
///
/// # Errors
///
/// - [`DecodeError::BadSignature`] if the value is not structurally signed or
///   no key produces a matching tag
/// - [`DecodeError::Malformed`] if the signature matches but the payload is not
///   a valid record
pub fn decode(cookie: &CookieValue, keys: &SigningKeys) -> Result<SessionRecord, DecodeError> {
    let (payload, tag) = cookie
        .as_str()
        .rsplit_once(SEPARATOR)
        .ok_or(DecodeError::BadSignature)?;

    let tag = URL_SAFE_NO_PAD
        .decode(tag)
        .map_err(|_| DecodeError::BadSignature)?;

    let verified = keys.iter().any(|key| {
        let mut mac = mac_for(key);
        mac.update(payload.as_bytes());
        mac.verify_slice(&tag).is_ok()
    });
    if !verified {
        return Err(DecodeError::BadSignature);
    }

    let json = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| DecodeError::Malformed)?;
    serde_json::from_slice(&json).map_err(|_| DecodeError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(list: &[&str]) -> SigningKeys {
        SigningKeys::new(list.iter().copied()).unwrap()
    }

    fn sign_raw(payload: &str, key: &str) -> CookieValue {
        let mut mac = HmacSha256::new_from_slice(key.as_bytes()).unwrap();
        mac.update(payload.as_bytes());
        let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        CookieValue::new(format!("{payload}.{tag}"))
    }

    #[test]
    fn empty_key_list_is_rejected() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            SigningKeys::new(empty),
            Err(ConfigError::NoSigningSecret)
        ));
        assert!(SigningKeys::new(["ok", " "]).is_err());
    }

    #[test]
    fn wrapped_secrets_sign_like_plain_ones() {
        let wrapped = SigningKeys::from_secrets(vec![
            Secret::new("new".to_string()),
            Secret::new("old".to_string()),
        ])
        .unwrap();
        let cookie = encode(&SessionRecord::new().with("id", "u"), &wrapped).unwrap();

        assert!(decode(&cookie, &keys(&["new"])).is_ok());
        assert!(matches!(
            SigningKeys::from_secrets(Vec::new()),
            Err(ConfigError::NoSigningSecret)
        ));
    }

    #[test]
    fn signing_keys_debug_hides_material() {
        let rendered = format!("{:?}", keys(&["very-secret"]));
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("count"));
    }

    #[test]
    fn decodes_with_retired_key() {
        let old = keys(&["old"]);
        let record = SessionRecord::new().with("id", "user-7");
        let cookie = encode(&record, &old).unwrap();

        let rotated = keys(&["new", "old"]);
        assert_eq!(decode(&cookie, &rotated).unwrap(), record);

        let retired = keys(&["new"]);
        assert_eq!(decode(&cookie, &retired), Err(DecodeError::BadSignature));
    }

    #[test]
    fn encodes_with_current_key_only() {
        let rotated = keys(&["new", "old"]);
        let cookie = encode(&SessionRecord::new().with("id", "u"), &rotated).unwrap();

        assert!(decode(&cookie, &keys(&["new"])).is_ok());
        assert_eq!(
            decode(&cookie, &keys(&["old"])),
            Err(DecodeError::BadSignature)
        );
    }

    #[test]
    fn missing_separator_is_bad_signature() {
        let k = keys(&["k"]);
        assert_eq!(
            decode(&CookieValue::new("no-separator-here"), &k),
            Err(DecodeError::BadSignature)
        );
        assert_eq!(decode(&CookieValue::new(""), &k), Err(DecodeError::BadSignature));
    }

    #[test]
    fn garbage_tag_is_bad_signature() {
        let k = keys(&["k"]);
        assert_eq!(
            decode(&CookieValue::new("eyJ9.!!!"), &k),
            Err(DecodeError::BadSignature)
        );
    }

    #[test]
    fn signed_non_json_payload_is_malformed() {
        let payload = URL_SAFE_NO_PAD.encode(b"not json");
        let cookie = sign_raw(&payload, "k");
        assert_eq!(decode(&cookie, &keys(&["k"])), Err(DecodeError::Malformed));
    }

    #[test]
    fn signed_non_object_payload_is_malformed() {
        let payload = URL_SAFE_NO_PAD.encode(b"[1,2,3]");
        let cookie = sign_raw(&payload, "k");
        assert_eq!(decode(&cookie, &keys(&["k"])), Err(DecodeError::Malformed));
    }

    #[test]
    fn signed_invalid_base64_payload_is_malformed() {
        let cookie = sign_raw("***", "k");
        assert_eq!(decode(&cookie, &keys(&["k"])), Err(DecodeError::Malformed));
    }

    #[test]
    fn oversized_record_is_refused() {
        let record = SessionRecord::new().with("blob", "x".repeat(MAX_COOKIE_BYTES));
        let err = encode(&record, &keys(&["k"])).unwrap_err();
        assert!(matches!(err, EncodeError::Oversized { limit: MAX_COOKIE_BYTES, .. }));
    }

    #[test]
    fn nested_values_round_trip() {
        let k = keys(&["k"]);
        let record = SessionRecord::new()
            .with("id", "user-1")
            .with("__flash", json!({"title": "Saved", "status": "success"}));
        let cookie = encode(&record, &k).unwrap();
        assert_eq!(decode(&cookie, &k).unwrap(), record);
    }

    #[test]
    fn cookie_value_is_header_safe() {
        let cookie = encode(&SessionRecord::new().with("id", "ä ö; ,"), &keys(&["k"])).unwrap();
        assert!(cookie
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'));
    }
}
