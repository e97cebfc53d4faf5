//! One-shot messages carried from an action to the next page render.
//!
//! A flash entry lives in the session record under [`FLASH_KEY`]. There is at
//! most one pending entry: [`put`] overwrites, [`take_one`] consumes. Because
//! the entry shares the session cookie, it expires with the session rather
//! than on a short timer; reading it is what deletes it.

use serde::{Deserialize, Serialize};

use crate::record::{SessionRecord, FLASH_KEY};

/// Outcome category of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashStatus {
    /// The action succeeded
    Success,
    /// The action failed
    Error,
}

/// A message shown exactly once on the render following an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashEntry {
    /// Headline text
    pub title: String,
    /// Optional detail line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Success or error styling
    pub status: FlashStatus,
}

impl FlashEntry {
    /// A success message with no description.
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: FlashStatus::Success,
        }
    }

    /// An error message with no description.
    pub fn error(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: FlashStatus::Error,
        }
    }

    /// Adds a description line.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Returns the pending entry without consuming it.
///
/// An entry that does not parse is reported as absent.
pub fn peek(record: &SessionRecord) -> Option<FlashEntry> {
    record
        .get(FLASH_KEY)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

/// Consumes the pending entry.
///
/// The returned record never contains a flash entry, even if the stored one
/// was unreadable.
///
/// # Examples
///
/// ```
/// use session_gate::{flash, FlashEntry, SessionRecord};
///
/// let record = flash::put(SessionRecord::new(), FlashEntry::success("Saved"));
///
/// let (entry, record) = flash::take_one(record);
/// assert_eq!(entry.unwrap().title, "Saved");
///
/// let (entry, _) = flash::take_one(record);
/// assert!(entry.is_none());
/// ```
pub fn take_one(record: SessionRecord) -> (Option<FlashEntry>, SessionRecord) {
    let (value, record) = record.take(FLASH_KEY);
    let entry = value.and_then(|v| serde_json::from_value(v).ok());
    (entry, record)
}

/// Schedules `entry` for the next render, replacing any unread entry.
pub fn put(record: SessionRecord, entry: FlashEntry) -> SessionRecord {
    match serde_json::to_value(&entry) {
        Ok(value) => record.with(FLASH_KEY, value),
        // Serializing two strings and an enum cannot fail.
        Err(_) => record,
    }
}
