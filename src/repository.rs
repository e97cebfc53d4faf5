//! Data-access collaborator used by controller scopes.
//!
//! The application's document store is reached only through [`DataAccess`],
//! which is injected into each [`ControllerScope`](crate::ControllerScope)
//! rather than reached through process-wide state.

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU32;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::DataAccessError;

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Field holding a document's id.
pub const ID_FIELD: &str = "id";
/// Field the date-range filter applies to.
pub const DATE_FIELD: &str = "date";
/// Page size used when none is given.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Inclusive date bounds for reporting queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    /// First day included
    pub from: Option<NaiveDate>,
    /// Last day included
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Returns `true` if `date` lies within both bounds.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    /// Returns `true` if neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Filter and pagination for listing a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    /// Date filter on [`DATE_FIELD`]
    pub range: DateRange,
    /// One-based page number
    pub page: NonZeroU32,
    /// Items per page
    pub per_page: NonZeroU32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            range: DateRange::default(),
            page: NonZeroU32::MIN,
            per_page: NonZeroU32::new(DEFAULT_PER_PAGE).unwrap_or(NonZeroU32::MIN),
        }
    }
}

impl ListQuery {
    /// Zero-based index of the first item on the requested page.
    pub fn offset(&self) -> usize {
        (self.page.get() as usize - 1) * self.per_page.get() as usize
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// One-based page number
    pub page: u32,
    /// Page size
    pub per_page: u32,
    /// Total matching items across all pages
    pub total: usize,
}

/// CRUD access to named document collections.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataAccess: Send + Sync {
    /// Fetches a document by id.
    async fn find(&self, collection: &str, id: &str) -> Result<Option<Document>, DataAccessError>;

    /// Lists documents matching `query`.
    async fn list(&self, collection: &str, query: &ListQuery)
        -> Result<Page<Document>, DataAccessError>;

    /// Stores a new document and returns its id.
    async fn insert(&self, collection: &str, document: Document) -> Result<String, DataAccessError>;

    /// Replaces the fields of an existing document. Returns `false` if it does not exist.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<bool, DataAccessError>;

    /// Removes a document. Returns `false` if it does not exist.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DataAccessError>;
}

type Collection = BTreeMap<String, Document>;

/// Process-local [`DataAccess`] implementation.
///
/// Suitable for the bundled server and for tests. Documents are listed in id order.
#[derive(Default)]
pub struct InMemoryRepository {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

fn document_date(document: &Document) -> Option<NaiveDate> {
    document
        .get(DATE_FIELD)
        .and_then(Value::as_str)
        .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}

#[async_trait]
impl DataAccess for InMemoryRepository {
    async fn find(&self, collection: &str, id: &str) -> Result<Option<Document>, DataAccessError> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn list(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<Page<Document>, DataAccessError> {
        let collections = self.collections.read();
        let matching: Vec<&Document> = collections
            .get(collection)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|doc| {
                query.range.is_unbounded()
                    || document_date(doc).is_some_and(|date| query.range.contains(date))
            })
            .collect();

        let items = matching
            .iter()
            .skip(query.offset())
            .take(query.per_page.get() as usize)
            .map(|doc| (*doc).clone())
            .collect();

        Ok(Page {
            items,
            page: query.page.get(),
            per_page: query.per_page.get(),
            total: matching.len(),
        })
    }

    async fn insert(
        &self,
        collection: &str,
        mut document: Document,
    ) -> Result<String, DataAccessError> {
        let id = Uuid::new_v4().to_string();
        document.insert(ID_FIELD.to_string(), Value::String(id.clone()));

        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), document);
        Ok(id)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<bool, DataAccessError> {
        let mut collections = self.collections.write();
        let Some(existing) = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        else {
            return Ok(false);
        };

        for (field, value) in document {
            if field != ID_FIELD {
                existing.insert(field, value);
            }
        }
        Ok(true)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DataAccessError> {
        Ok(self
            .collections
            .write()
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some())
    }
}
