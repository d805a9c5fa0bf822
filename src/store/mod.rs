//! # Document Store
//!
//! The persistence collaborator consumed by the [`Repository`](crate::framework::Repository).
//!
//! The pipeline only ever talks to storage through the [`DocumentStore`] trait, a
//! minimal capability set over schemaless JSON documents grouped in named collections:
//!
//! - [`DocumentStore::create_if_absent`] - insert, failing with [`StoreError::AlreadyExists`]
//! - [`DocumentStore::get`] - fetch by key, failing with [`StoreError::NotFound`]
//! - [`DocumentStore::update_fields`] - apply field-path writes as one mutation
//! - [`DocumentStore::delete`] - remove by key
//! - [`DocumentStore::query`] - conjunction of [`StoreFilter`]s
//!
//! [`StoreActor`] is the in-process implementation used by the gateway binary and the
//! integration tests. [`MockStore`](mock::MockStore) scripts responses for unit tests.

pub mod actor;
pub mod error;
pub mod mock;

pub use actor::*;
pub use error::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// A stored document: field name to JSON value.
pub type Document = serde_json::Map<String, Value>;

/// Native comparison tokens understood by the store.
pub mod ops {
    pub const EQ: &str = "=";
    pub const NE: &str = "≠";
    pub const LT: &str = "<";
    pub const GT: &str = ">";
    pub const LE: &str = "≤";
    pub const GE: &str = "≥";
    /// Sentinel for operators with no native counterpart. Always rejected.
    pub const UNKNOWN: &str = "UNKNOWN";
}

/// A single field-path write inside an update.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWrite {
    pub path: String,
    pub value: Value,
}

impl FieldWrite {
    pub fn new(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }
}

/// A backend filter predicate: `path <operator> value`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreFilter {
    pub path: String,
    pub operator: &'static str,
    pub value: Value,
}

/// Documents matched by a query.
///
/// `skipped` holds the keys of matched documents the backend could not return
/// (e.g. malformed on disk). Skipped records never fail the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub documents: Vec<Document>,
    pub skipped: Vec<String>,
}

/// Encodes a timestamp the way entities persist it (epoch milliseconds).
pub fn timestamp_value(ts: DateTime<Utc>) -> Value {
    Value::from(ts.timestamp_millis())
}

/// Minimal CRUD capability over a document database.
///
/// Implementations must be safe for concurrent use; a single handle is shared by
/// every in-flight request for the lifetime of the process.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    async fn create_if_absent(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, key: &str) -> Result<Document, StoreError>;

    /// Applies every write atomically. Fields not named by a write are preserved.
    async fn update_fields(
        &self,
        collection: &str,
        key: &str,
        writes: Vec<FieldWrite>,
    ) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError>;

    async fn query(
        &self,
        collection: &str,
        filters: Vec<StoreFilter>,
    ) -> Result<QueryResult, StoreError>;
}
