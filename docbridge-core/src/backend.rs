//! Storage backend abstraction.
//!
//! A [`StoreBackend`] performs single round trips against a document store using
//! raw BSON documents. It knows nothing about record types; typing happens in the
//! [`QueryEngine`](crate::engine::QueryEngine). A [`Connector`] opens a backend
//! for a resolved [`ConnectionTarget`].
//!
//! # Thread Safety
//!
//! Backends are shared behind an `Arc` by every caller of the engine and must
//! be safe for concurrent use. The access layer adds no locking of its own
//! around backend calls.

use async_trait::async_trait;
use bson::Document;
use std::fmt::Debug;

use crate::{
    config::ConnectionTarget,
    document::Identifier,
    error::DocumentStoreResult,
    query::Query,
};

/// Result of replacing a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Number of documents that matched the identifier (0 or 1).
    pub matched: u64,
    /// Number of documents whose content actually changed (0 or 1).
    pub modified: u64,
}

impl UpdateOutcome {
    pub fn new(matched: u64, modified: u64) -> Self {
        Self { matched, modified }
    }

    /// Whether a document with the identifier exists.
    pub fn found(&self) -> bool {
        self.matched > 0
    }
}

/// Raw document operations a store must provide.
///
/// Every method is a single request against the store; none are retried.
/// Documents passed in and returned carry their identifier in `_id`.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug + 'static {
    /// Fetches the document with the given identifier, if any.
    async fn find_one(&self, collection: &str, id: Identifier) -> DocumentStoreResult<Option<Document>>;

    /// Returns the documents matching `query.filter`, ordered by
    /// `query.sort.to_document()`, with `query.page` and `query.projection` applied.
    /// A zero `query.page.limit` returns nothing.
    async fn find(&self, collection: &str, query: &Query) -> DocumentStoreResult<Vec<Document>>;

    /// Stores a new document and returns the identifier the store assigned.
    ///
    /// `document` never contains `_id`.
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Identifier>;

    /// Replaces every non-identifier field of the document with `id`.
    async fn replace_one(
        &self,
        collection: &str,
        id: Identifier,
        document: Document,
    ) -> DocumentStoreResult<UpdateOutcome>;

    /// Removes the document with `id`, returning whether one was removed.
    async fn delete_one(&self, collection: &str, id: Identifier) -> DocumentStoreResult<bool>;

    /// Releases the backend's resources.
    async fn shutdown(&self) -> DocumentStoreResult<()>;
}

/// Opens backends for a resolved target.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Backend: StoreBackend;

    /// Connects to `target`.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) when the
    /// store cannot be reached or the target is rejected by the driver.
    async fn connect(&self, target: &ConnectionTarget) -> DocumentStoreResult<Self::Backend>;
}
