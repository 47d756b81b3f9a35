//! In-memory storage implementation for document stores.
//!
//! This module provides a simple backend that keeps documents in ordered maps
//! behind an async-safe read-write lock. Documents are stored exactly as the
//! store would hold them, with the identifier in `_id`.

use std::{collections::{BTreeMap, HashMap}, iter, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document};
use tracing::debug;

use docbridge_core::{
    backend::{Connector, StoreBackend, UpdateOutcome},
    config::ConnectionTarget,
    document::{ID_FIELD, Identifier},
    error::DocumentStoreResult,
    query::Query,
};

use crate::{
    evaluator::{DocumentEvaluator, FilterParser, SortKeys},
    projection::ProjectionMask,
};

type CollectionMap = BTreeMap<Identifier, Document>;
type StoreMap = HashMap<String, CollectionMap>;


/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, so
/// clones of the same instance share the same underlying data.
///
/// Queries scan every document in a collection; there is no indexing.
///
/// # Example
///
/// ```ignore
/// use docbridge_memory::InMemoryStore;
/// use docbridge_core::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let id = store.insert_one("users", doc! { "name": "Alice" }).await?;
/// assert!(store.find_one("users", id).await?.is_some());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> (identifier -> document)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Names of every collection that has received a document.
    pub async fn collection_names(&self) -> Vec<String> {
        let mut names = self.store.read().await.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }
}

fn with_identifier(id: Identifier, document: Document) -> Document {
    iter::once((ID_FIELD.to_string(), Bson::from(id)))
        .chain(document.into_iter().filter(|(key, _)| key != ID_FIELD))
        .collect()
}

fn to_index(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn find_one(&self, collection: &str, id: Identifier) -> DocumentStoreResult<Option<Document>> {
        Ok(
            self.store
                .read()
                .await
                .get(collection)
                .and_then(|documents| documents.get(&id))
                .cloned()
        )
    }

    async fn find(&self, collection: &str, query: &Query) -> DocumentStoreResult<Vec<Document>> {
        let expr = FilterParser::parse(query.filter.as_document())?;
        let sort = SortKeys::parse(&query.sort.to_document())?;
        let projection = ProjectionMask::parse(query.projection.to_document())?;

        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut matches = documents
            .values()
            .filter(|document| DocumentEvaluator::new(document).evaluate(&expr))
            .collect::<Vec<_>>();

        // Stable sort; ties keep identifier order.
        matches.sort_by(|a, b| sort.compare(a, b));

        Ok(
            matches
                .into_iter()
                .skip(to_index(query.page.start))
                .take(to_index(query.page.limit))
                .map(|document| projection.apply(document))
                .collect()
        )
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Identifier> {
        let mut store = self.store.write().await;
        let documents = store
            .entry(collection.to_string())
            .or_default();

        let mut id = Identifier::generate();
        while documents.contains_key(&id) {
            id = Identifier::generate();
        }

        documents.insert(id, with_identifier(id, document));

        Ok(id)
    }

    async fn replace_one(
        &self,
        collection: &str,
        id: Identifier,
        document: Document,
    ) -> DocumentStoreResult<UpdateOutcome> {
        let mut store = self.store.write().await;
        let Some(existing) = store
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(&id))
        else {
            return Ok(UpdateOutcome::new(0, 0));
        };

        let replacement = with_identifier(id, document);
        if *existing == replacement {
            return Ok(UpdateOutcome::new(1, 0));
        }

        *existing = replacement;
        Ok(UpdateOutcome::new(1, 1))
    }

    async fn delete_one(&self, collection: &str, id: Identifier) -> DocumentStoreResult<bool> {
        Ok(
            self.store
                .write()
                .await
                .get_mut(collection)
                .is_some_and(|documents| documents.remove(&id).is_some())
        )
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        // Data outlives the connection; other connectors may share this store.
        Ok(())
    }
}


/// Connector that hands out [`InMemoryStore`] handles.
///
/// Every connection opened by the same connector shares one store, so data
/// survives a teardown followed by a new setup.
#[derive(Default, Clone, Debug)]
pub struct InMemoryConnector {
    store: InMemoryStore,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connector whose connections use `store`.
    pub fn with_store(store: InMemoryStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    type Backend = InMemoryStore;

    async fn connect(&self, target: &ConnectionTarget) -> DocumentStoreResult<InMemoryStore> {
        debug!(database = target.database(), "Opening in-memory store");
        Ok(self.store.clone())
    }
}
