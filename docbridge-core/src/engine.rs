//! Generic CRUD and query operations over typed records.
//!
//! The [`QueryEngine`] is the main interface of the access layer. Each
//! operation takes the record type as a type parameter and the collection name
//! as an argument, obtains the active connection from its
//! [`ConnectionManager`], performs one store round trip and maps the result
//! through [`DocumentMapper`].
//!
//! # Example
//!
//! ```ignore
//! use docbridge::prelude::*;
//!
//! let manager = Arc::new(ConnectionManager::new(ConnectionConfig::from_env()?, MongoDbConnector));
//! manager.setup().await?;
//!
//! let engine = QueryEngine::new(manager.clone());
//! let id = engine.insert("settings", &Setting { key: "k1".into(), value: "v1".into() }).await?;
//! let found: Option<Record<Setting>> = engine.get("settings", &id.to_hex()).await?;
//! ```

use std::{any::type_name, sync::Arc};
use tracing::{debug, error, info, warn};

use crate::{
    backend::{Connector, StoreBackend, UpdateOutcome},
    collection::TypedCollection,
    connection::ConnectionManager,
    document::{DocumentMapper, Identifier, Model, Record},
    error::{DocumentStoreError, DocumentStoreResult},
    query::Query,
};

/// Typed CRUD and query operations bound to a connection manager.
///
/// Cloning an engine is cheap; clones share the same manager.
pub struct QueryEngine<C: Connector> {
    manager: Arc<ConnectionManager<C>>,
}

impl<C: Connector> Clone for QueryEngine<C> {
    fn clone(&self) -> Self {
        Self { manager: Arc::clone(&self.manager) }
    }
}

impl<C: Connector> QueryEngine<C> {
    pub fn new(manager: Arc<ConnectionManager<C>>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<ConnectionManager<C>> {
        &self.manager
    }

    /// Binds this engine to a collection and record type.
    pub fn collection<T: Model>(&self, name: impl Into<String>) -> TypedCollection<'_, C, T> {
        TypedCollection::new(name.into(), self)
    }

    /// Fetches the record with the given identifier.
    ///
    /// Returns `Ok(None)` when no document matches.
    ///
    /// # Errors
    ///
    /// - [`Identifier`](crate::error::DocumentStoreError::Identifier) if `id` is malformed;
    ///   the store is not contacted.
    /// - [`Store`](crate::error::DocumentStoreError::Store) on I/O failure.
    /// - [`Decode`](crate::error::DocumentStoreError::Decode) if the match is not a `T`.
    pub async fn get<T: Model>(&self, collection: &str, id: &str) -> DocumentStoreResult<Option<Record<T>>> {
        debug!(collection, id, "Fetching document");
        let id = Identifier::parse(id).inspect_err(|e| error!(error = %e, "Unable to parse identifier"))?;

        let Some(raw) = self.backend().await?.find_one(collection, id).await.inspect_err(|e| {
            error!(collection, %id, error = %e, "Error while fetching document");
        })?
        else {
            return Ok(None);
        };

        DocumentMapper::decode(raw)
            .map(Some)
            .inspect_err(|e| error!(collection, %id, error = %e, "Failed to decode document"))
    }

    /// Selects records matching a query.
    ///
    /// Results are ordered by `query.sort`, or by identifier ascending when it is
    /// empty. `query.page.start` matches are skipped and at most
    /// `query.page.limit` records are returned; the limit is not bounded here.
    ///
    /// Each match is decoded on its own through the same path as [`get`](Self::get).
    /// Without a projection, a match that fails to decode is logged and left out
    /// of the result rather than failing the whole query, so the result may hold
    /// fewer records than the store returned.
    ///
    /// With a non-empty `query.projection`, every match must still decode into
    /// `T`: fields projected away must be optional in `T` (or carry a serde
    /// default). A match that does not decode fails the query instead of being
    /// dropped, since the projection rather than the stored data is at fault.
    ///
    /// # Errors
    ///
    /// - [`Store`](crate::error::DocumentStoreError::Store) on I/O failure.
    /// - [`Decode`](crate::error::DocumentStoreError::Decode) if a projected match
    ///   does not decode into `T`.
    pub async fn query<T: Model>(&self, collection: &str, query: &Query) -> DocumentStoreResult<Vec<Record<T>>> {
        debug!(
            collection,
            filter = %query.filter.as_document(),
            sort = %query.sort.to_document(),
            projection = ?query.projection.to_document(),
            start = query.page.start,
            limit = query.page.limit,
            "Querying documents"
        );
        if query.page.limit == 0 {
            return Ok(Vec::new());
        }

        info!(collection, "Querying for documents");
        let raw = self.backend().await?.find(collection, query).await.inspect_err(|e| {
            error!(collection, error = %e, "Error while trying to find documents");
        })?;
        debug!(collection, matches = raw.len(), "Query returned");

        if !query.projection.is_empty() {
            return raw
                .into_iter()
                .map(|document| {
                    DocumentMapper::decode::<T>(document).map_err(|e| {
                        DocumentStoreError::Decode(format!(
                            "projected document does not decode as {}: {e}",
                            type_name::<T>()
                        ))
                    })
                })
                .collect::<DocumentStoreResult<Vec<_>>>()
                .inspect_err(|e| error!(collection, error = %e, "Failed to decode projected document"));
        }

        Ok(raw
            .into_iter()
            .filter_map(|document| match DocumentMapper::decode::<T>(document) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(collection, error = %e, "Dropping document that failed to decode");
                    None
                }
            })
            .collect())
    }

    /// Stores a new record and returns the identifier the store assigned.
    ///
    /// # Errors
    ///
    /// Returns [`Encode`](crate::error::DocumentStoreError::Encode) if `value`
    /// is not document-shaped, or [`Store`](crate::error::DocumentStoreError::Store)
    /// on I/O failure.
    pub async fn insert<T: Model>(&self, collection: &str, value: &T) -> DocumentStoreResult<Identifier> {
        let document = DocumentMapper::encode_value(value)?;
        debug!(collection, %document, "Inserting document");

        let id = self
            .backend()
            .await?
            .insert_one(collection, document)
            .await
            .inspect_err(|e| error!(collection, error = %e, "Error while inserting document"))?;
        debug!(collection, %id, "Inserted document");

        Ok(id)
    }

    /// Replaces every field of the record with `id` by the fields of `value`.
    ///
    /// `(0, 0)` means nothing has that identifier, `(1, 0)` means the stored
    /// document already matched and `(1, 1)` means it was changed.
    ///
    /// # Errors
    ///
    /// - [`Identifier`](crate::error::DocumentStoreError::Identifier) if `id` is malformed.
    /// - [`Encode`](crate::error::DocumentStoreError::Encode) if `value` is not document-shaped.
    /// - [`Store`](crate::error::DocumentStoreError::Store) on I/O failure.
    pub async fn update<T: Model>(&self, collection: &str, id: &str, value: &T) -> DocumentStoreResult<UpdateOutcome> {
        let id = Identifier::parse(id).inspect_err(|e| error!(error = %e, "Unable to parse identifier"))?;
        let document = DocumentMapper::encode_value(value)?;
        debug!(collection, %id, %document, "Replacing document");

        let outcome = self
            .backend()
            .await?
            .replace_one(collection, id, document)
            .await
            .inspect_err(|e| error!(collection, %id, error = %e, "Error while replacing document"))?;
        debug!(collection, %id, matched = outcome.matched, modified = outcome.modified, "Replaced document");

        Ok(outcome)
    }

    /// Removes the record with `id`, returning whether anything was removed.
    ///
    /// # Errors
    ///
    /// - [`Identifier`](crate::error::DocumentStoreError::Identifier) if `id` is malformed.
    /// - [`Store`](crate::error::DocumentStoreError::Store) on I/O failure.
    pub async fn delete(&self, collection: &str, id: &str) -> DocumentStoreResult<bool> {
        let id = Identifier::parse(id).inspect_err(|e| error!(error = %e, "Unable to parse identifier"))?;
        debug!(collection, %id, "Deleting document");

        self.backend()
            .await?
            .delete_one(collection, id)
            .await
            .inspect_err(|e| error!(collection, %id, error = %e, "Error while deleting document"))
    }

    async fn backend(&self) -> DocumentStoreResult<Arc<C::Backend>> {
        self.manager.connection().await
    }
}
