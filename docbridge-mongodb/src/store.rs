use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, doc};
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, FindOptions},
};
use tracing::debug;

use docbridge_core::{
    backend::{Connector, StoreBackend, UpdateOutcome},
    config::ConnectionTarget,
    document::{ID_FIELD, Identifier},
    error::{DocumentStoreError, DocumentStoreResult},
    query::Query,
};


#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: impl Into<String>) -> Self {
        Self { client, database: database.into() }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    /// Builds the driver options for a query's sort, page and projection.
    ///
    /// Returns `None` for a zero limit, which the driver would read as "no
    /// limit". A limit beyond what the wire format carries is treated as
    /// unbounded.
    pub(crate) fn find_options(query: &Query) -> Option<FindOptions> {
        if query.page.limit == 0 {
            return None;
        }

        let mut options = FindOptions::default();

        options.sort = Some(query.sort.to_document());
        options.projection = query.projection.to_document();
        if query.page.start > 0 {
            options.skip = Some(query.page.start);
        }
        if let Ok(limit) = i64::try_from(query.page.limit) {
            options.limit = Some(limit);
        }

        Some(options)
    }
}

fn backend_error(e: mongodb::error::Error) -> DocumentStoreError {
    DocumentStoreError::Store(e.to_string())
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn find_one(&self, collection: &str, id: Identifier) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(doc! { ID_FIELD: id })
            .await
            .map_err(backend_error)
    }

    async fn find(&self, collection: &str, query: &Query) -> DocumentStoreResult<Vec<Document>> {
        let Some(options) = Self::find_options(query) else {
            return Ok(vec![]);
        };

        self.get_collection(collection)
            .find(query.filter.as_document().clone())
            .with_options(options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Identifier> {
        let result = self.get_collection(collection)
            .insert_one(document)
            .await
            .map_err(backend_error)?;

        result
            .inserted_id
            .as_object_id()
            .map(Identifier::from)
            .ok_or_else(|| DocumentStoreError::Store(format!(
                "store assigned a non-ObjectId identifier: {}",
                result.inserted_id
            )))
    }

    async fn replace_one(
        &self,
        collection: &str,
        id: Identifier,
        document: Document,
    ) -> DocumentStoreResult<UpdateOutcome> {
        let result = self.get_collection(collection)
            .replace_one(doc! { ID_FIELD: id }, document)
            .await
            .map_err(backend_error)?;

        Ok(UpdateOutcome::new(result.matched_count, result.modified_count))
    }

    async fn delete_one(&self, collection: &str, id: Identifier) -> DocumentStoreResult<bool> {
        let result = self.get_collection(collection)
            .delete_one(doc! { ID_FIELD: id })
            .await
            .map_err(backend_error)?;

        Ok(result.deleted_count > 0)
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.client.clone().shutdown().await;

        Ok(())
    }
}

/// Opens [`MongoDbStore`] connections with the official driver.
///
/// The server is pinged once while connecting so an unreachable store fails
/// setup instead of the first operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoDbConnector;

#[async_trait]
impl Connector for MongoDbConnector {
    type Backend = MongoDbStore;

    async fn connect(&self, target: &ConnectionTarget) -> DocumentStoreResult<MongoDbStore> {
        let options = ClientOptions::parse(target.connection_string())
            .await
            .map_err(|e| DocumentStoreError::Config(e.to_string()))?;
        let client = Client::with_options(options).map_err(backend_error)?;

        client
            .database(target.database())
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(backend_error)?;
        debug!(database = target.database(), "Connected to MongoDB");

        Ok(MongoDbStore::new(client, target.database()))
    }
}
