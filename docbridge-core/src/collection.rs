//! Collection handles bound to a record type.
//!
//! A [`TypedCollection`] fixes the collection name and record type so callers
//! do not repeat them on every operation.
//!
//! # Example
//!
//! ```ignore
//! let settings = engine.collection::<Setting>("settings");
//!
//! let id = settings.insert(&Setting { key: "k1".into(), value: "v1".into() }).await?;
//! settings.update(&id.to_hex(), &Setting { key: "k1".into(), value: "v2".into() }).await?;
//! let current = settings.get(&id.to_hex()).await?;
//! ```

use std::marker::PhantomData;

use crate::{
    backend::{Connector, UpdateOutcome},
    document::{Identifier, Model, Record},
    engine::QueryEngine,
    error::DocumentStoreResult,
    query::Query,
};

pub struct TypedCollection<'a, C: Connector, T: Model> {
    name: String,
    engine: &'a QueryEngine<C>,
    _marker: PhantomData<T>,
}

impl<'a, C: Connector, T: Model> TypedCollection<'a, C, T> {
    pub(crate) fn new(name: String, engine: &'a QueryEngine<C>) -> Self {
        Self { name, engine, _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Views the same collection as a different record type.
    pub fn with_type<U: Model>(&self) -> TypedCollection<'a, C, U> {
        TypedCollection {
            name: self.name.clone(),
            engine: self.engine,
            _marker: PhantomData,
        }
    }

    /// See [`QueryEngine::get`].
    pub async fn get(&self, id: &str) -> DocumentStoreResult<Option<Record<T>>> {
        self.engine.get(&self.name, id).await
    }

    /// See [`QueryEngine::query`].
    pub async fn query(&self, query: &Query) -> DocumentStoreResult<Vec<Record<T>>> {
        self.engine.query(&self.name, query).await
    }

    /// See [`QueryEngine::insert`].
    pub async fn insert(&self, value: &T) -> DocumentStoreResult<Identifier> {
        self.engine.insert(&self.name, value).await
    }

    /// See [`QueryEngine::update`].
    pub async fn update(&self, id: &str, value: &T) -> DocumentStoreResult<UpdateOutcome> {
        self.engine.update(&self.name, id, value).await
    }

    /// See [`QueryEngine::delete`].
    pub async fn delete(&self, id: &str) -> DocumentStoreResult<bool> {
        self.engine.delete(&self.name, id).await
    }
}
