//! Main docbridge crate providing typed access to document stores.
//!
//! This crate is the primary entry point for users of docbridge. It re-exports
//! the core types from `docbridge-core` and gives access to the storage
//! backends.
//!
//! # Features
//!
//! - **Typed records** - Any Serde type is stored as a document; the store assigns identifiers
//! - **Managed connection** - Configuration from the environment, a file or a URI, with explicit setup and teardown
//! - **Native queries** - MongoDB-style filter, sort and projection documents, or a typed builder
//! - **Multiple backends** - MongoDB for production and an in-memory store for tests
//!
//! # Quick Start
//!
//! ```ignore
//! use docbridge::{prelude::*, memory::InMemoryConnector};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Setting {
//!     pub key: String,
//!     pub value: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = Arc::new(ConnectionManager::new(
//!         ConnectionConfig::from_uri("memory://localhost/app"),
//!         InMemoryConnector::new(),
//!     ));
//!     manager.setup().await?;
//!
//!     let settings = QueryEngine::new(manager.clone()).collection::<Setting>("settings");
//!
//!     let id = settings
//!         .insert(&Setting { key: "k1".into(), value: "v1".into() })
//!         .await?;
//!
//!     let found = settings
//!         .query(&Query::builder().filter(Field::new("key").eq("k1")).build())
//!         .await?;
//!     println!("Found {} settings, first is {}", found.len(), id);
//!
//!     manager.teardown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use docbridge_core::{backend, collection, config, connection, document, engine, error, page, query};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docbridge_memory::{InMemoryConnector, InMemoryStore};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docbridge_mongodb::{MongoDbConnector, MongoDbStore};
}
