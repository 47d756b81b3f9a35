//! MongoDB backend implementation for docbridge.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` and
//! `Connector` traits on top of the official async driver. Filters, sorts and
//! projections are already native query documents, so they are passed to the
//! server unchanged.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docbridge = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! The connection string and database come from the resolved
//! `ConnectionTarget`; see `ConnectionConfig` for the supported settings.
//!
//! # Example
//!
//! ```ignore
//! use docbridge::{prelude::*, mongodb::MongoDbConnector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = Arc::new(ConnectionManager::new(ConnectionConfig::from_env()?, MongoDbConnector));
//!     manager.setup().await?;
//!
//!     let engine = QueryEngine::new(manager.clone());
//!     // ...
//!     manager.teardown().await;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbridge_mongodb;

pub mod store;

pub use store::{MongoDbConnector, MongoDbStore};
