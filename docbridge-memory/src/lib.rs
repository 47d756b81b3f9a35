//! In-memory document storage backend for docbridge.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `StoreBackend` trait together with a `Connector` for it. Filters, sorts and
//! projections are given in the same native query document format the MongoDB
//! backend sends to the server, so the two backends are interchangeable for
//! development and testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Native filters** - Comparison, membership, existence and logical operators
//! - **Full query support** - Multi-key sorting, pagination and projection
//!
//! # Quick Start
//!
//! ```ignore
//! use docbridge::prelude::*;
//! use docbridge::memory::InMemoryConnector;
//!
//! let manager = Arc::new(ConnectionManager::new(
//!     ConnectionConfig::from_uri("memory://localhost/app"),
//!     InMemoryConnector::new(),
//! ));
//! manager.setup().await?;
//!
//! let users = QueryEngine::new(manager).collection::<User>("users");
//! let id = users.insert(&User { name: "Alice".into() }).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbridge_memory;

pub mod store;
pub(crate) mod evaluator;
pub(crate) mod projection;

pub use store::{InMemoryConnector, InMemoryStore};
