//! Backend-agnostic core of docbridge, a generic typed access layer over
//! document stores.
//!
//! This crate provides:
//!
//! - **Configuration** ([`config`]) - Connection settings and target resolution
//! - **Connection lifecycle** ([`connection`]) - Setup and teardown of the shared connection
//! - **Records** ([`document`]) - Typed records, identifiers and the document mapper
//! - **Store backend abstraction** ([`backend`]) - Raw operations a store must provide
//! - **Query API** ([`query`], [`page`]) - Filters, sorts, projections and page windows
//! - **Query engine** ([`engine`], [`collection`]) - Typed CRUD and query operations
//! - **Error handling** ([`error`]) - Error taxonomy and result types
//!
//! # Example
//!
//! ```ignore
//! use docbridge_core::{
//!     config::ConnectionConfig,
//!     connection::ConnectionManager,
//!     engine::QueryEngine,
//!     query::{Query, Field},
//! };
//! use serde::{Serialize, Deserialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Setting {
//!     pub key: String,
//!     pub value: String,
//! }
//!
//! let manager = Arc::new(ConnectionManager::new(ConnectionConfig::from_env()?, connector));
//! manager.setup().await?;
//!
//! let engine = QueryEngine::new(manager);
//! let settings = engine
//!     .query::<Setting>("settings", &Query::builder().filter(Field::new("key").eq("k1")).build())
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbridge_core;

pub mod backend;
pub mod collection;
pub mod config;
pub mod connection;
pub mod document;
pub mod engine;
pub mod error;
pub mod page;
pub mod query;
