//! Convenient re-exports of commonly used types from docbridge.
//!
//! ```ignore
//! use docbridge::prelude::*;
//! ```

pub use std::sync::Arc;

pub use docbridge_core::{
    backend::{Connector, StoreBackend, UpdateOutcome},
    collection::TypedCollection,
    config::{ConnectionConfig, ConnectionTarget},
    connection::ConnectionManager,
    document::{DocumentMapper, Identifier, Model, ModelExt, Record},
    engine::QueryEngine,
    page::{PageWindow, QUERY_MAX_SIZE},
    query::{Expr, Field, FieldOp, Filter, Projection, Query, QueryBuilder, SortDirection, SortSpec},
    error::{DocumentStoreError, DocumentStoreResult, StartupError},
};
