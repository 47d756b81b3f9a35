//! Error types and result types for document store operations.
//!
//! Every fallible operation of the access layer returns [`DocumentStoreResult<T>`].
//! Startup is the exception: [`StartupError`] marks failures the process cannot
//! recover from, and the host is expected to abort when it sees one.

use thiserror::Error;

/// Represents all errors an operation against the document store can return.
///
/// Absence of a document is never an error: lookups return `None` and queries
/// return fewer records instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentStoreError {
    /// The connection configuration does not describe a usable target.
    #[error("Configuration error: {0}")]
    Config(String),
    /// The given string is not a 24 character hex encoded identifier.
    #[error("Invalid identifier {0:?}: {1}")]
    Identifier(String, String),
    /// The underlying store or driver reported an I/O failure.
    #[error("Store error: {0}")]
    Store(String),
    /// A stored document could not be converted into the requested record type.
    #[error("Decode error: {0}")]
    Decode(String),
    /// A record could not be converted into a store document.
    #[error("Encode error: {0}")]
    Encode(String),
    /// An operation was attempted while no connection is active.
    #[error("No active database connection")]
    NotConnected,
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

/// Failure while establishing the process-wide connection.
///
/// Nothing can proceed without storage, so callers should treat this as fatal.
#[derive(Error, Debug)]
pub enum StartupError {
    /// The configuration could not be resolved into a connection target.
    #[error("Unable to resolve database target: {0}")]
    Config(#[source] DocumentStoreError),
    /// The store could not be reached with the resolved target.
    #[error("Unable to connect to {target}: {source}")]
    Connect {
        /// Redacted form of the connection URL.
        target: String,
        #[source]
        source: DocumentStoreError,
    },
}
