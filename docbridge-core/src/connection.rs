//! Connection lifecycle.
//!
//! A [`ConnectionManager`] owns the single active backend for the process. It
//! is an ordinary value: applications create one at startup and share it
//! through an `Arc`, and tests create as many independent ones as they need.

use mea::rwlock::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    backend::{Connector, StoreBackend},
    config::ConnectionConfig,
    error::{DocumentStoreError, DocumentStoreResult, StartupError},
};

/// Owns the active connection to the document store.
///
/// [`setup`](Self::setup) publishes a connection and [`teardown`](Self::teardown)
/// releases it. Calling `setup` again swaps in a new connection without waiting
/// for operations that already hold the old one; they finish on the old handle.
pub struct ConnectionManager<C: Connector> {
    config: ConnectionConfig,
    connector: C,
    active: RwLock<Option<Arc<C::Backend>>>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(config: ConnectionConfig, connector: C) -> Self {
        Self { config, connector, active: RwLock::new(None) }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Resolves the configured target, connects and publishes the connection.
    ///
    /// # Errors
    ///
    /// Any failure is returned as a [`StartupError`]; the process cannot
    /// continue without storage and should abort.
    pub async fn setup(&self) -> Result<(), StartupError> {
        let target = self.config.resolve_target().map_err(StartupError::Config)?;

        info!(url = %target.redacted(), "Connecting to database");
        let backend = self
            .connector
            .connect(&target)
            .await
            .map_err(|source| StartupError::Connect { target: target.redacted(), source })?;

        info!(database = target.database(), "Setting up database");
        let previous = self.active.write().await.replace(Arc::new(backend));
        if previous.is_some() {
            debug!("Replaced existing database connection");
        }

        Ok(())
    }

    /// Releases the active connection, if any.
    ///
    /// Disconnect failures are logged and otherwise ignored.
    pub async fn teardown(&self) {
        let Some(backend) = self.active.write().await.take() else {
            return;
        };

        if let Err(e) = backend.shutdown().await {
            error!(error = %e, "Error while disconnecting from database");
        }
    }

    /// Returns the active connection.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::NotConnected`] before `setup` or after `teardown`.
    pub async fn connection(&self) -> DocumentStoreResult<Arc<C::Backend>> {
        (*self.active.read().await)
            .clone()
            .ok_or(DocumentStoreError::NotConnected)
    }

    pub async fn is_connected(&self) -> bool {
        self.active.read().await.is_some()
    }
}
