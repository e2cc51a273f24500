//! Connection Manager
//!
//! Resolves the store address and owns the single link to the backing
//! collection.
//!
//! ## States
//! ```text
//!   Disconnected ──start() ok──▶ Connected
//!        │
//!        └──start() err──▶ Disconnected (error returned, or logged when ignored)
//! ```

use std::sync::Arc;

use parking_lot::RwLock;

use crate::address::{local_hostname, substitute_local_host, StoreAddress};
use crate::backend::{Connector, DocumentCollection};
use crate::config::StoreConfig;
use crate::error::{BackendError, BackendResult, DocKvError, Result};
use crate::schema::RecordSchema;

/// Link state of a store instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Owns address resolution and the shared collection handle
pub struct ConnectionManager {
    /// Address after optional local-host substitution
    address: StoreAddress,

    connector: Arc<dyn Connector>,

    /// Live collection handle, set by a successful `start()`
    link: RwLock<Option<Arc<dyn DocumentCollection>>>,

    ignore_connection_error: bool,
}

impl ConnectionManager {
    /// Resolve the configured address and prepare a disconnected manager
    pub fn new(config: &StoreConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        Ok(Self {
            address: Self::resolve_address(config)?,
            connector,
            link: RwLock::new(None),
            ignore_connection_error: config.ignore_connection_error,
        })
    }

    /// Parse the configured URI, substituting the local host if requested
    pub fn resolve_address(config: &StoreConfig) -> Result<StoreAddress> {
        let uri = if config.use_local_host {
            substitute_local_host(&config.uri, &local_hostname())
        } else {
            config.uri.clone()
        };
        StoreAddress::parse(&uri)
    }

    /// Establish the link
    ///
    /// A no-op when already connected. On failure the error is returned,
    /// unless connection errors are ignored, in which case it is logged and
    /// the manager stays disconnected.
    pub async fn start(&self, schema: &RecordSchema) -> Result<()> {
        if self.is_connected() {
            tracing::debug!(address = %self.address, "already connected");
            return Ok(());
        }

        match self.connector.connect(&self.address, schema).await {
            Ok(collection) => {
                *self.link.write() = Some(collection);
                tracing::info!(
                    address = %self.address,
                    collection = schema.collection(),
                    "connection established"
                );
                Ok(())
            }
            Err(e) if self.ignore_connection_error => {
                tracing::error!(address = %self.address, error = %e, "connection failed, continuing disconnected");
                Ok(())
            }
            Err(e) => Err(DocKvError::Connection {
                uri: self.address.to_string(),
                source: e,
            }),
        }
    }

    /// The live collection handle, or `NotConnected`
    pub fn link(&self) -> BackendResult<Arc<dyn DocumentCollection>> {
        self.link.read().clone().ok_or(BackendError::NotConnected)
    }

    /// Drop the link, flushing the backend first
    pub async fn close(&self) -> BackendResult<()> {
        let link = self.link.write().take();
        match link {
            Some(collection) => collection.close().await,
            None => Ok(()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.read().is_some()
    }

    /// The resolved address
    pub fn address(&self) -> &StoreAddress {
        &self.address
    }
}
