//! Destructive-conflict guard
//!
//! Some sinks can drop and recreate their target before writing. When the
//! source of the same operation reads from that very target, the read would be
//! racing its own deletion. The guard recognises store types by extension
//! display name and compares the logical address both sides resolve to.

use crate::planner::Operation;
use ferrodt_types::{Error, Result, SettingsBag};
use tracing::debug;

/// Settings layout of one guarded store type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreGuard {
    /// Extension display name the guard applies to
    pub extension: &'static str,
    /// Human readable store family used in error messages
    pub store: &'static str,
    /// Setting holding an explicit account endpoint
    pub endpoint_key: &'static str,
    /// Setting holding a connection string
    pub connection_string_key: &'static str,
    /// Setting holding the database name
    pub database_key: &'static str,
    /// Setting holding the container name
    pub container_key: &'static str,
    /// Sink setting requesting drop-and-recreate
    pub recreate_key: &'static str,
}

impl StoreGuard {
    /// Cosmos DB NoSQL API
    pub const COSMOS_NOSQL: Self = Self {
        extension: "Cosmos-nosql",
        store: "Cosmos DB",
        endpoint_key: "AccountEndpoint",
        connection_string_key: "ConnectionString",
        database_key: "Database",
        container_key: "Container",
        recreate_key: "RecreateContainer",
    };

    /// Resolve the logical address described by `settings`
    ///
    /// Returns `None` when any component is missing.
    pub fn address(&self, settings: &SettingsBag) -> Result<Option<StoreAddress>> {
        let endpoint = match settings.get_non_blank_str(self.endpoint_key)? {
            Some(endpoint) => Some(endpoint.to_string()),
            None => settings
                .get_str(self.connection_string_key)?
                .and_then(|cs| connection_string_value(cs, self.endpoint_key)),
        };
        let database = settings.get_non_blank_str(self.database_key)?;
        let container = settings.get_non_blank_str(self.container_key)?;

        Ok(match (endpoint, database, container) {
            (Some(endpoint), Some(database), Some(container)) => Some(StoreAddress {
                endpoint,
                database: database.to_string(),
                container: container.to_string(),
            }),
            _ => None,
        })
    }
}

/// Endpoint, database and container a store side resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreAddress {
    /// Account endpoint
    pub endpoint: String,
    /// Database name
    pub database: String,
    /// Container name
    pub container: String,
}

/// Table of guarded store types checked against every planned operation
#[derive(Debug, Clone)]
pub struct ConflictGuard {
    stores: Vec<StoreGuard>,
}

impl Default for ConflictGuard {
    fn default() -> Self {
        Self {
            stores: vec![StoreGuard::COSMOS_NOSQL],
        }
    }
}

impl ConflictGuard {
    /// Guard with no store types registered
    pub fn empty() -> Self {
        Self { stores: Vec::new() }
    }

    /// Add a store type
    pub fn with_store(mut self, store: StoreGuard) -> Self {
        self.stores.push(store);
        self
    }

    /// Store types currently guarded
    pub fn stores(&self) -> &[StoreGuard] {
        &self.stores
    }

    /// Reject an operation that would recreate the container it reads from
    pub fn check(&self, operation: &Operation) -> Result<()> {
        if operation.source_name() != operation.sink_name() {
            return Ok(());
        }
        let Some(store) = self
            .stores
            .iter()
            .find(|store| store.extension == operation.sink_name())
        else {
            return Ok(());
        };

        if !operation
            .sink_settings
            .get_bool(store.recreate_key)?
            .unwrap_or(false)
        {
            return Ok(());
        }

        let source = store.address(&operation.source_settings)?;
        let sink = store.address(&operation.sink_settings)?;

        match (source, sink) {
            (Some(source), Some(sink)) if source == sink => Err(Error::DestructiveConflict {
                operation: operation.index,
                store: store.store.to_string(),
                database: sink.database,
                container: sink.container,
                setting: store.recreate_key.to_string(),
            }),
            (source, sink) => {
                debug!(
                    operation = operation.index,
                    known = source.is_some() && sink.is_some(),
                    "Recreate requested on a different or unknown {} container",
                    store.store
                );
                Ok(())
            }
        }
    }
}

/// Extract one `Key=Value` segment from a `;`-separated connection string
///
/// The key is matched ignoring ASCII case and the value is trimmed; a blank
/// value counts as absent.
pub fn connection_string_value(connection_string: &str, key: &str) -> Option<String> {
    connection_string
        .split(';')
        .filter_map(|segment| segment.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case(key))
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
