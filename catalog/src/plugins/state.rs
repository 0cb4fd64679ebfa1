//! Plugin catalog state and selectors.

use super::types::CatalogPlugin;
use crate::error::TransportError;
use loadstate_core::cache::EntityCache;
use loadstate_core::request::{OperationName, RequestView};

/// Names of the catalog operations under one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOperations {
    /// Common prefix
    pub namespace: String,
    /// `<namespace>/fetchAll`
    pub fetch_all: OperationName,
    /// `<namespace>/fetchDetails`
    pub fetch_details: OperationName,
    /// `<namespace>/install`
    pub install: OperationName,
    /// `<namespace>/uninstall`
    pub uninstall: OperationName,
}

impl PluginOperations {
    /// Operation names under `namespace`
    #[must_use]
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            fetch_all: OperationName::scoped(namespace, "fetchAll"),
            fetch_details: OperationName::scoped(namespace, "fetchDetails"),
            install: OperationName::scoped(namespace, "install"),
            uninstall: OperationName::scoped(namespace, "uninstall"),
        }
    }
}

/// Plugin catalog state
#[derive(Debug, Clone)]
pub struct PluginsState {
    /// Plugins and operation status
    pub cache: EntityCache<CatalogPlugin, TransportError>,
    /// Operation names used for the status slots
    pub operations: PluginOperations,
}

impl PluginsState {
    /// Empty state with operations under `namespace`
    #[must_use]
    pub fn new(namespace: &str) -> Self {
        Self {
            cache: EntityCache::new(),
            operations: PluginOperations::new(namespace),
        }
    }

    /// All plugins in load order
    #[must_use]
    pub fn all(&self) -> Vec<&CatalogPlugin> {
        self.cache.all()
    }

    /// Plugin by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CatalogPlugin> {
        self.cache.entities.get(id)
    }

    /// Loading/error view of the bulk load
    #[must_use]
    pub fn fetch_status(&self) -> RequestView<TransportError> {
        self.cache.status(&self.operations.fetch_all)
    }

    /// Loading/error view of detail loads
    #[must_use]
    pub fn details_status(&self) -> RequestView<TransportError> {
        self.cache.status(&self.operations.fetch_details)
    }

    /// Loading/error view of installs
    #[must_use]
    pub fn install_status(&self) -> RequestView<TransportError> {
        self.cache.status(&self.operations.install)
    }

    /// Loading/error view of uninstalls
    #[must_use]
    pub fn uninstall_status(&self) -> RequestView<TransportError> {
        self.cache.status(&self.operations.uninstall)
    }
}

impl Default for PluginsState {
    fn default() -> Self {
        Self::new("plugins")
    }
}
