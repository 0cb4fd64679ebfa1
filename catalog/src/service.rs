//! Consumer-facing handles over the plugin and team stores.
//!
//! [`PluginCatalog`] owns the plugin store and is passed around by clone;
//! every clone sees the same state. Views that should make sure their data
//! is loaded go through a [`Subscriber`], which triggers each load at most
//! once over its lifetime and leaves deduplication across subscribers to the
//! reducer.

use crate::config::CatalogConfig;
use crate::error::{ConfigError, TransportError};
use crate::plugins::{CatalogPlugin, PluginsAction, PluginsEnvironment, PluginsReducer, PluginsState};
use crate::teams::{Team, TeamsAction, TeamsEnvironment, TeamsReducer, TeamsState};
use crate::transport::{PluginTransport, TeamTransport};
use loadstate_core::request::RequestView;
use loadstate_runtime::{EffectHandle, Store, StoreConfig, StoreError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Store running the plugins reducer
pub type PluginStore = Store<PluginsState, PluginsAction, PluginsEnvironment, PluginsReducer>;

/// Store running the teams reducer
pub type TeamStore = Store<TeamsState, TeamsAction, TeamsEnvironment, TeamsReducer>;

/// Plugin catalog service
#[derive(Clone)]
pub struct PluginCatalog {
    store: PluginStore,
    config: CatalogConfig,
}

impl PluginCatalog {
    /// Create a catalog over `transport`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` does not validate.
    pub fn new(transport: Arc<dyn PluginTransport>, config: CatalogConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let reducer = PluginsReducer::new().with_details_for_unknown_ids(config.details_for_unknown_ids);
        let store = Store::with_config(
            PluginsState::new(&config.namespace),
            reducer,
            PluginsEnvironment::new(transport),
            config.store_config(),
        );

        tracing::info!(namespace = %config.namespace, "Plugin catalog created");
        Ok(Self { store, config })
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &PluginStore {
        &self.store
    }

    /// The configuration the catalog was created with
    #[must_use]
    pub const fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Load the catalog unless it was loaded before.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn fetch_all(&self) -> Result<EffectHandle, StoreError> {
        self.store.send(PluginsAction::FetchAll).await
    }

    /// Load the details of `id` unless loaded or loading.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn fetch_details(&self, id: impl Into<String>) -> Result<EffectHandle, StoreError> {
        self.store.send(PluginsAction::FetchDetails { id: id.into() }).await
    }

    /// Install `version` of `id`, or update to it when `is_updating`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn install(
        &self,
        id: impl Into<String>,
        version: impl Into<String>,
        is_updating: bool,
    ) -> Result<EffectHandle, StoreError> {
        self.store
            .send(PluginsAction::Install {
                id: id.into(),
                version: version.into(),
                is_updating,
            })
            .await
    }

    /// Uninstall `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn uninstall(&self, id: impl Into<String>) -> Result<EffectHandle, StoreError> {
        self.store.send(PluginsAction::Uninstall { id: id.into() }).await
    }

    /// Snapshot of all plugins, without triggering a load
    pub async fn all(&self) -> Vec<CatalogPlugin> {
        self.store.state(|s| s.all().into_iter().cloned().collect()).await
    }

    /// Snapshot of one plugin, without triggering a load
    pub async fn get(&self, id: &str) -> Option<CatalogPlugin> {
        self.store.state(|s| s.get(id).cloned()).await
    }

    /// Loading/error view of the bulk load
    pub async fn fetch_status(&self) -> RequestView<TransportError> {
        self.store.state(PluginsState::fetch_status).await
    }

    /// Loading/error view of detail loads
    pub async fn details_status(&self) -> RequestView<TransportError> {
        self.store.state(PluginsState::details_status).await
    }

    /// Loading/error view of installs
    pub async fn install_status(&self) -> RequestView<TransportError> {
        self.store.state(PluginsState::install_status).await
    }

    /// Loading/error view of uninstalls
    pub async fn uninstall_status(&self) -> RequestView<TransportError> {
        self.store.state(PluginsState::uninstall_status).await
    }

    /// Handle that loads what it reads, once
    #[must_use]
    pub fn subscribe(&self) -> Subscriber {
        Subscriber {
            catalog: self.clone(),
            bulk: None,
            fetched_details: HashSet::new(),
            handles: Vec::new(),
        }
    }

    /// Settle events as they are produced
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<PluginsAction> {
        self.store.subscribe_actions()
    }

    /// Wait while the bulk load is pending, whoever started it.
    ///
    /// Settle actions are broadcast after they are reduced, so the status is
    /// re-read on every action received.
    async fn bulk_settled(&self) {
        let mut actions = self.store.subscribe_actions();
        while self.fetch_status().await.pending {
            match actions.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {},
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Stop accepting commands and wait for running calls.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if calls are still running
    /// after the configured timeout.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        self.store.shutdown(self.config.shutdown_timeout()).await
    }
}

/// Ensure-loaded reader over a [`PluginCatalog`].
///
/// Each read triggers the loads it depends on the first time it is made
/// through this handle and then returns the current snapshot, which may
/// still be empty while the load runs. Use [`Subscriber::settled`] to wait
/// for the loads this handle started.
///
/// [`Subscriber::get`] waits for a pending bulk load, whether this handle or
/// another one started it, before deciding on the detail load, so that a
/// cold catalog still gets the plugin's details.
pub struct Subscriber {
    catalog: PluginCatalog,
    bulk: Option<EffectHandle>,
    fetched_details: HashSet<String>,
    handles: Vec<EffectHandle>,
}

impl Subscriber {
    /// All plugins; triggers the bulk load on first use.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if a load has to be
    /// triggered after the catalog shut down.
    pub async fn all(&mut self) -> Result<Vec<CatalogPlugin>, StoreError> {
        self.ensure_all().await?;
        Ok(self.catalog.all().await)
    }

    /// One plugin; triggers the bulk load and its detail load on first use.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if a load has to be
    /// triggered after the catalog shut down.
    pub async fn get(&mut self, id: &str) -> Result<Option<CatalogPlugin>, StoreError> {
        self.ensure_all().await?;
        if !self.fetched_details.contains(id) {
            self.catalog.bulk_settled().await;
            let handle = self.catalog.fetch_details(id).await?;
            self.fetched_details.insert(id.to_string());
            self.handles.push(handle);
        }
        Ok(self.catalog.get(id).await)
    }

    /// Wait until every load triggered through this handle has settled.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if `timeout` expires first.
    pub async fn settled(&mut self, timeout: Duration) -> Result<(), StoreError> {
        let waits = self.bulk.iter_mut().chain(&mut self.handles).map(EffectHandle::wait);
        tokio::time::timeout(timeout, futures::future::join_all(waits))
            .await
            .map_err(|_| StoreError::Timeout)?;

        self.handles.clear();
        Ok(())
    }

    async fn ensure_all(&mut self) -> Result<(), StoreError> {
        if self.bulk.is_none() {
            self.bulk = Some(self.catalog.fetch_all().await?);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("fetched_all", &self.bulk.is_some())
            .field("fetched_details", &self.fetched_details)
            .field("pending_loads", &self.handles.len())
            .finish_non_exhaustive()
    }
}

/// Team list service
#[derive(Clone)]
pub struct TeamDirectory {
    store: TeamStore,
}

impl TeamDirectory {
    /// Create a team directory over `transport`
    #[must_use]
    pub fn new(transport: Arc<dyn TeamTransport>, config: StoreConfig) -> Self {
        Self {
            store: Store::with_config(
                TeamsState::default(),
                TeamsReducer,
                TeamsEnvironment::new(transport),
                config,
            ),
        }
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &TeamStore {
        &self.store
    }

    /// Load the team list unless it was loaded before.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn fetch_all(&self) -> Result<EffectHandle, StoreError> {
        self.store.send(TeamsAction::FetchAll).await
    }

    /// Load the team list again unless a load is running.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn refresh(&self) -> Result<EffectHandle, StoreError> {
        self.store.send(TeamsAction::Refresh).await
    }

    /// Change the search text.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn set_search_query(&self, query: impl Into<String>) -> Result<(), StoreError> {
        self.store.send(TeamsAction::SetSearchQuery(query.into())).await.map(drop)
    }

    /// Teams matching the search text
    pub async fn filtered(&self) -> Vec<Team> {
        self.store
            .state(|s| s.filtered().into_iter().cloned().collect())
            .await
    }

    /// Number of loaded teams
    pub async fn count(&self) -> usize {
        self.store.state(TeamsState::count).await
    }

    /// Loading/error view of the bulk load
    pub async fn fetch_status(&self) -> RequestView<TransportError> {
        self.store.state(TeamsState::fetch_status).await
    }
}
