//! Transport interfaces.
//!
//! A transport performs the network side of an operation. It knows nothing
//! about lifecycle bookkeeping: the reducer records `pending` before the call
//! starts and turns the returned `Result` into exactly one `fulfilled` or
//! `rejected` event.
//!
//! Methods return boxed futures so the traits stay dyn-compatible and an
//! environment can hold an `Arc<dyn PluginTransport>`.

use crate::error::TransportError;
use crate::plugins::{CatalogPlugin, PluginDetails};
use crate::teams::Team;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by transport methods
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// Backend of the plugin catalog.
pub trait PluginTransport: Send + Sync {
    /// Load every plugin in the catalog.
    fn fetch_all(&self) -> TransportFuture<'_, Vec<CatalogPlugin>>;

    /// Load the detail record of one plugin.
    fn fetch_details(&self, id: String) -> TransportFuture<'_, PluginDetails>;

    /// Install (or update to) `version` of a plugin.
    fn install(&self, id: String, version: String) -> TransportFuture<'_, ()>;

    /// Remove an installed plugin.
    fn uninstall(&self, id: String) -> TransportFuture<'_, ()>;
}

/// Backend of the team list.
pub trait TeamTransport: Send + Sync {
    /// Load every team visible to the caller.
    fn fetch_teams(&self) -> TransportFuture<'_, Vec<Team>>;
}
