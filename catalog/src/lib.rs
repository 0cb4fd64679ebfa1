//! # Loadstate Catalog
//!
//! Plugin catalog and team list built on request-tracked entity caches.
//!
//! ## Features
//!
//! - **Plugins**: bulk load, on-demand details, install, uninstall
//! - **Teams**: bulk load, refresh, case-insensitive search
//! - **Deduplication**: repeated triggers while a load runs issue one call
//! - **Status views**: `pending` flag and last error per operation
//!
//! ## Architecture
//!
//! ```text
//! Command → Reducer (policy + pending) → Effect (transport call)
//!                                           ↓
//!                     Reducer (status + entities) ← Settle action
//! ```
//!
//! ## Example
//!
//! ```
//! use loadstate_catalog::mocks::MockTransport;
//! use loadstate_catalog::plugins::{CatalogPlugin, PluginType};
//! use loadstate_catalog::{CatalogConfig, PluginCatalog};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = MockTransport::new()
//!     .with_plugins(vec![CatalogPlugin::new("grafana-clock-panel", "Clock", PluginType::Panel)]);
//! let catalog = PluginCatalog::new(Arc::new(transport), CatalogConfig::default())?;
//!
//! let mut view = catalog.subscribe();
//! view.all().await?;
//! view.settled(Duration::from_secs(1)).await?;
//!
//! assert_eq!(view.all().await?.len(), 1);
//! assert!(!catalog.fetch_status().await.pending);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod mocks;
pub mod plugins;
pub mod service;
pub mod teams;
pub mod transport;

pub use config::CatalogConfig;
pub use error::{ConfigError, TransportError};
pub use service::{PluginCatalog, Subscriber, TeamDirectory};
pub use transport::{PluginTransport, TeamTransport};
