//! Plugin catalog feature.
//!
//! Four operations act on one entity cache of [`CatalogPlugin`]s:
//!
//! | Operation        | Trigger policy                         | On success                         |
//! |------------------|----------------------------------------|------------------------------------|
//! | `fetchAll`       | once per session                       | upsert every plugin                |
//! | `fetchDetails`   | unless pending or details present      | attach details                     |
//! | `install`        | always                                 | installed, version set             |
//! | `uninstall`      | always                                 | not installed, version cleared     |
//!
//! Operation names are `<namespace>/<operation>` with the namespace taken
//! from [`CatalogConfig`](crate::CatalogConfig).

pub mod actions;
pub mod reducer;
pub mod state;
pub mod types;

pub use actions::{PluginsAction, SignalPayload};
pub use reducer::{PluginsEnvironment, PluginsReducer};
pub use state::{PluginOperations, PluginsState};
pub use types::{CatalogPlugin, PluginDetails, PluginLink, PluginPatch, PluginType, PluginVersion};
