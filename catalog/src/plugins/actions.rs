//! Plugin catalog actions.

use super::types::{CatalogPlugin, PluginPatch};
use crate::error::TransportError;
use loadstate_core::cache::EntityUpdate;
use loadstate_core::request::RequestEvent;
use loadstate_core::signal::Signal;
use serde::{Deserialize, Serialize};

/// Lifecycle event of the bulk load
pub type FetchAllEvent = RequestEvent<Vec<CatalogPlugin>, TransportError>;

/// Lifecycle event of an operation that patches one plugin
pub type UpdateEvent = RequestEvent<EntityUpdate<CatalogPlugin>, TransportError>;

/// Payload of a plugins lifecycle signal.
///
/// `fulfilled` signals carry entity data, `rejected` signals carry the error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignalPayload {
    /// Full records, upserted in order
    Plugins(Vec<CatalogPlugin>),
    /// Partial record for one plugin
    Update {
        /// Plugin id
        id: String,
        /// Fields to overwrite
        changes: PluginPatch,
    },
    /// Why the operation failed
    Error(TransportError),
}

impl SignalPayload {
    /// The error carried by a `rejected` signal
    #[must_use]
    pub fn into_error(self) -> Option<TransportError> {
        match self {
            Self::Error(error) => Some(error),
            Self::Plugins(_) | Self::Update { .. } => None,
        }
    }
}

/// Everything the plugins reducer handles.
///
/// Commands come from consumers; events come back from transport effects
/// (or from an external string-typed transport via [`PluginsAction::Signal`]).
#[derive(Debug, Clone, PartialEq)]
pub enum PluginsAction {
    // Commands
    /// Load the catalog unless it was loaded before
    FetchAll,

    /// Load the details of one plugin unless already loaded or loading
    FetchDetails {
        /// Plugin id
        id: String,
    },

    /// Install `version`, or update to it when `is_updating`
    Install {
        /// Plugin id
        id: String,
        /// Version to install
        version: String,
        /// The plugin is installed and this replaces the installed version
        is_updating: bool,
    },

    /// Remove an installed plugin
    Uninstall {
        /// Plugin id
        id: String,
    },

    // Events
    /// `fetchAll` settled
    AllFetched(FetchAllEvent),

    /// `fetchDetails`, `install` or `uninstall` settled
    Updated(UpdateEvent),

    /// Lifecycle signal from a string-typed transport
    Signal(Signal<SignalPayload>),
}

impl PluginsAction {
    /// Whether this is a settle event (`fulfilled` or `rejected`)
    ///
    /// Useful as a predicate for `send_and_wait_for`.
    #[must_use]
    pub fn is_settlement(&self) -> bool {
        use loadstate_core::request::Phase;

        match self {
            Self::AllFetched(event) => event.phase() != Phase::Pending,
            Self::Updated(event) => event.phase() != Phase::Pending,
            _ => false,
        }
    }
}
