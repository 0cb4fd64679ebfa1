//! Plugin catalog records.

use chrono::{DateTime, Utc};
use loadstate_core::entity::Entity;
use serde::{Deserialize, Deserializer, Serialize};

/// Kind of plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    /// Bundle of pages, data sources and panels
    App,
    /// Data source
    Datasource,
    /// Panel visualization
    Panel,
    /// Image renderer
    Renderer,
}

/// One plugin as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPlugin {
    /// Unique plugin id, e.g. `grafana-clock-panel`
    pub id: String,
    /// Display name
    pub name: String,
    /// Short description
    pub description: String,
    /// Publishing organization
    pub org_name: String,
    /// Kind of plugin
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    /// Ships with the host application and cannot be uninstalled
    pub is_core: bool,
    /// Installed on this instance
    pub is_installed: bool,
    /// A newer version than the installed one is available
    pub has_update: bool,
    /// Installed version, if installed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<String>,
    /// Detail record, loaded on demand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<PluginDetails>,
}

impl CatalogPlugin {
    /// A catalog entry that is not installed and has no details yet
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, plugin_type: PluginType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            org_name: String::new(),
            plugin_type,
            is_core: false,
            is_installed: false,
            has_update: false,
            installed_version: None,
            details: None,
        }
    }

    /// Whether the detail record has been loaded
    #[must_use]
    pub const fn has_details(&self) -> bool {
        self.details.is_some()
    }
}

/// Detail record of a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDetails {
    /// Readme as markdown
    pub readme: String,
    /// Published versions, newest first
    pub versions: Vec<PluginVersion>,
    /// Links shown next to the readme
    #[serde(default)]
    pub links: Vec<PluginLink>,
}

/// A published version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginVersion {
    /// Version string
    pub version: String,
    /// Publication time
    pub created_at: DateTime<Utc>,
}

/// A named link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginLink {
    /// Link text
    pub name: String,
    /// Target
    pub url: String,
}

/// Field-by-field change to a [`CatalogPlugin`].
///
/// `None` leaves the field untouched. For `installed_version`,
/// `Some(None)` clears the field; on the wire that is an explicit `null`,
/// while a missing key leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginPatch {
    /// New `is_installed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_installed: Option<bool>,
    /// New `installed_version`
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<Option<String>>,
    /// New `has_update`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_update: Option<bool>,
    /// New `details`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<PluginDetails>,
}

// A key that is present, even as `null`, is a change.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl PluginPatch {
    /// Attach a loaded detail record
    #[must_use]
    pub fn details(details: PluginDetails) -> Self {
        Self {
            details: Some(details),
            ..Self::default()
        }
    }

    /// Mark `version` as installed; an update also clears `has_update`
    #[must_use]
    pub fn installed(version: String, is_updating: bool) -> Self {
        Self {
            is_installed: Some(true),
            installed_version: Some(Some(version)),
            has_update: is_updating.then_some(false),
            details: None,
        }
    }

    /// Mark the plugin as not installed
    #[must_use]
    pub fn uninstalled() -> Self {
        Self {
            is_installed: Some(false),
            installed_version: Some(None),
            ..Self::default()
        }
    }
}

impl Entity for CatalogPlugin {
    type Id = String;
    type Patch = PluginPatch;

    fn id(&self) -> &String {
        &self.id
    }

    fn apply_patch(&mut self, patch: PluginPatch) {
        if let Some(is_installed) = patch.is_installed {
            self.is_installed = is_installed;
        }
        if let Some(installed_version) = patch.installed_version {
            self.installed_version = installed_version;
        }
        if let Some(has_update) = patch.has_update {
            self.has_update = has_update;
        }
        if let Some(details) = patch.details {
            self.details = Some(details);
        }
    }
}
