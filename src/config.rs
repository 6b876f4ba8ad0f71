// src/config.rs

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{errors::ConfigError, settings::SettingValue};

/// The only accepted document version. A literal match, not a range.
pub const CONFIG_VERSION: &str = "2.0";

/// One setting's desired state as recorded in a configuration document.
///
/// Exactly one of the optional value fields is authoritative, chosen by the
/// setting's input type; the rest are ignored. Legacy files may carry extra
/// populated fields, so readers always dispatch on input type and null-check
/// rather than trusting which fields happen to be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationItem {
    #[serde(rename = "Id")]
    pub id: String,

    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "IsSelected", default, skip_serializing_if = "Option::is_none")]
    pub is_selected: Option<bool>,

    #[serde(
        rename = "SelectedIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_index: Option<i64>,

    /// AC/DC or raw numeric values keyed by variant name ("ACValue",
    /// "DCValue").
    #[serde(
        rename = "PowerSettings",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub power_settings: Option<IndexMap<String, i64>>,

    #[serde(
        rename = "PowerPlanGuid",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub power_plan_guid: Option<String>,

    /// For the power-plan setting this is the plan's friendly name; custom
    /// multi-value settings reuse it as a generic display label.
    #[serde(
        rename = "PowerPlanName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub power_plan_name: Option<String>,

    /// Raw multi-registry-value combination for settings whose configured
    /// state is not expressible as a simple option index.
    #[serde(
        rename = "CustomStateValues",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub custom_state_values: Option<IndexMap<String, SettingValue>>,
}

impl ConfigurationItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn selected(id: impl Into<String>, selected: bool) -> Self {
        Self {
            id: id.into(),
            is_selected: Some(selected),
            ..Default::default()
        }
    }
}

/// A flat, ordered list of configuration items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSection {
    #[serde(rename = "Items", default)]
    pub items: Vec<ConfigurationItem>,
}

impl ConfigSection {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Ordered mapping from feature id to its section of items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureGroupSection {
    #[serde(rename = "Features", default)]
    pub features: IndexMap<String, ConfigSection>,
}

impl FeatureGroupSection {
    pub fn is_empty(&self) -> bool {
        self.features.values().all(ConfigSection::is_empty)
    }
}

/// Root configuration document. Loaded wholesale; immutable once loaded —
/// transformations (compatibility filtering, approved-only rebuilds) always
/// produce a new copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedConfigurationFile {
    #[serde(rename = "Version")]
    pub version: String,

    #[serde(rename = "WindowsApps", default)]
    pub windows_apps: ConfigSection,

    #[serde(rename = "ExternalApps", default)]
    pub external_apps: ConfigSection,

    #[serde(rename = "Optimize", default)]
    pub optimize: FeatureGroupSection,

    #[serde(rename = "Customize", default)]
    pub customize: FeatureGroupSection,
}

impl Default for UnifiedConfigurationFile {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            windows_apps: ConfigSection::default(),
            external_apps: ConfigSection::default(),
            optimize: FeatureGroupSection::default(),
            customize: FeatureGroupSection::default(),
        }
    }
}

impl UnifiedConfigurationFile {
    pub fn load_from_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        if config.version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion(config.version));
        }
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::load_from_str(&raw)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        tracing::debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Optimize feature sections followed by Customize feature sections.
    pub fn feature_sections(&self) -> impl Iterator<Item = (&str, &ConfigSection)> {
        self.optimize
            .features
            .iter()
            .chain(self.customize.features.iter())
            .map(|(feature, section)| (feature.as_str(), section))
    }
}

/// Fixed backup location used when the user does not pick a path:
/// `%LOCALAPPDATA%\Winhance\Backup`.
pub fn default_backup_dir() -> Option<PathBuf> {
    std::env::var_os("LOCALAPPDATA")
        .map(|base| PathBuf::from(base).join("Winhance").join("Backup"))
}
