// src/settings/registry.rs

use indexmap::IndexMap;

use super::{catalog, SettingDefinition};
use crate::{config::UnifiedConfigurationFile, version::WindowsVersion};

/// Lookup table over the immutable setting definitions. Loaded once;
/// read-only thereafter.
#[derive(Debug)]
pub struct SettingRegistry {
    by_id: IndexMap<&'static str, SettingDefinition>,
}

impl SettingRegistry {
    /// Registry over the built-in catalog.
    pub fn builtin() -> Self {
        Self::from_definitions(catalog::all_settings())
    }

    pub fn from_definitions(definitions: Vec<SettingDefinition>) -> Self {
        let mut by_id = IndexMap::with_capacity(definitions.len());
        for definition in definitions {
            if by_id.insert(definition.id, definition).is_some() {
                tracing::warn!("Duplicate setting definition replaced");
            }
        }
        Self { by_id }
    }

    pub fn get(&self, id: &str) -> Option<&SettingDefinition> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SettingDefinition> {
        self.by_id.values()
    }

    /// All definitions belonging to one feature, in catalog order.
    pub fn feature_settings(&self, feature_id: &str) -> Vec<&SettingDefinition> {
        self.by_id
            .values()
            .filter(|definition| definition.feature_id == feature_id)
            .collect()
    }

    /// Definitions of one feature that apply to the running build.
    pub fn filtered_settings(
        &self,
        feature_id: &str,
        version: &WindowsVersion,
    ) -> Vec<&SettingDefinition> {
        self.by_id
            .values()
            .filter(|definition| {
                definition.feature_id == feature_id && definition.compat.supports(version)
            })
            .collect()
    }

    /// The unique definitions referenced by a configuration document's
    /// Optimize and Customize sections, in document order. Unknown ids are
    /// skipped here and logged when diffing.
    pub fn definitions_for_config(
        &self,
        config: &UnifiedConfigurationFile,
    ) -> Vec<&SettingDefinition> {
        let mut seen = IndexMap::new();
        for (_, section) in config
            .optimize
            .features
            .iter()
            .chain(config.customize.features.iter())
        {
            for item in &section.items {
                if let Some(definition) = self.get(&item.id) {
                    seen.entry(definition.id).or_insert(definition);
                }
            }
        }
        seen.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::InputType;

    #[test]
    fn builtin_lookup_by_id() {
        let registry = SettingRegistry::builtin();
        let def = registry.get("disable-telemetry").unwrap();
        assert_eq!(def.feature_id, "privacy");
        assert_eq!(def.input_type, InputType::Toggle);
        assert!(registry.get("no-such-setting").is_none());
    }

    #[test]
    fn feature_filtering_respects_compatibility() {
        let registry = SettingRegistry::builtin();
        let win10 = WindowsVersion::new(19045);
        let win11 = WindowsVersion::new(22631);

        let ten: Vec<&str> = registry
            .filtered_settings("start-menu", &win10)
            .iter()
            .map(|d| d.id)
            .collect();
        assert!(ten.contains(&"clean-start-menu-10"));
        assert!(!ten.contains(&"clean-start-menu-11"));

        let eleven: Vec<&str> = registry
            .filtered_settings("start-menu", &win11)
            .iter()
            .map(|d| d.id)
            .collect();
        assert!(eleven.contains(&"clean-start-menu-11"));
        assert!(!eleven.contains(&"clean-start-menu-10"));
    }
}
