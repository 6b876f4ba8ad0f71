// src/compat.rs

use crate::{
    config::{ConfigSection, FeatureGroupSection, UnifiedConfigurationFile},
    settings::registry::SettingRegistry,
    version::WindowsVersion,
};

/// Display names of configured settings that do not apply to the running
/// build. Items whose id has no definition are treated as compatible, so an
/// unknown-but-valid setting is never reported.
pub fn detect_incompatible_settings(
    config: &UnifiedConfigurationFile,
    registry: &SettingRegistry,
    version: &WindowsVersion,
) -> Vec<String> {
    let mut names = Vec::new();
    for (_, section) in config.feature_sections() {
        for item in &section.items {
            if let Some(definition) = registry.get(&item.id) {
                if !definition.compat.supports(version) {
                    names.push(definition.name.to_string());
                }
            }
        }
    }
    names
}

/// A copy of the configuration with incompatible settings removed from the
/// Optimize and Customize sections, so they never produce phantom diffs.
/// Dropping is silent by design: logged at debug level, never surfaced.
/// Idempotent; the app sections pass through untouched.
pub fn filter_config_for_current_system(
    config: &UnifiedConfigurationFile,
    registry: &SettingRegistry,
    version: &WindowsVersion,
) -> UnifiedConfigurationFile {
    UnifiedConfigurationFile {
        version: config.version.clone(),
        windows_apps: config.windows_apps.clone(),
        external_apps: config.external_apps.clone(),
        optimize: filter_group(&config.optimize, registry, version),
        customize: filter_group(&config.customize, registry, version),
    }
}

fn filter_group(
    group: &FeatureGroupSection,
    registry: &SettingRegistry,
    version: &WindowsVersion,
) -> FeatureGroupSection {
    let mut filtered = FeatureGroupSection::default();
    for (feature, section) in &group.features {
        let items: Vec<_> = section
            .items
            .iter()
            .filter(|item| {
                let compatible = registry
                    .get(&item.id)
                    .map(|definition| definition.compat.supports(version))
                    .unwrap_or(true);
                if !compatible {
                    tracing::debug!(
                        "Dropping '{}' from '{}': incompatible with build {}",
                        item.id,
                        feature,
                        version.build
                    );
                }
                compatible
            })
            .cloned()
            .collect();
        filtered
            .features
            .insert(feature.clone(), ConfigSection { items });
    }
    filtered
}
