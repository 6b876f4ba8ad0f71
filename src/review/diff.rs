// src/review/diff.rs

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    config::ConfigurationItem,
    discovery::{ComboResolver, SettingStateResult},
    power,
    settings::{registry::SettingRegistry, InputType, SettingDefinition},
    strings::{localize, KEY_OFF, KEY_ON, KEY_UNKNOWN},
    version::WindowsVersion,
};

/// Settings representing one-shot operations rather than steady state. They
/// are always surfaced during review with a confirmation prompt, whether or
/// not current and configured values differ — "no difference" is meaningless
/// for an action. Kept as one table so the diff engine and the apply
/// confirmation policy consult the same set.
pub const ACTION_SETTINGS: &[(&str, &str)] = &[
    ("theme-wallpaper", "review.action.theme-wallpaper"),
    ("clean-taskbar", "review.action.clean-taskbar"),
    ("clean-start-menu-10", "review.action.clean-start-menu"),
    ("clean-start-menu-11", "review.action.clean-start-menu"),
];

pub fn action_confirmation_key(setting_id: &str) -> Option<&'static str> {
    ACTION_SETTINGS
        .iter()
        .find(|(id, _)| *id == setting_id)
        .map(|(_, key)| *key)
}

pub fn is_action_setting(setting_id: &str) -> bool {
    action_confirmation_key(setting_id).is_some()
}

/// The computed discrepancy between a setting's live value and its
/// configured value. Immutable: approval changes go through
/// [`with_approval`](Self::with_approval), which produces a new value for
/// insertion into the session's diff map.
///
/// Display strings are carried twice: resolved text for immediate rendering
/// and the raw keys they came from, so the UI can re-render after a language
/// change without recomputing system state.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigReviewDiff {
    pub setting_id: String,
    pub feature_id: String,
    pub current_display: String,
    pub config_display: String,
    pub current_display_key: String,
    pub config_display_key: String,
    /// Reviewed and approved are independent: reviewed-but-rejected is a
    /// valid terminal state distinct from "not yet looked at".
    pub is_reviewed: bool,
    pub is_approved: bool,
    pub is_action: bool,
    pub action_message: Option<String>,
    /// Back-reference to the source configuration item.
    pub item: ConfigurationItem,
}

impl ConfigReviewDiff {
    pub fn with_approval(mut self, approved: bool) -> Self {
        self.is_reviewed = true;
        self.is_approved = approved;
        self
    }
}

/// Pure comparison of configured items against a batch of discovered system
/// states, one feature at a time.
pub struct DiffEngine<'a> {
    registry: &'a SettingRegistry,
    combo: &'a dyn ComboResolver,
    version: WindowsVersion,
}

impl<'a> DiffEngine<'a> {
    pub fn new(
        registry: &'a SettingRegistry,
        combo: &'a dyn ComboResolver,
        version: WindowsVersion,
    ) -> Self {
        Self {
            registry,
            combo,
            version,
        }
    }

    /// Diffs for every configured item of one feature. Items with no
    /// matching definition (stale ids from older versions) and items whose
    /// definition does not apply to the running build are skipped silently.
    pub fn compute_feature_diffs(
        &self,
        feature_id: &str,
        items: &[ConfigurationItem],
        states: &IndexMap<String, SettingStateResult>,
    ) -> Vec<ConfigReviewDiff> {
        let mut diffs = Vec::new();

        for item in items {
            let Some(definition) = self.registry.get(&item.id) else {
                debug!("Skipping '{}': no definition for this id", item.id);
                continue;
            };
            if !definition.compat.supports(&self.version) {
                debug!(
                    "Skipping '{}': does not apply to build {}",
                    item.id, self.version.build
                );
                continue;
            }

            if let Some(message_key) = action_confirmation_key(&item.id) {
                diffs.push(self.action_diff(feature_id, item, message_key));
                continue;
            }

            let Some(state) = states.get(item.id.as_str()).filter(|state| state.success) else {
                debug!("Skipping '{}': no system state available", item.id);
                continue;
            };

            let comparison = match definition.input_type {
                InputType::Toggle | InputType::CheckBox => Self::compare_toggle(item, state),
                InputType::Selection => self.compare_selection(definition, item, state),
                InputType::NumericRange => Self::compare_numeric(definition, item, state),
            };

            if let Some((current_key, config_key)) = comparison {
                diffs.push(ConfigReviewDiff {
                    setting_id: item.id.clone(),
                    feature_id: feature_id.to_string(),
                    current_display: localize(&current_key).to_string(),
                    config_display: localize(&config_key).to_string(),
                    current_display_key: current_key,
                    config_display_key: config_key,
                    is_reviewed: false,
                    is_approved: false,
                    is_action: false,
                    action_message: None,
                    item: item.clone(),
                });
            }
        }

        diffs
    }

    fn action_diff(
        &self,
        feature_id: &str,
        item: &ConfigurationItem,
        message_key: &str,
    ) -> ConfigReviewDiff {
        let message = localize(message_key).to_string();
        ConfigReviewDiff {
            setting_id: item.id.clone(),
            feature_id: feature_id.to_string(),
            current_display: message.clone(),
            config_display: message.clone(),
            current_display_key: message_key.to_string(),
            config_display_key: message_key.to_string(),
            is_reviewed: false,
            is_approved: false,
            is_action: true,
            action_message: Some(message),
            item: item.clone(),
        }
    }

    fn compare_toggle(
        item: &ConfigurationItem,
        state: &SettingStateResult,
    ) -> Option<(String, String)> {
        let configured = item.is_selected.unwrap_or(false);
        if state.is_enabled == configured {
            return None;
        }
        Some((toggle_key(state.is_enabled), toggle_key(configured)))
    }

    fn compare_selection(
        &self,
        definition: &SettingDefinition,
        item: &ConfigurationItem,
        state: &SettingStateResult,
    ) -> Option<(String, String)> {
        if item.power_plan_guid.is_some() {
            return Self::compare_power_plan(item, state);
        }
        if item.custom_state_values.is_some() {
            return self.compare_custom_state(definition, item, state);
        }

        let resolved = self.combo.resolve(definition, state);
        if resolved.selected_index == item.selected_index {
            return None;
        }
        Some((
            option_key(&resolved.option_keys, resolved.selected_index),
            option_key(&resolved.option_keys, item.selected_index),
        ))
    }

    /// Power plans compare by normalized GUID first; when GUIDs disagree,
    /// both sides are resolved against the predefined plan table (by GUID,
    /// then by the name marker of the app's custom plan, which is recreated
    /// with a fresh GUID across runs). Only unresolvable disagreement is a
    /// diff.
    fn compare_power_plan(
        item: &ConfigurationItem,
        state: &SettingStateResult,
    ) -> Option<(String, String)> {
        let current_guid = state.raw.active_plan_guid.as_deref();
        let current_name = state.raw.active_plan_name.as_deref();
        let config_guid = item.power_plan_guid.as_deref();
        let config_name = item.power_plan_name.as_deref();

        if power::plans_equivalent(current_guid, current_name, config_guid, config_name) {
            return None;
        }
        Some((
            plan_key(current_guid, current_name),
            plan_key(config_guid, config_name),
        ))
    }

    /// Custom multi-value settings have no meaningful index in the config;
    /// the configured state is identified by its display label, compared
    /// against the label of the currently resolved option.
    fn compare_custom_state(
        &self,
        definition: &SettingDefinition,
        item: &ConfigurationItem,
        state: &SettingStateResult,
    ) -> Option<(String, String)> {
        let resolved = self.combo.resolve(definition, state);
        let current_key = option_key(&resolved.option_keys, resolved.selected_index);
        let config_label = item.power_plan_name.clone().unwrap_or_default();

        if localize(&current_key) == config_label {
            return None;
        }
        Some((current_key, config_label))
    }

    /// The AC value drives the reported diff; DC is tracked alongside in
    /// the item and applied with it, but a DC-only difference is not
    /// surfaced.
    fn compare_numeric(
        definition: &SettingDefinition,
        item: &ConfigurationItem,
        state: &SettingStateResult,
    ) -> Option<(String, String)> {
        let power_settings = item.power_settings.as_ref()?;
        let configured_ac = *power_settings.get("ACValue")?;

        let current_ac = state.raw.ac_value.map(i64::from);
        if current_ac == Some(configured_ac) {
            if let Some(configured_dc) = power_settings.get("DCValue") {
                if state.raw.dc_value.map(i64::from) != Some(*configured_dc) {
                    debug!(
                        "'{}' differs on DC only ({:?} vs {})",
                        item.id, state.raw.dc_value, configured_dc
                    );
                }
            }
            return None;
        }

        let unit = definition
            .powercfg
            .as_ref()
            .map(|spec| spec.unit)
            .unwrap_or("");
        let current = current_ac
            .map(|value| format!("{}{}", value, unit))
            .unwrap_or_else(|| KEY_UNKNOWN.to_string());
        Some((current, format!("{}{}", configured_ac, unit)))
    }
}

fn toggle_key(enabled: bool) -> String {
    if enabled { KEY_ON } else { KEY_OFF }.to_string()
}

fn option_key(option_keys: &[&'static str], index: Option<i64>) -> String {
    index
        .and_then(|index| usize::try_from(index).ok())
        .and_then(|index| option_keys.get(index))
        .map(|key| key.to_string())
        .unwrap_or_else(|| KEY_UNKNOWN.to_string())
}

fn plan_key(guid: Option<&str>, name: Option<&str>) -> String {
    if let Some(plan) = power::resolve_predefined(guid, name) {
        return plan.display_key.to_string();
    }
    name.map(str::to_string)
        .or_else(|| guid.map(str::to_string))
        .unwrap_or_else(|| KEY_UNKNOWN.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        discovery::{DefinitionComboResolver, RawStateValues},
        settings::SettingValue,
    };

    const WIN11: WindowsVersion = WindowsVersion::new(22631);

    static RESOLVER: DefinitionComboResolver = DefinitionComboResolver;

    fn engine(registry: &SettingRegistry) -> DiffEngine<'_> {
        DiffEngine::new(registry, &RESOLVER, WIN11)
    }

    fn states_of(results: Vec<SettingStateResult>) -> IndexMap<String, SettingStateResult> {
        results
            .into_iter()
            .map(|state| (state.id.clone(), state))
            .collect()
    }

    #[test]
    fn toggle_diff_symmetry() {
        let registry = SettingRegistry::builtin();
        let engine = engine(&registry);

        for (current, configured) in [(true, false), (false, true)] {
            let items = vec![ConfigurationItem::selected("disable-telemetry", configured)];
            let states = states_of(vec![
                SettingStateResult::ok("disable-telemetry").enabled(current)
            ]);
            let diffs = engine.compute_feature_diffs("privacy", &items, &states);
            assert_eq!(diffs.len(), 1, "{current} vs {configured} must diff");
            let expected_current = if current { "On" } else { "Off" };
            assert_eq!(diffs[0].current_display, expected_current);
        }

        for agreed in [true, false] {
            let items = vec![ConfigurationItem::selected("disable-telemetry", agreed)];
            let states = states_of(vec![
                SettingStateResult::ok("disable-telemetry").enabled(agreed)
            ]);
            let diffs = engine.compute_feature_diffs("privacy", &items, &states);
            assert!(diffs.is_empty(), "{agreed} vs {agreed} must not diff");
        }
    }

    #[test]
    fn missing_is_selected_defaults_to_false() {
        let registry = SettingRegistry::builtin();
        let engine = engine(&registry);

        let items = vec![ConfigurationItem::new("disable-telemetry")];
        let states = states_of(vec![
            SettingStateResult::ok("disable-telemetry").enabled(false)
        ]);
        assert!(engine
            .compute_feature_diffs("privacy", &items, &states)
            .is_empty());
    }

    #[test]
    fn action_settings_always_diff_with_message() {
        let registry = SettingRegistry::builtin();
        let engine = engine(&registry);

        // No system state at all: the action must still surface.
        let items = vec![ConfigurationItem::selected("clean-taskbar", true)];
        let diffs = engine.compute_feature_diffs("taskbar", &items, &IndexMap::new());
        assert_eq!(diffs.len(), 1);
        assert!(diffs[0].is_action);
        let message = diffs[0].action_message.as_deref().unwrap();
        assert!(!message.is_empty());
    }

    #[test]
    fn os_variant_action_is_skipped_on_wrong_build() {
        let registry = SettingRegistry::builtin();
        let engine = engine(&registry); // Windows 11

        let items = vec![
            ConfigurationItem::selected("clean-start-menu-10", true),
            ConfigurationItem::selected("clean-start-menu-11", true),
        ];
        let diffs = engine.compute_feature_diffs("start-menu", &items, &IndexMap::new());
        let ids: Vec<&str> = diffs.iter().map(|d| d.setting_id.as_str()).collect();
        assert_eq!(ids, vec!["clean-start-menu-11"]);
    }

    #[test]
    fn stale_config_id_is_silently_skipped() {
        let registry = SettingRegistry::builtin();
        let engine = engine(&registry);

        let items = vec![ConfigurationItem::selected("removed-in-v3", true)];
        let diffs = engine.compute_feature_diffs("privacy", &items, &IndexMap::new());
        assert!(diffs.is_empty());
    }

    #[test]
    fn failed_discovery_excludes_setting() {
        let registry = SettingRegistry::builtin();
        let engine = engine(&registry);

        let items = vec![ConfigurationItem::selected("disable-telemetry", true)];
        let states = states_of(vec![SettingStateResult::failed(
            "disable-telemetry",
            "access denied",
        )]);
        assert!(engine
            .compute_feature_diffs("privacy", &items, &states)
            .is_empty());
    }

    #[test]
    fn selection_diffs_through_resolved_index() {
        let registry = SettingRegistry::builtin();
        let engine = engine(&registry);

        let mut item = ConfigurationItem::new("taskbar-alignment");
        item.selected_index = Some(0); // Left
        let states = states_of(vec![
            SettingStateResult::ok("taskbar-alignment").value(SettingValue::Int(1)) // Center
        ]);
        let diffs = engine.compute_feature_diffs("taskbar", &[item], &states);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].current_display, "Center");
        assert_eq!(diffs[0].config_display, "Left");
        assert_eq!(diffs[0].current_display_key, "taskbar.alignment.center");
    }

    #[test]
    fn selection_equal_after_resolution_does_not_diff() {
        let registry = SettingRegistry::builtin();
        let engine = engine(&registry);

        let mut item = ConfigurationItem::new("launch-to-this-pc");
        item.selected_index = Some(1); // This PC, stored value 1
        let states = states_of(vec![
            SettingStateResult::ok("launch-to-this-pc").value(SettingValue::Int(1))
        ]);
        assert!(engine
            .compute_feature_diffs("explorer", &[item], &states)
            .is_empty());
    }

    #[test]
    fn power_plan_guid_reformatting_is_not_a_diff() {
        let registry = SettingRegistry::builtin();
        let engine = engine(&registry);

        let mut item = ConfigurationItem::new("power-plan-selection");
        item.power_plan_guid = Some("3c0bc021c8a84e07a9736b14cbcb2b7e".to_string());
        item.power_plan_name = Some("Custom".to_string());

        let mut raw = RawStateValues::default();
        raw.active_plan_guid = Some("{3C0BC021-C8A8-4E07-A973-6B14CBCB2B7E}".to_string());
        raw.active_plan_name = Some("Custom".to_string());
        let states = states_of(vec![
            SettingStateResult::ok("power-plan-selection").raw_values(raw)
        ]);

        assert!(engine
            .compute_feature_diffs("power", &[item], &states)
            .is_empty());
    }

    #[test]
    fn recreated_custom_plan_is_not_a_diff() {
        let registry = SettingRegistry::builtin();
        let engine = engine(&registry);

        let mut item = ConfigurationItem::new("power-plan-selection");
        item.power_plan_guid = Some("0f6b31cc-1db0-4c25-9f0a-b923cf071f8a".to_string());
        item.power_plan_name = Some("Winhance Power Plan".to_string());

        let mut raw = RawStateValues::default();
        raw.active_plan_guid = Some("77c1021e-19a4-4087-b34b-6a9c0c9e735f".to_string());
        raw.active_plan_name = Some("Winhance Power Plan".to_string());
        let states = states_of(vec![
            SettingStateResult::ok("power-plan-selection").raw_values(raw)
        ]);

        assert!(engine
            .compute_feature_diffs("power", &[item], &states)
            .is_empty());
    }

    #[test]
    fn different_power_plans_diff_with_plan_names() {
        let registry = SettingRegistry::builtin();
        let engine = engine(&registry);

        let mut item = ConfigurationItem::new("power-plan-selection");
        item.power_plan_guid = Some(power::HIGH_PERFORMANCE_PLAN_GUID.to_string());
        item.power_plan_name = Some("High performance".to_string());

        let mut raw = RawStateValues::default();
        raw.active_plan_guid = Some(power::BALANCED_PLAN_GUID.to_string());
        raw.active_plan_name = Some("Balanced".to_string());
        let states = states_of(vec![
            SettingStateResult::ok("power-plan-selection").raw_values(raw)
        ]);

        let diffs = engine.compute_feature_diffs("power", &[item], &states);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].current_display, "Balanced");
        assert_eq!(diffs[0].config_display, "High performance");
    }

    #[test]
    fn custom_state_compares_display_labels() {
        let registry = SettingRegistry::builtin();
        let engine = engine(&registry);

        let mut item = ConfigurationItem::new("updates-policy-mode");
        item.custom_state_values = Some(IndexMap::from([(
            "NoAutoUpdate".to_string(),
            SettingValue::Int(1),
        )]));
        item.power_plan_name = Some("Updates disabled".to_string());

        // Current system is on the default mode.
        let mut raw = RawStateValues::default();
        raw.registry
            .insert("NoAutoUpdate".to_string(), SettingValue::Int(0));
        let states = states_of(vec![
            SettingStateResult::ok("updates-policy-mode").raw_values(raw)
        ]);

        let diffs = engine.compute_feature_diffs("update", &[item.clone()], &states);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].current_display, "Default (recommended)");
        assert_eq!(diffs[0].config_display, "Updates disabled");

        // Same label on both sides: no diff.
        let mut raw = RawStateValues::default();
        raw.registry
            .insert("NoAutoUpdate".to_string(), SettingValue::Int(1));
        let states = states_of(vec![
            SettingStateResult::ok("updates-policy-mode").raw_values(raw)
        ]);
        assert!(engine
            .compute_feature_diffs("update", &[item], &states)
            .is_empty());
    }

    #[test]
    fn numeric_diff_is_driven_by_ac_value() {
        let registry = SettingRegistry::builtin();
        let engine = engine(&registry);

        let mut item = ConfigurationItem::new("processor-max-state");
        item.power_settings = Some(IndexMap::from([
            ("ACValue".to_string(), 100i64),
            ("DCValue".to_string(), 80i64),
        ]));

        let mut raw = RawStateValues::default();
        raw.ac_value = Some(80);
        raw.dc_value = Some(80);
        let states = states_of(vec![
            SettingStateResult::ok("processor-max-state").raw_values(raw)
        ]);

        let diffs = engine.compute_feature_diffs("power", &[item.clone()], &states);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].current_display, "80%");
        assert_eq!(diffs[0].config_display, "100%");

        // AC matches, DC differs: tracked but not surfaced.
        let mut raw = RawStateValues::default();
        raw.ac_value = Some(100);
        raw.dc_value = Some(50);
        let states = states_of(vec![
            SettingStateResult::ok("processor-max-state").raw_values(raw)
        ]);
        assert!(engine
            .compute_feature_diffs("power", &[item], &states)
            .is_empty());
    }

    #[test]
    fn with_approval_marks_reviewed() {
        let registry = SettingRegistry::builtin();
        let engine = engine(&registry);

        let items = vec![ConfigurationItem::selected("clean-taskbar", true)];
        let diff = engine
            .compute_feature_diffs("taskbar", &items, &IndexMap::new())
            .remove(0);
        assert!(!diff.is_reviewed);

        let rejected = diff.clone().with_approval(false);
        assert!(rejected.is_reviewed);
        assert!(!rejected.is_approved);

        let approved = diff.with_approval(true);
        assert!(approved.is_reviewed && approved.is_approved);
    }
}
