// src/discovery.rs

use indexmap::IndexMap;

use crate::settings::{SettingDefinition, SettingValue};

/// Auxiliary raw values captured next to a setting's primary state, one
/// typed field per known key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawStateValues {
    pub ac_value: Option<u32>,
    pub dc_value: Option<u32>,
    pub active_plan_guid: Option<String>,
    pub active_plan_name: Option<String>,
    /// Raw registry values keyed by value name, for settings whose current
    /// state is a multi-value combination.
    pub registry: IndexMap<String, SettingValue>,
}

/// Snapshot of one setting's live value. Created fresh per discovery batch;
/// never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingStateResult {
    pub id: String,
    pub success: bool,
    pub error: Option<String>,
    pub is_enabled: bool,
    pub current_value: Option<SettingValue>,
    pub raw: RawStateValues,
}

impl SettingStateResult {
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: true,
            error: None,
            is_enabled: false,
            current_value: None,
            raw: RawStateValues::default(),
        }
    }

    pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            error: Some(error.into()),
            is_enabled: false,
            current_value: None,
            raw: RawStateValues::default(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.is_enabled = enabled;
        self
    }

    pub fn value(mut self, value: SettingValue) -> Self {
        self.current_value = Some(value);
        self
    }

    pub fn raw_values(mut self, raw: RawStateValues) -> Self {
        self.raw = raw;
        self
    }
}

/// Batch reader of current system state. One call covers every definition a
/// review session needs, so diff computation afterwards is pure comparison.
pub trait SystemSettingsDiscovery {
    fn read_states(
        &self,
        definitions: &[&SettingDefinition],
    ) -> anyhow::Result<IndexMap<String, SettingStateResult>>;
}

/// The resolved option list of a Selection setting plus the index matching
/// the current system state, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct ComboSelection {
    pub option_keys: Vec<&'static str>,
    pub selected_index: Option<i64>,
}

/// Resolves the *current* option index through the same option-list logic
/// that populates the UI. Raw stored values are never compared directly:
/// they go through state-signature and value mapping first.
pub trait ComboResolver {
    fn resolve(&self, definition: &SettingDefinition, state: &SettingStateResult)
        -> ComboSelection;
}

/// Default resolver driven entirely by the definition's option list.
#[derive(Debug, Default)]
pub struct DefinitionComboResolver;

impl ComboResolver for DefinitionComboResolver {
    fn resolve(
        &self,
        definition: &SettingDefinition,
        state: &SettingStateResult,
    ) -> ComboSelection {
        let Some(combo) = definition.combo.as_ref() else {
            return ComboSelection {
                option_keys: Vec::new(),
                selected_index: None,
            };
        };

        let option_keys: Vec<&'static str> =
            combo.options.iter().map(|option| option.display_key).collect();

        // State signatures are the most specific match: every value named by
        // the signature must be present and equal. First full match wins.
        for (index, option) in combo.options.iter().enumerate() {
            let Some(signature) = option.state_signature.as_ref() else {
                continue;
            };
            let matches = signature.iter().all(|(name, expected)| {
                state.raw.registry.get(*name) == Some(expected)
            });
            if matches {
                return ComboSelection {
                    option_keys,
                    selected_index: Some(index as i64),
                };
            }
        }

        // Otherwise map the stored value onto an option position.
        let selected_index = state
            .current_value
            .as_ref()
            .and_then(SettingValue::as_int)
            .and_then(|stored| {
                combo
                    .options
                    .iter()
                    .position(|option| option.value == stored)
            })
            .map(|position| position as i64);

        if selected_index.is_none() {
            tracing::debug!(
                "No option of '{}' matches the current system value",
                definition.id
            );
        }

        ComboSelection {
            option_keys,
            selected_index,
        }
    }
}
