// src/platform/discovery.rs

use anyhow::{Context, Result};
use indexmap::IndexMap;
use tracing::debug;
use winreg::{
    enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ},
    RegKey,
};

use super::power as power_api;
use crate::{
    discovery::{RawStateValues, SettingStateResult, SystemSettingsDiscovery},
    power::POWER_PLAN_SETTING_ID,
    settings::{PowerCfgMode, PowerCfgSpec, SettingDefinition, SettingValue},
};

/// Live system state reader: registry values per definition, the active
/// power scheme for the plan setting, powercfg value indices for numeric
/// settings. One batch call covers a whole review session.
#[derive(Debug, Default)]
pub struct RegistryDiscovery;

impl SystemSettingsDiscovery for RegistryDiscovery {
    fn read_states(
        &self,
        definitions: &[&SettingDefinition],
    ) -> Result<IndexMap<String, SettingStateResult>> {
        let mut states = IndexMap::with_capacity(definitions.len());
        for definition in definitions {
            let state = match read_one(definition) {
                Ok(state) => state,
                Err(e) => {
                    // A single unreadable setting never fails the batch.
                    debug!("Failed to read state for '{}': {:?}", definition.id, e);
                    SettingStateResult::failed(definition.id, e.to_string())
                }
            };
            states.insert(definition.id.to_string(), state);
        }
        Ok(states)
    }
}

fn read_one(definition: &SettingDefinition) -> Result<SettingStateResult> {
    if definition.id == POWER_PLAN_SETTING_ID {
        return read_power_plan(definition);
    }
    if let Some(spec) = &definition.powercfg {
        return read_powercfg(definition, spec);
    }
    read_registry_state(definition)
}

fn read_power_plan(definition: &SettingDefinition) -> Result<SettingStateResult> {
    let plan = power_api::active_power_plan()?;
    let raw = RawStateValues {
        active_plan_guid: Some(plan.guid),
        active_plan_name: Some(plan.name),
        ..Default::default()
    };
    Ok(SettingStateResult::ok(definition.id)
        .enabled(true)
        .raw_values(raw))
}

fn read_powercfg(
    definition: &SettingDefinition,
    spec: &PowerCfgSpec,
) -> Result<SettingStateResult> {
    let plan = power_api::active_power_plan()?;
    let ac_value =
        power_api::read_ac_value_index(&plan.guid, spec.subgroup_guid, spec.setting_guid)?;
    let dc_value = if spec.mode == PowerCfgMode::AcDc {
        power_api::read_dc_value_index(&plan.guid, spec.subgroup_guid, spec.setting_guid).ok()
    } else {
        None
    };

    let raw = RawStateValues {
        ac_value: Some(ac_value),
        dc_value,
        ..Default::default()
    };
    Ok(SettingStateResult::ok(definition.id)
        .value(SettingValue::Int(ac_value as i64))
        .raw_values(raw))
}

/// A setting is enabled iff every declared registry value currently equals
/// its enabled value; an absent value counts as not enabled. Effective
/// values (falling back to the declared default when absent) are collected
/// for signature matching.
fn read_registry_state(definition: &SettingDefinition) -> Result<SettingStateResult> {
    let mut raw = RawStateValues::default();
    let mut all_match = !definition.registry_state.is_empty();
    let mut current: Option<SettingValue> = None;

    for spec in &definition.registry_state {
        let value = read_registry_value(spec.path, spec.name)
            .with_context(|| format!("Failed to read '{}' from '{}'", spec.name, spec.path))?;

        if value.as_ref() != Some(&spec.enabled_value) {
            all_match = false;
        }

        if let Some(effective) = value.or_else(|| spec.default_value.clone()) {
            if current.is_none() {
                current = Some(effective.clone());
            }
            raw.registry.insert(spec.name.to_string(), effective);
        }
    }

    let mut state = SettingStateResult::ok(definition.id)
        .enabled(all_match)
        .raw_values(raw);
    state.current_value = current;
    Ok(state)
}

fn read_registry_value(path: &str, name: &str) -> Result<Option<SettingValue>> {
    let (hive, subkey_path) = parse_registry_path(path)?;
    let hkey = hive_key(hive)?;
    let key = match hkey.open_subkey_with_flags(subkey_path, KEY_READ) {
        Ok(key) => key,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(anyhow::Error::from(e))
                .with_context(|| format!("Failed to open subkey '{}'", subkey_path))
        }
    };

    match key.get_value::<u32, &str>(name) {
        Ok(value) => Ok(Some(SettingValue::Int(value as i64))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            // Not a DWORD; fall back to a string read before giving up.
            match key.get_value::<String, &str>(name) {
                Ok(value) => Ok(Some(SettingValue::Text(value))),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(anyhow::Error::from(e))
                    .with_context(|| format!("Failed to read value '{}' as string", name)),
            }
        }
        Err(e) => Err(anyhow::Error::from(e))
            .with_context(|| format!("Failed to read value '{}' as DWORD", name)),
    }
}

fn parse_registry_path(path: &str) -> Result<(&str, &str)> {
    match path.split_once('\\') {
        Some((hive, subkey)) if !subkey.is_empty() => Ok((hive, subkey)),
        _ => anyhow::bail!("Invalid registry path: {}", path),
    }
}

fn hive_key(hive: &str) -> Result<RegKey> {
    match hive {
        "HKEY_LOCAL_MACHINE" => Ok(RegKey::predef(HKEY_LOCAL_MACHINE)),
        "HKEY_CURRENT_USER" => Ok(RegKey::predef(HKEY_CURRENT_USER)),
        other => anyhow::bail!("Unsupported registry hive '{}'", other),
    }
}
