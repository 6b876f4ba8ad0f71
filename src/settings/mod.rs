// src/settings/mod.rs

pub mod catalog;
pub mod registry;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::version::WindowsVersion;

/// How a setting is presented and therefore how its configured value is
/// compared against live system state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum InputType {
    Toggle,
    Selection,
    NumericRange,
    CheckBox,
}

/// A concrete setting value, tagged instead of boxed: the input type of the
/// owning definition decides which variant is meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl SettingValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(v) => Some(*v),
            SettingValue::Bool(v) => Some(*v as i64),
            SettingValue::Text(_) => None,
        }
    }
}

/// Inclusive build range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildRange {
    pub min: u32,
    pub max: u32,
}

impl BuildRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, build: u32) -> bool {
        build >= self.min && build <= self.max
    }
}

/// OS compatibility predicates for one setting.
#[derive(Debug, Clone, Default)]
pub struct Compatibility {
    pub windows_10_only: bool,
    pub windows_11_only: bool,
    pub minimum_build: Option<u32>,
    pub maximum_build: Option<u32>,
    pub supported_build_ranges: Vec<BuildRange>,
}

impl Compatibility {
    /// Whether the running version satisfies every predicate.
    pub fn supports(&self, version: &WindowsVersion) -> bool {
        if self.windows_10_only && version.is_windows_11() {
            return false;
        }
        if self.windows_11_only && version.is_windows_10() {
            return false;
        }
        if let Some(min) = self.minimum_build {
            if version.build < min {
                return false;
            }
        }
        if let Some(max) = self.maximum_build {
            if version.build > max {
                return false;
            }
        }
        if !self.supported_build_ranges.is_empty()
            && !self
                .supported_build_ranges
                .iter()
                .any(|range| range.contains(version.build))
        {
            return false;
        }
        true
    }
}

/// One selectable option of a Selection setting. `state_signature` carries
/// the raw multi-registry-value combination that identifies this option when
/// the stored value alone cannot (e.g. update policy modes spanning several
/// registry values).
#[derive(Debug, Clone)]
pub struct ComboOption {
    pub display_key: &'static str,
    pub value: i64,
    pub state_signature: Option<IndexMap<&'static str, SettingValue>>,
}

impl ComboOption {
    pub fn new(display_key: &'static str, value: i64) -> Self {
        Self {
            display_key,
            value,
            state_signature: None,
        }
    }

    pub fn with_signature(
        display_key: &'static str,
        value: i64,
        signature: IndexMap<&'static str, SettingValue>,
    ) -> Self {
        Self {
            display_key,
            value,
            state_signature: Some(signature),
        }
    }
}

/// Ordered option list for a Selection setting.
#[derive(Debug, Clone)]
pub struct ComboSpec {
    pub options: Vec<ComboOption>,
}

/// Whether a powercfg-backed setting carries an AC value only or both AC and
/// DC variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerCfgMode {
    AcOnly,
    AcDc,
}

/// Typed metadata for NumericRange settings backed by powercfg value
/// indices.
#[derive(Debug, Clone)]
pub struct PowerCfgSpec {
    pub mode: PowerCfgMode,
    pub unit: &'static str,
    pub min: u32,
    pub max: u32,
    pub subgroup_guid: &'static str,
    pub setting_guid: &'static str,
}

/// One registry value the Windows discovery backend reads to decide whether
/// a setting is enabled. If `default_value` is `None`, the setting is
/// considered enabled when the value exists at all.
#[derive(Debug, Clone)]
pub struct RegistryValueSpec {
    pub path: &'static str,
    pub name: &'static str,
    pub enabled_value: SettingValue,
    pub default_value: Option<SettingValue>,
}

/// Immutable descriptor of one setting. Constructed once at registry load
/// and never mutated by the review engine.
#[derive(Debug, Clone)]
pub struct SettingDefinition {
    pub id: &'static str,
    pub feature_id: &'static str,
    pub name: &'static str,
    pub input_type: InputType,
    pub compat: Compatibility,
    pub combo: Option<ComboSpec>,
    pub powercfg: Option<PowerCfgSpec>,
    pub registry_state: Vec<RegistryValueSpec>,
}

impl SettingDefinition {
    pub fn new(
        id: &'static str,
        feature_id: &'static str,
        name: &'static str,
        input_type: InputType,
    ) -> Self {
        Self {
            id,
            feature_id,
            name,
            input_type,
            compat: Compatibility::default(),
            combo: None,
            powercfg: None,
            registry_state: Vec::new(),
        }
    }

    pub fn windows_10_only(mut self) -> Self {
        self.compat.windows_10_only = true;
        self
    }

    pub fn windows_11_only(mut self) -> Self {
        self.compat.windows_11_only = true;
        self
    }

    pub fn minimum_build(mut self, build: u32) -> Self {
        self.compat.minimum_build = Some(build);
        self
    }

    pub fn maximum_build(mut self, build: u32) -> Self {
        self.compat.maximum_build = Some(build);
        self
    }

    pub fn supported_builds(mut self, ranges: Vec<BuildRange>) -> Self {
        self.compat.supported_build_ranges = ranges;
        self
    }

    pub fn with_combo(mut self, options: Vec<ComboOption>) -> Self {
        self.combo = Some(ComboSpec { options });
        self
    }

    pub fn with_powercfg(mut self, spec: PowerCfgSpec) -> Self {
        self.powercfg = Some(spec);
        self
    }

    pub fn with_registry_state(mut self, specs: Vec<RegistryValueSpec>) -> Self {
        self.registry_state = specs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_10_only_rejects_11() {
        let compat = Compatibility {
            windows_10_only: true,
            ..Default::default()
        };
        assert!(compat.supports(&WindowsVersion::new(19045)));
        assert!(!compat.supports(&WindowsVersion::new(22631)));
    }

    #[test]
    fn windows_11_only_rejects_10() {
        let compat = Compatibility {
            windows_11_only: true,
            ..Default::default()
        };
        assert!(!compat.supports(&WindowsVersion::new(19045)));
        assert!(compat.supports(&WindowsVersion::new(22631)));
    }

    #[test]
    fn build_bounds_are_inclusive() {
        let compat = Compatibility {
            minimum_build: Some(19041),
            maximum_build: Some(22000),
            ..Default::default()
        };
        assert!(!compat.supports(&WindowsVersion::new(19040)));
        assert!(compat.supports(&WindowsVersion::new(19041)));
        assert!(compat.supports(&WindowsVersion::new(22000)));
        assert!(!compat.supports(&WindowsVersion::new(22001)));
    }

    #[test]
    fn supported_ranges_require_membership() {
        let compat = Compatibility {
            supported_build_ranges: vec![
                BuildRange::new(19041, 19045),
                BuildRange::new(22621, 22631),
            ],
            ..Default::default()
        };
        assert!(compat.supports(&WindowsVersion::new(19044)));
        assert!(compat.supports(&WindowsVersion::new(22621)));
        assert!(!compat.supports(&WindowsVersion::new(22000)));
    }

    #[test]
    fn setting_value_int_coercion() {
        assert_eq!(SettingValue::Int(3).as_int(), Some(3));
        assert_eq!(SettingValue::Bool(true).as_int(), Some(1));
        assert_eq!(SettingValue::Text("x".into()).as_int(), None);
    }
}
