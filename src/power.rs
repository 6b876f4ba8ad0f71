// src/power.rs

use once_cell::sync::Lazy;

/// Id of the setting whose configured value is a power plan.
pub const POWER_PLAN_SETTING_ID: &str = "power-plan-selection";

/// Well-known power scheme GUIDs.
pub const BALANCED_PLAN_GUID: &str = "381b4222-f694-41f0-9685-ff5bb260df2e";
pub const POWER_SAVER_PLAN_GUID: &str = "a1841308-3541-4fab-bc81-f71556f20b4a";
pub const HIGH_PERFORMANCE_PLAN_GUID: &str = "8c5e7fda-e8bf-4a96-9a85-a6e23a8c635c";
pub const ULTIMATE_PERFORMANCE_PLAN_GUID: &str = "e9a42b02-d5df-448d-aa00-03f14749eb61";

/// Marker carried in the friendly name of the app's custom plan. The plan is
/// recreated with a fresh GUID across runs, so identity falls back to this
/// name fragment when GUIDs disagree.
pub const WINHANCE_PLAN_MARKER: &str = "Winhance";

/// A power plan as seen by discovery: active-scheme GUID plus friendly name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerPlanInfo {
    pub guid: String,
    pub name: String,
}

/// One entry of the predefined plan table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredefinedPlan {
    pub key: &'static str,
    pub guid: &'static str,
    pub display_key: &'static str,
}

pub static PREDEFINED_PLANS: Lazy<Vec<PredefinedPlan>> = Lazy::new(|| {
    vec![
        PredefinedPlan {
            key: "balanced",
            guid: BALANCED_PLAN_GUID,
            display_key: "power.plan.balanced",
        },
        PredefinedPlan {
            key: "power-saver",
            guid: POWER_SAVER_PLAN_GUID,
            display_key: "power.plan.power-saver",
        },
        PredefinedPlan {
            key: "high-performance",
            guid: HIGH_PERFORMANCE_PLAN_GUID,
            display_key: "power.plan.high-performance",
        },
        PredefinedPlan {
            key: "ultimate-performance",
            guid: ULTIMATE_PERFORMANCE_PLAN_GUID,
            display_key: "power.plan.ultimate-performance",
        },
        PredefinedPlan {
            key: "winhance",
            // No stable GUID: the custom plan is matched by name marker.
            guid: "",
            display_key: "power.plan.winhance",
        },
    ]
});

/// Canonical form of a power scheme GUID: hex digits only, lowercase.
/// `{3C0BC021-C8A8-4E07-A973-6B14CBCB2B7E}` and
/// `3c0bc021c8a84e07a9736b14cbcb2b7e` normalize to the same string.
pub fn normalize_plan_guid(guid: &str) -> String {
    guid.chars()
        .filter(char::is_ascii_hexdigit)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Whether two normalized GUIDs denote the same scheme.
pub fn guids_equal(a: &str, b: &str) -> bool {
    let a = normalize_plan_guid(a);
    !a.is_empty() && a == normalize_plan_guid(b)
}

/// Maps a (guid, name) pair onto the predefined plan table: by GUID first,
/// then by the friendly name carrying the app's plan marker.
pub fn resolve_predefined(guid: Option<&str>, name: Option<&str>) -> Option<&'static PredefinedPlan> {
    if let Some(guid) = guid {
        let normalized = normalize_plan_guid(guid);
        if !normalized.is_empty() {
            if let Some(plan) = PREDEFINED_PLANS
                .iter()
                .find(|plan| !plan.guid.is_empty() && normalize_plan_guid(plan.guid) == normalized)
            {
                return Some(plan);
            }
        }
    }
    if let Some(name) = name {
        if name.contains(WINHANCE_PLAN_MARKER) {
            return PREDEFINED_PLANS.iter().find(|plan| plan.key == "winhance");
        }
    }
    None
}

/// Whether two plans should be treated as the same setting value: equal
/// normalized GUIDs, or both sides resolving to the same predefined plan.
pub fn plans_equivalent(
    a_guid: Option<&str>,
    a_name: Option<&str>,
    b_guid: Option<&str>,
    b_name: Option<&str>,
) -> bool {
    if let (Some(a), Some(b)) = (a_guid, b_guid) {
        if guids_equal(a, b) {
            return true;
        }
    }
    match (resolve_predefined(a_guid, a_name), resolve_predefined(b_guid, b_name)) {
        (Some(a), Some(b)) => a.key == b.key,
        _ => false,
    }
}
