// src/settings/catalog.rs

use indexmap::IndexMap;

use super::{
    ComboOption, InputType, PowerCfgMode, PowerCfgSpec, RegistryValueSpec, SettingDefinition,
    SettingValue,
};

// Processor power settings subgroup and the "maximum processor state" value.
const PROCESSOR_SUBGROUP_GUID: &str = "54533251-82be-4824-96c1-47b60b740d00";
const PROCESSOR_MAX_STATE_GUID: &str = "bc5038f7-23e0-4960-96da-33abaf5935ec";

/// All built-in setting definitions, Optimize features first.
pub fn all_settings() -> Vec<SettingDefinition> {
    vec![
        // Optimize / privacy
        disable_telemetry(),
        disable_advertising_id(),
        disable_activity_history(),
        // Optimize / power
        power_plan_selection(),
        processor_max_state(),
        disable_hibernation(),
        // Optimize / update
        updates_policy_mode(),
        defer_feature_updates(),
        // Optimize / gaming
        disable_game_bar(),
        auto_game_mode(),
        system_responsiveness(),
        // Customize / taskbar
        clean_taskbar(),
        taskbar_alignment(),
        taskbar_search_mode(),
        show_task_view_button(),
        // Customize / start-menu
        clean_start_menu_10(),
        clean_start_menu_11(),
        start_menu_recommendations(),
        // Customize / explorer
        show_file_extensions(),
        show_hidden_files(),
        explorer_launch_target(),
        // Customize / theme
        theme_wallpaper(),
        dark_mode(),
        accent_color_on_title_bars(),
    ]
}

pub fn disable_telemetry() -> SettingDefinition {
    SettingDefinition::new(
        "disable-telemetry",
        "privacy",
        "Disable diagnostic data collection",
        InputType::Toggle,
    )
    .with_registry_state(vec![RegistryValueSpec {
        path: r"HKEY_LOCAL_MACHINE\SOFTWARE\Policies\Microsoft\Windows\DataCollection",
        name: "AllowTelemetry",
        enabled_value: SettingValue::Int(0),
        default_value: None,
    }])
}

pub fn disable_advertising_id() -> SettingDefinition {
    SettingDefinition::new(
        "disable-advertising-id",
        "privacy",
        "Disable advertising ID",
        InputType::Toggle,
    )
    .with_registry_state(vec![RegistryValueSpec {
        path: r"HKEY_CURRENT_USER\SOFTWARE\Microsoft\Windows\CurrentVersion\AdvertisingInfo",
        name: "Enabled",
        enabled_value: SettingValue::Int(0),
        default_value: Some(SettingValue::Int(1)),
    }])
}

pub fn disable_activity_history() -> SettingDefinition {
    SettingDefinition::new(
        "disable-activity-history",
        "privacy",
        "Disable activity history",
        InputType::Toggle,
    )
    .with_registry_state(vec![RegistryValueSpec {
        path: r"HKEY_LOCAL_MACHINE\SOFTWARE\Policies\Microsoft\Windows\System",
        name: "PublishUserActivities",
        enabled_value: SettingValue::Int(0),
        default_value: None,
    }])
}

pub fn power_plan_selection() -> SettingDefinition {
    SettingDefinition::new(
        "power-plan-selection",
        "power",
        "Active power plan",
        InputType::Selection,
    )
    .with_combo(vec![
        ComboOption::new("power.plan.balanced", 0),
        ComboOption::new("power.plan.power-saver", 1),
        ComboOption::new("power.plan.high-performance", 2),
        ComboOption::new("power.plan.ultimate-performance", 3),
        ComboOption::new("power.plan.winhance", 4),
    ])
}

pub fn processor_max_state() -> SettingDefinition {
    SettingDefinition::new(
        "processor-max-state",
        "power",
        "Maximum processor state",
        InputType::NumericRange,
    )
    .with_powercfg(PowerCfgSpec {
        mode: PowerCfgMode::AcDc,
        unit: "%",
        min: 5,
        max: 100,
        subgroup_guid: PROCESSOR_SUBGROUP_GUID,
        setting_guid: PROCESSOR_MAX_STATE_GUID,
    })
}

pub fn disable_hibernation() -> SettingDefinition {
    SettingDefinition::new(
        "disable-hibernation",
        "power",
        "Disable hibernation",
        InputType::Toggle,
    )
    .with_registry_state(vec![RegistryValueSpec {
        path: r"HKEY_LOCAL_MACHINE\SYSTEM\CurrentControlSet\Control\Power",
        name: "HibernateEnabled",
        enabled_value: SettingValue::Int(0),
        default_value: Some(SettingValue::Int(1)),
    }])
}

/// Update behavior spans several registry values under the WindowsUpdate\AU
/// policy key, so each option carries a full state signature. More specific
/// signatures come first; resolution picks the first full match.
pub fn updates_policy_mode() -> SettingDefinition {
    SettingDefinition::new(
        "updates-policy-mode",
        "update",
        "Windows Update behavior",
        InputType::Selection,
    )
    .with_combo(vec![
        ComboOption::with_signature(
            "updates.mode.disabled",
            2,
            IndexMap::from([("NoAutoUpdate", SettingValue::Int(1))]),
        ),
        ComboOption::with_signature(
            "updates.mode.security-only",
            1,
            IndexMap::from([
                ("NoAutoUpdate", SettingValue::Int(0)),
                ("AUOptions", SettingValue::Int(2)),
            ]),
        ),
        ComboOption::with_signature(
            "updates.mode.default",
            0,
            IndexMap::from([("NoAutoUpdate", SettingValue::Int(0))]),
        ),
    ])
}

pub fn defer_feature_updates() -> SettingDefinition {
    SettingDefinition::new(
        "defer-feature-updates",
        "update",
        "Defer feature updates",
        InputType::Toggle,
    )
    .with_registry_state(vec![RegistryValueSpec {
        path: r"HKEY_LOCAL_MACHINE\SOFTWARE\Policies\Microsoft\Windows\WindowsUpdate",
        name: "DeferFeatureUpdates",
        enabled_value: SettingValue::Int(1),
        default_value: None,
    }])
}

pub fn disable_game_bar() -> SettingDefinition {
    SettingDefinition::new(
        "disable-game-bar",
        "gaming",
        "Disable Game Bar capture",
        InputType::Toggle,
    )
    .with_registry_state(vec![RegistryValueSpec {
        path: r"HKEY_CURRENT_USER\SOFTWARE\Microsoft\Windows\CurrentVersion\GameDVR",
        name: "AppCaptureEnabled",
        enabled_value: SettingValue::Int(0),
        default_value: Some(SettingValue::Int(1)),
    }])
}

pub fn auto_game_mode() -> SettingDefinition {
    SettingDefinition::new(
        "auto-game-mode",
        "gaming",
        "Automatic Game Mode",
        InputType::Toggle,
    )
    .with_registry_state(vec![RegistryValueSpec {
        path: r"HKEY_CURRENT_USER\SOFTWARE\Microsoft\GameBar",
        name: "AutoGameModeEnabled",
        enabled_value: SettingValue::Int(1),
        default_value: Some(SettingValue::Int(0)),
    }])
}

pub fn system_responsiveness() -> SettingDefinition {
    SettingDefinition::new(
        "system-responsiveness",
        "gaming",
        "Prioritize foreground applications",
        InputType::Toggle,
    )
    .with_registry_state(vec![RegistryValueSpec {
        path: r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Windows NT\CurrentVersion\Multimedia\SystemProfile",
        name: "SystemResponsiveness",
        enabled_value: SettingValue::Int(0),
        default_value: Some(SettingValue::Int(20)),
    }])
}

/// One-shot action: resets the taskbar layout. Always re-confirmed during
/// review regardless of system state.
pub fn clean_taskbar() -> SettingDefinition {
    SettingDefinition::new(
        "clean-taskbar",
        "taskbar",
        "Clean taskbar layout",
        InputType::Toggle,
    )
}

pub fn taskbar_alignment() -> SettingDefinition {
    SettingDefinition::new(
        "taskbar-alignment",
        "taskbar",
        "Taskbar alignment",
        InputType::Selection,
    )
    .windows_11_only()
    .with_combo(vec![
        ComboOption::new("taskbar.alignment.left", 0),
        ComboOption::new("taskbar.alignment.center", 1),
    ])
    .with_registry_state(vec![RegistryValueSpec {
        path: r"HKEY_CURRENT_USER\SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\Advanced",
        name: "TaskbarAl",
        enabled_value: SettingValue::Int(0),
        default_value: Some(SettingValue::Int(1)),
    }])
}

pub fn taskbar_search_mode() -> SettingDefinition {
    SettingDefinition::new(
        "taskbar-search-mode",
        "taskbar",
        "Taskbar search appearance",
        InputType::Selection,
    )
    .with_combo(vec![
        ComboOption::new("taskbar.search.hidden", 0),
        ComboOption::new("taskbar.search.icon", 1),
        ComboOption::new("taskbar.search.box", 2),
    ])
    .with_registry_state(vec![RegistryValueSpec {
        path: r"HKEY_CURRENT_USER\SOFTWARE\Microsoft\Windows\CurrentVersion\Search",
        name: "SearchboxTaskbarMode",
        enabled_value: SettingValue::Int(0),
        default_value: Some(SettingValue::Int(2)),
    }])
}

pub fn show_task_view_button() -> SettingDefinition {
    SettingDefinition::new(
        "show-task-view",
        "taskbar",
        "Show Task View button",
        InputType::CheckBox,
    )
    .with_registry_state(vec![RegistryValueSpec {
        path: r"HKEY_CURRENT_USER\SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\Advanced",
        name: "ShowTaskViewButton",
        enabled_value: SettingValue::Int(1),
        default_value: Some(SettingValue::Int(1)),
    }])
}

/// One-shot action, Windows 10 Start Menu layout variant.
pub fn clean_start_menu_10() -> SettingDefinition {
    SettingDefinition::new(
        "clean-start-menu-10",
        "start-menu",
        "Clean Start Menu layout",
        InputType::Toggle,
    )
    .windows_10_only()
}

/// One-shot action, Windows 11 Start Menu layout variant.
pub fn clean_start_menu_11() -> SettingDefinition {
    SettingDefinition::new(
        "clean-start-menu-11",
        "start-menu",
        "Clean Start Menu layout",
        InputType::Toggle,
    )
    .windows_11_only()
}

pub fn start_menu_recommendations() -> SettingDefinition {
    SettingDefinition::new(
        "start-menu-recommendations",
        "start-menu",
        "Disable Start Menu recommendations",
        InputType::Toggle,
    )
    .windows_11_only()
    .minimum_build(22621)
    .with_registry_state(vec![RegistryValueSpec {
        path: r"HKEY_CURRENT_USER\SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\Advanced",
        name: "Start_IrisRecommendations",
        enabled_value: SettingValue::Int(0),
        default_value: Some(SettingValue::Int(1)),
    }])
}

pub fn show_file_extensions() -> SettingDefinition {
    SettingDefinition::new(
        "show-file-extensions",
        "explorer",
        "Show file name extensions",
        InputType::CheckBox,
    )
    .with_registry_state(vec![RegistryValueSpec {
        path: r"HKEY_CURRENT_USER\SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\Advanced",
        name: "HideFileExt",
        enabled_value: SettingValue::Int(0),
        default_value: Some(SettingValue::Int(1)),
    }])
}

pub fn show_hidden_files() -> SettingDefinition {
    SettingDefinition::new(
        "show-hidden-files",
        "explorer",
        "Show hidden files",
        InputType::CheckBox,
    )
    .with_registry_state(vec![RegistryValueSpec {
        path: r"HKEY_CURRENT_USER\SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\Advanced",
        name: "Hidden",
        enabled_value: SettingValue::Int(1),
        default_value: Some(SettingValue::Int(2)),
    }])
}

pub fn explorer_launch_target() -> SettingDefinition {
    SettingDefinition::new(
        "launch-to-this-pc",
        "explorer",
        "Open File Explorer to",
        InputType::Selection,
    )
    .with_combo(vec![
        ComboOption::new("explorer.launch-to.quick-access", 2),
        ComboOption::new("explorer.launch-to.this-pc", 1),
    ])
    .with_registry_state(vec![RegistryValueSpec {
        path: r"HKEY_CURRENT_USER\SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\Advanced",
        name: "LaunchTo",
        enabled_value: SettingValue::Int(1),
        default_value: Some(SettingValue::Int(2)),
    }])
}

/// One-shot action: applies the configured wallpaper and theme colors.
pub fn theme_wallpaper() -> SettingDefinition {
    SettingDefinition::new(
        "theme-wallpaper",
        "theme",
        "Apply wallpaper and colors",
        InputType::Toggle,
    )
}

pub fn dark_mode() -> SettingDefinition {
    SettingDefinition::new("dark-mode", "theme", "Dark mode", InputType::Toggle)
        .with_registry_state(vec![RegistryValueSpec {
            path: r"HKEY_CURRENT_USER\SOFTWARE\Microsoft\Windows\CurrentVersion\Themes\Personalize",
            name: "AppsUseLightTheme",
            enabled_value: SettingValue::Int(0),
            default_value: Some(SettingValue::Int(1)),
        }])
}

pub fn accent_color_on_title_bars() -> SettingDefinition {
    SettingDefinition::new(
        "accent-color-on-title-bars",
        "theme",
        "Accent color on title bars",
        InputType::CheckBox,
    )
    .with_registry_state(vec![RegistryValueSpec {
        path: r"HKEY_CURRENT_USER\SOFTWARE\Microsoft\Windows\DWM",
        name: "ColorPrevalence",
        enabled_value: SettingValue::Int(1),
        default_value: Some(SettingValue::Int(0)),
    }])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        let settings = all_settings();
        let mut ids: Vec<&str> = settings.iter().map(|s| s.id).collect();
        ids.sort_unstable();
        let before = ids.len();
        ids.dedup();
        assert_eq!(before, ids.len());
    }

    #[test]
    fn start_menu_variants_are_mutually_exclusive() {
        let ten = clean_start_menu_10();
        let eleven = clean_start_menu_11();
        assert!(ten.compat.windows_10_only);
        assert!(eleven.compat.windows_11_only);
    }

    #[test]
    fn selection_settings_carry_options() {
        for setting in all_settings() {
            if setting.input_type == InputType::Selection {
                let combo = setting.combo.as_ref().expect("selection without options");
                assert!(!combo.options.is_empty(), "{} has no options", setting.id);
            }
        }
    }
}
