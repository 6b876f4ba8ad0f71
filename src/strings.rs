// src/strings.rs

use indexmap::IndexMap;
use once_cell::sync::Lazy;

/// Raw display keys carried by diffs alongside their resolved strings, so a
/// UI can re-render after a language change without recomputing system state.
pub const KEY_ON: &str = "common.on";
pub const KEY_OFF: &str = "common.off";
pub const KEY_UNKNOWN: &str = "common.unknown";
pub const KEY_BADGE_REVIEWED: &str = "badge.reviewed";

static STRINGS: Lazy<IndexMap<&'static str, &'static str>> = Lazy::new(|| {
    IndexMap::from([
        (KEY_ON, "On"),
        (KEY_OFF, "Off"),
        (KEY_UNKNOWN, "Unknown"),
        (KEY_BADGE_REVIEWED, "Reviewed"),
        // Action setting confirmation prompts
        (
            "review.action.theme-wallpaper",
            "Apply the wallpaper and theme colors from this configuration?",
        ),
        (
            "review.action.clean-taskbar",
            "Remove pinned shortcuts and reset the taskbar layout?",
        ),
        (
            "review.action.clean-start-menu",
            "Remove pinned tiles and reset the Start Menu layout?",
        ),
        // Power plan names
        ("power.plan.balanced", "Balanced"),
        ("power.plan.power-saver", "Power saver"),
        ("power.plan.high-performance", "High performance"),
        ("power.plan.ultimate-performance", "Ultimate Performance"),
        ("power.plan.winhance", "Winhance Power Plan"),
        // Update policy modes
        ("updates.mode.default", "Default (recommended)"),
        ("updates.mode.security-only", "Security updates only"),
        ("updates.mode.disabled", "Updates disabled"),
        // Taskbar
        ("taskbar.alignment.left", "Left"),
        ("taskbar.alignment.center", "Center"),
        ("taskbar.search.hidden", "Hidden"),
        ("taskbar.search.icon", "Icon only"),
        ("taskbar.search.box", "Search box"),
        // Explorer
        ("explorer.launch-to.quick-access", "Quick access"),
        ("explorer.launch-to.this-pc", "This PC"),
    ])
});

/// Resolves a display key to its localized text. Unknown keys resolve to
/// themselves so a missing table entry degrades visibly instead of panicking.
pub fn localize(key: &str) -> &str {
    STRINGS.get(key).copied().unwrap_or(key)
}
