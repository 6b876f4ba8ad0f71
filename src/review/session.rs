// src/review/session.rs

use crossbeam::channel::Receiver;
use indexmap::{IndexMap, IndexSet};
use strum_macros::{Display, EnumIter};
use tracing::debug;

use super::{
    diff::{ConfigReviewDiff, DiffEngine},
    events::{EventBus, ReviewEvent},
};
use crate::{
    compat::filter_config_for_current_system,
    config::UnifiedConfigurationFile,
    discovery::{ComboResolver, SystemSettingsDiscovery},
    settings::registry::SettingRegistry,
    strings::KEY_BADGE_REVIEWED,
    version::WindowsVersion,
};

/// Top-level navigation sections a badge is computed for. SoftwareApps
/// covers both app sections of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum TopLevelSection {
    SoftwareApps,
    Optimize,
    Customize,
}

/// Badge state for one top-level section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    /// Section not present in the loaded configuration: show nothing.
    NotPresent,
    /// Count of diffs still awaiting review.
    Pending(usize),
    /// Everything reviewed: show the checkmark.
    Complete,
}

impl Badge {
    /// Legacy numeric form: pending count, or `-1` as the checkmark
    /// sentinel.
    pub fn value(&self) -> Option<i64> {
        match self {
            Badge::NotPresent => None,
            Badge::Pending(count) => Some(*count as i64),
            Badge::Complete => Some(-1),
        }
    }

    pub fn icon_key(&self) -> Option<&'static str> {
        match self {
            Badge::Complete => Some(KEY_BADGE_REVIEWED),
            _ => None,
        }
    }
}

/// The interactive review session: owns the computed diffs, per-diff
/// approval status, per-feature visited tracking and badge counters.
///
/// Exactly one session is active at a time; it is an explicitly-owned
/// object with a single writer, not ambient global state. All mutation goes
/// through `&mut self`, so concurrent approval races cannot occur by
/// construction; background work observes changes by draining
/// [`events`](Self::events).
///
/// Lifecycle: `Inactive` → [`enter_review_mode`](Self::enter_review_mode) →
/// `Active` → [`exit_review_mode`](Self::exit_review_mode) → `Inactive`.
/// Entry is atomic from the caller's perspective: diffs for every feature
/// are fully computed before the session reports active.
pub struct ReviewSession {
    active: bool,
    diffs: IndexMap<String, ConfigReviewDiff>,
    config_item_counts: IndexMap<String, usize>,
    features_in_config: IndexSet<String>,
    visited_features: IndexSet<String>,
    optimize_features: IndexSet<String>,
    customize_features: IndexSet<String>,
    software_apps_present: bool,
    filtered_config: Option<UnifiedConfigurationFile>,
    events: EventBus,
}

impl Default for ReviewSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewSession {
    pub fn new() -> Self {
        Self {
            active: false,
            diffs: IndexMap::new(),
            config_item_counts: IndexMap::new(),
            features_in_config: IndexSet::new(),
            visited_features: IndexSet::new(),
            optimize_features: IndexSet::new(),
            customize_features: IndexSet::new(),
            software_apps_present: false,
            filtered_config: None,
            events: EventBus::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Channel of change notifications for the embedding UI.
    pub fn events(&self) -> &Receiver<ReviewEvent> {
        self.events.receiver()
    }

    /// Enters review mode: filters the configuration for the running build,
    /// snapshots system state in one batch read, computes every feature's
    /// diffs eagerly, and auto-marks zero-diff features as visited.
    ///
    /// Any state left from a previous session is cleared first, so stale
    /// diffs never leak across sessions. The original document is not
    /// mutated; the session keeps its own filtered copy.
    pub fn enter_review_mode(
        &mut self,
        config: &UnifiedConfigurationFile,
        registry: &SettingRegistry,
        discovery: &dyn SystemSettingsDiscovery,
        combo: &dyn ComboResolver,
        version: WindowsVersion,
    ) -> anyhow::Result<()> {
        self.clear_session_state();

        let filtered = filter_config_for_current_system(config, registry, &version);

        for (feature, section) in filtered.feature_sections() {
            self.config_item_counts
                .insert(feature.to_string(), section.items.len());
            self.features_in_config.insert(feature.to_string());
        }
        self.optimize_features = filtered
            .optimize
            .features
            .keys()
            .cloned()
            .collect();
        self.customize_features = filtered
            .customize
            .features
            .keys()
            .cloned()
            .collect();
        self.software_apps_present =
            !filtered.windows_apps.is_empty() || !filtered.external_apps.is_empty();

        let definitions = registry.definitions_for_config(&filtered);
        let states = discovery.read_states(&definitions)?;

        let engine = DiffEngine::new(registry, combo, version);
        for (feature, section) in filtered.feature_sections() {
            for diff in engine.compute_feature_diffs(feature, &section.items, &states) {
                self.diffs.insert(diff.setting_id.clone(), diff);
            }
        }

        // Nothing to decide for a feature without diffs.
        let auto_visited: Vec<String> = self
            .features_in_config
            .iter()
            .filter(|feature| self.feature_diff_count(feature) == 0)
            .cloned()
            .collect();
        self.visited_features.extend(auto_visited);

        self.filtered_config = Some(filtered);
        self.active = true;
        debug!(
            "Entered review mode: {} diffs across {} features",
            self.diffs.len(),
            self.features_in_config.len()
        );

        self.events.emit(ReviewEvent::ReviewModeChanged);
        self.events.emit(ReviewEvent::BadgeStateChanged);
        Ok(())
    }

    /// Leaves review mode and destroys all per-session state.
    pub fn exit_review_mode(&mut self) {
        if !self.active && self.diffs.is_empty() {
            return;
        }
        self.clear_session_state();
        self.events.emit(ReviewEvent::ReviewModeChanged);
        self.events.emit(ReviewEvent::BadgeStateChanged);
    }

    fn clear_session_state(&mut self) {
        self.active = false;
        self.diffs.clear();
        self.config_item_counts.clear();
        self.features_in_config.clear();
        self.visited_features.clear();
        self.optimize_features.clear();
        self.customize_features.clear();
        self.software_apps_present = false;
        self.filtered_config = None;
    }

    /// Records the user's decision for one diff. Idempotent and
    /// re-settable: the user can change their mind until apply. The stored
    /// diff is replaced by a new value, never mutated in place.
    pub fn set_setting_approval(&mut self, setting_id: &str, approved: bool) -> bool {
        let Some(diff) = self.diffs.get(setting_id) else {
            debug!("Approval for unknown setting '{}' ignored", setting_id);
            return false;
        };
        let updated = diff.clone().with_approval(approved);
        self.diffs.insert(setting_id.to_string(), updated);
        self.events.emit(ReviewEvent::ApprovalCountChanged);
        self.events.emit(ReviewEvent::BadgeStateChanged);
        true
    }

    pub fn diff(&self, setting_id: &str) -> Option<&ConfigReviewDiff> {
        self.diffs.get(setting_id)
    }

    pub fn diffs(&self) -> impl Iterator<Item = &ConfigReviewDiff> {
        self.diffs.values()
    }

    pub fn diff_count(&self) -> usize {
        self.diffs.len()
    }

    pub fn approved_diffs(&self) -> Vec<&ConfigReviewDiff> {
        self.diffs.values().filter(|diff| diff.is_approved).collect()
    }

    pub fn approved_ids(&self) -> IndexSet<String> {
        self.diffs
            .values()
            .filter(|diff| diff.is_approved)
            .map(|diff| diff.setting_id.clone())
            .collect()
    }

    pub fn unreviewed_count(&self) -> usize {
        self.diffs.values().filter(|diff| !diff.is_reviewed).count()
    }

    /// The session's compatibility-filtered copy of the loaded document.
    pub fn filtered_config(&self) -> Option<&UnifiedConfigurationFile> {
        self.filtered_config.as_ref()
    }

    /// Raw configured item count for a feature, independent of whether any
    /// diff exists. Drives "N items to review" labels.
    pub fn feature_item_count(&self, feature_id: &str) -> usize {
        self.config_item_counts.get(feature_id).copied().unwrap_or(0)
    }

    pub fn feature_diff_count(&self, feature_id: &str) -> usize {
        self.diffs
            .values()
            .filter(|diff| diff.feature_id == feature_id)
            .count()
    }

    fn feature_unreviewed_count(&self, feature_id: &str) -> usize {
        self.diffs
            .values()
            .filter(|diff| diff.feature_id == feature_id && !diff.is_reviewed)
            .count()
    }

    /// Marks a feature as visited by the user. Navigation calls this when a
    /// feature's page is opened.
    pub fn mark_feature_visited(&mut self, feature_id: &str) {
        if self.visited_features.insert(feature_id.to_string()) {
            self.events.emit(ReviewEvent::BadgeStateChanged);
        }
    }

    pub fn is_feature_visited(&self, feature_id: &str) -> bool {
        self.visited_features.contains(feature_id)
    }

    /// A feature is fully reviewed iff it is in the config with zero diffs,
    /// or it has been visited and every one of its diffs is reviewed
    /// (approved or rejected alike).
    pub fn is_feature_fully_reviewed(&self, feature_id: &str) -> bool {
        let diff_count = self.feature_diff_count(feature_id);
        if diff_count == 0 && self.features_in_config.contains(feature_id) {
            return true;
        }
        self.visited_features.contains(feature_id)
            && self.feature_unreviewed_count(feature_id) == 0
    }

    /// Badge for one top-level navigation section: unreviewed diff count,
    /// the checkmark once every constituent feature is fully reviewed, or
    /// nothing when the section is absent from the config.
    pub fn section_badge(&self, section: TopLevelSection) -> Badge {
        let features = match section {
            TopLevelSection::SoftwareApps => {
                // App sections carry no diffs; present means reviewed.
                return if self.active && self.software_apps_present {
                    Badge::Complete
                } else {
                    Badge::NotPresent
                };
            }
            TopLevelSection::Optimize => &self.optimize_features,
            TopLevelSection::Customize => &self.customize_features,
        };

        if !self.active || features.is_empty() {
            return Badge::NotPresent;
        }

        let pending: usize = features
            .iter()
            .map(|feature| self.feature_unreviewed_count(feature))
            .sum();
        let fully_reviewed = features
            .iter()
            .all(|feature| self.is_feature_fully_reviewed(feature));

        if fully_reviewed {
            Badge::Complete
        } else {
            Badge::Pending(pending)
        }
    }
}
