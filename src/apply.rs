// src/apply.rs

use std::{thread, time::Duration};

use crossbeam::channel::unbounded;
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, error, warn};

use crate::{
    config::{ConfigSection, ConfigurationItem, FeatureGroupSection, UnifiedConfigurationFile},
    errors::ReviewError,
    review::ReviewSession,
};

/// Bounded poll for the shell to come back after being terminated.
pub const SHELL_RESTART_ATTEMPTS: usize = 20;
pub const SHELL_RESTART_DELAY: Duration = Duration::from_millis(250);

/// Settings applied without ever prompting, independent of import options.
const AUTO_CONFIRMED_SETTINGS: &[&str] = &["power-plan-selection", "updates-policy-mode"];

/// Which top-level sections of the document to apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionSelection {
    pub windows_apps: bool,
    pub external_apps: bool,
    pub optimize: bool,
    pub customize: bool,
}

impl SectionSelection {
    pub fn all() -> Self {
        Self {
            windows_apps: true,
            external_apps: true,
            optimize: true,
            customize: true,
        }
    }

    pub fn settings_only() -> Self {
        Self {
            optimize: true,
            customize: true,
            ..Default::default()
        }
    }
}

/// Choices the user made in the import dialog.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub apply_wallpaper: bool,
    pub clean_taskbar: bool,
    pub clean_start_menu: bool,
    /// App ids ticked in the UI. `None` keeps every listed app.
    pub selected_app_ids: Option<IndexSet<String>>,
}

/// Uniform confirmation policy: the hard-wired settings auto-confirm, the
/// one-shot actions resolve their checkbox from the import options, and
/// everything else auto-confirms.
pub fn resolve_confirmation(setting_id: &str, options: &ImportOptions) -> bool {
    if AUTO_CONFIRMED_SETTINGS.contains(&setting_id) {
        return true;
    }
    match setting_id {
        "theme-wallpaper" => options.apply_wallpaper,
        "clean-taskbar" => options.clean_taskbar,
        "clean-start-menu-10" | "clean-start-menu-11" => options.clean_start_menu,
        _ => true,
    }
}

/// Removes or installs the apps of one app section. Runs on the calling
/// thread: the surrounding view-model layer needs it there.
pub trait AppRemover: Sync {
    fn process_apps(&self, section_name: &str, items: &[ConfigurationItem]) -> anyhow::Result<()>;
}

/// Applies one feature's approved items to the system. The confirmation
/// callback is consulted per setting id before anything destructive.
pub trait FeatureApplier: Sync {
    fn apply_feature(
        &self,
        feature_id: &str,
        items: &[ConfigurationItem],
        confirm: &(dyn Fn(&str) -> bool + Sync),
    ) -> anyhow::Result<()>;
}

/// Shell (Explorer) restart primitives driven by the orchestrator's bounded
/// retry loop.
pub trait ShellRefresh: Sync {
    fn terminate_shell(&self) -> anyhow::Result<()>;
    fn is_shell_running(&self) -> bool;
    fn launch_shell(&self) -> anyhow::Result<()>;
}

/// Per-branch and per-feature results of one apply run.
#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    pub apps_succeeded: bool,
    pub settings_succeeded: bool,
    pub feature_results: IndexMap<String, bool>,
}

/// Drives one application pass: rebuilds the approved-only configuration,
/// runs app processing and settings application as two independent parallel
/// branches, fans the settings branch out one task per feature, and
/// finishes with a shell refresh so changes become visible.
pub struct ApplyOrchestrator<'a> {
    remover: &'a dyn AppRemover,
    applier: &'a dyn FeatureApplier,
    shell: &'a dyn ShellRefresh,
    shell_restart_attempts: usize,
    shell_restart_delay: Duration,
}

impl<'a> ApplyOrchestrator<'a> {
    pub fn new(
        remover: &'a dyn AppRemover,
        applier: &'a dyn FeatureApplier,
        shell: &'a dyn ShellRefresh,
    ) -> Self {
        Self {
            remover,
            applier,
            shell,
            shell_restart_attempts: SHELL_RESTART_ATTEMPTS,
            shell_restart_delay: SHELL_RESTART_DELAY,
        }
    }

    /// Shrinks the shell restart poll. Intended for tests.
    pub fn with_shell_retry(mut self, attempts: usize, delay: Duration) -> Self {
        self.shell_restart_attempts = attempts;
        self.shell_restart_delay = delay;
        self
    }

    /// Applies the approved subset of `config`. Per-feature failures are
    /// logged and aggregated; they never abort sibling features — every
    /// selected feature is attempted exactly once. Feature ordering is
    /// unspecified.
    pub fn apply_configuration_with_options(
        &self,
        config: &UnifiedConfigurationFile,
        selection: SectionSelection,
        options: &ImportOptions,
        approved: &IndexSet<String>,
    ) -> ApplyOutcome {
        let approved_config = build_approved_config(config, selection, options, approved);

        let mut tasks: Vec<(String, Vec<ConfigurationItem>)> = Vec::new();
        for (feature, section) in approved_config.feature_sections() {
            if !section.items.is_empty() {
                tasks.push((feature.to_string(), section.items.clone()));
            }
        }

        let (task_tx, task_rx) = unbounded::<(String, Vec<ConfigurationItem>)>();
        let (result_tx, result_rx) = unbounded::<(String, bool)>();
        for task in tasks.iter().cloned() {
            let _ = task_tx.send(task);
        }
        drop(task_tx);

        let mut apps_succeeded = true;
        let worker_count = tasks.len().min(num_cpus::get().max(1));

        thread::scope(|scope| {
            for _ in 0..worker_count {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                let applier = self.applier;
                scope.spawn(move || {
                    while let Ok((feature, items)) = task_rx.recv() {
                        let confirm = |setting_id: &str| resolve_confirmation(setting_id, options);
                        let succeeded = match applier.apply_feature(&feature, &items, &confirm) {
                            Ok(()) => {
                                debug!("Applied feature '{}'", feature);
                                true
                            }
                            Err(e) => {
                                error!("Failed to apply feature '{}': {:?}", feature, e);
                                false
                            }
                        };
                        let _ = result_tx.send((feature, succeeded));
                    }
                });
            }
            drop(result_tx);

            // App processing stays on the calling thread while the settings
            // workers run.
            apps_succeeded = self.process_app_sections(&approved_config, selection);
        });

        let feature_results: IndexMap<String, bool> = result_rx.try_iter().collect();
        let settings_succeeded = feature_results.values().all(|ok| *ok);

        self.refresh_shell();

        ApplyOutcome {
            apps_succeeded,
            settings_succeeded,
            feature_results,
        }
    }

    /// Applies the approved diffs of an active review session, then leaves
    /// review mode.
    pub fn apply_reviewed_config(
        &self,
        session: &mut ReviewSession,
        selection: SectionSelection,
        options: &ImportOptions,
    ) -> anyhow::Result<ApplyOutcome> {
        let config = session
            .filtered_config()
            .ok_or(ReviewError::NotActive)?
            .clone();
        let approved = session.approved_ids();
        let outcome =
            self.apply_configuration_with_options(&config, selection, options, &approved);
        session.exit_review_mode();
        Ok(outcome)
    }

    fn process_app_sections(
        &self,
        config: &UnifiedConfigurationFile,
        selection: SectionSelection,
    ) -> bool {
        let mut succeeded = true;
        let sections = [
            (selection.windows_apps, "WindowsApps", &config.windows_apps),
            (
                selection.external_apps,
                "ExternalApps",
                &config.external_apps,
            ),
        ];
        for (selected, name, section) in sections {
            if !selected || section.items.is_empty() {
                continue;
            }
            if let Err(e) = self.remover.process_apps(name, &section.items) {
                error!("Failed to process {} section: {:?}", name, e);
                succeeded = false;
            }
        }
        succeeded
    }

    /// Terminates the shell, polls for its managed restart, and launches a
    /// fresh instance if it never comes back. The poll is bounded so a
    /// stuck shell cannot stall apply indefinitely.
    fn refresh_shell(&self) {
        if let Err(e) = self.shell.terminate_shell() {
            warn!("Failed to terminate shell: {:?}", e);
        }
        for _ in 0..self.shell_restart_attempts {
            if self.shell.is_shell_running() {
                debug!("Shell restarted on its own");
                return;
            }
            thread::sleep(self.shell_restart_delay);
        }
        warn!("Shell did not restart; launching a fresh instance");
        if let Err(e) = self.shell.launch_shell() {
            error!("Failed to launch shell: {:?}", e);
        }
    }
}

/// The approved-only configuration: settings features filtered to the ids
/// the user approved, app sections filtered to the UI checkbox selection.
fn build_approved_config(
    config: &UnifiedConfigurationFile,
    selection: SectionSelection,
    options: &ImportOptions,
    approved: &IndexSet<String>,
) -> UnifiedConfigurationFile {
    let mut approved_config = UnifiedConfigurationFile {
        version: config.version.clone(),
        ..Default::default()
    };
    if selection.windows_apps {
        approved_config.windows_apps = filter_apps(&config.windows_apps, options);
    }
    if selection.external_apps {
        approved_config.external_apps = filter_apps(&config.external_apps, options);
    }
    if selection.optimize {
        approved_config.optimize = filter_group_to_approved(&config.optimize, approved);
    }
    if selection.customize {
        approved_config.customize = filter_group_to_approved(&config.customize, approved);
    }
    approved_config
}

fn filter_apps(section: &ConfigSection, options: &ImportOptions) -> ConfigSection {
    ConfigSection {
        items: section
            .items
            .iter()
            .filter(|item| {
                options
                    .selected_app_ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&item.id))
            })
            .cloned()
            .collect(),
    }
}

fn filter_group_to_approved(
    group: &FeatureGroupSection,
    approved: &IndexSet<String>,
) -> FeatureGroupSection {
    let mut filtered = FeatureGroupSection::default();
    for (feature, section) in &group.features {
        let items: Vec<ConfigurationItem> = section
            .items
            .iter()
            .filter(|item| approved.contains(&item.id))
            .cloned()
            .collect();
        filtered
            .features
            .insert(feature.clone(), ConfigSection { items });
    }
    filtered
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::config::ConfigurationItem;

    #[derive(Default)]
    struct RecordingApplier {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        failing_features: Vec<&'static str>,
    }

    impl FeatureApplier for RecordingApplier {
        fn apply_feature(
            &self,
            feature_id: &str,
            items: &[ConfigurationItem],
            confirm: &(dyn Fn(&str) -> bool + Sync),
        ) -> anyhow::Result<()> {
            let applied: Vec<String> = items
                .iter()
                .filter(|item| confirm(&item.id))
                .map(|item| item.id.clone())
                .collect();
            self.calls
                .lock()
                .unwrap()
                .push((feature_id.to_string(), applied));
            if self.failing_features.contains(&feature_id) {
                anyhow::bail!("boom");
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingRemover {
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl AppRemover for RecordingRemover {
        fn process_apps(
            &self,
            section_name: &str,
            items: &[ConfigurationItem],
        ) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push((
                section_name.to_string(),
                items.iter().map(|item| item.id.clone()).collect(),
            ));
            Ok(())
        }
    }

    /// Shell stub: `running` decides whether the poll sees a restart.
    struct StubShell {
        running: bool,
        launched: Mutex<bool>,
        terminated: Mutex<bool>,
    }

    impl StubShell {
        fn new(running: bool) -> Self {
            Self {
                running,
                launched: Mutex::new(false),
                terminated: Mutex::new(false),
            }
        }
    }

    impl ShellRefresh for StubShell {
        fn terminate_shell(&self) -> anyhow::Result<()> {
            *self.terminated.lock().unwrap() = true;
            Ok(())
        }

        fn is_shell_running(&self) -> bool {
            self.running
        }

        fn launch_shell(&self) -> anyhow::Result<()> {
            *self.launched.lock().unwrap() = true;
            Ok(())
        }
    }

    fn sample_config() -> UnifiedConfigurationFile {
        let mut config = UnifiedConfigurationFile::default();
        config
            .windows_apps
            .items
            .push(ConfigurationItem::selected("Microsoft.BingWeather", true));
        config
            .windows_apps
            .items
            .push(ConfigurationItem::selected("Microsoft.GetHelp", true));
        config.optimize.features.insert(
            "privacy".to_string(),
            ConfigSection {
                items: vec![
                    ConfigurationItem::selected("disable-telemetry", true),
                    ConfigurationItem::selected("disable-advertising-id", true),
                ],
            },
        );
        config.customize.features.insert(
            "theme".to_string(),
            ConfigSection {
                items: vec![ConfigurationItem::selected("theme-wallpaper", true)],
            },
        );
        config
    }

    fn orchestrator<'a>(
        remover: &'a RecordingRemover,
        applier: &'a RecordingApplier,
        shell: &'a StubShell,
    ) -> ApplyOrchestrator<'a> {
        ApplyOrchestrator::new(remover, applier, shell)
            .with_shell_retry(2, Duration::from_millis(1))
    }

    #[test]
    fn applies_only_approved_settings() {
        let remover = RecordingRemover::default();
        let applier = RecordingApplier::default();
        let shell = StubShell::new(true);

        let approved: IndexSet<String> = ["disable-telemetry".to_string()].into_iter().collect();
        let options = ImportOptions::default();
        let outcome = orchestrator(&remover, &applier, &shell)
            .apply_configuration_with_options(
                &sample_config(),
                SectionSelection::settings_only(),
                &options,
                &approved,
            );

        assert!(outcome.settings_succeeded);
        let calls = applier.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "privacy");
        assert_eq!(calls[0].1, vec!["disable-telemetry".to_string()]);
        // Apps were not selected, so the remover never ran.
        assert!(remover.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn feature_failure_does_not_abort_siblings() {
        let remover = RecordingRemover::default();
        let applier = RecordingApplier {
            failing_features: vec!["privacy"],
            ..Default::default()
        };
        let shell = StubShell::new(true);

        let approved: IndexSet<String> = [
            "disable-telemetry".to_string(),
            "theme-wallpaper".to_string(),
        ]
        .into_iter()
        .collect();
        let options = ImportOptions {
            apply_wallpaper: true,
            ..Default::default()
        };
        let outcome = orchestrator(&remover, &applier, &shell)
            .apply_configuration_with_options(
                &sample_config(),
                SectionSelection::settings_only(),
                &options,
                &approved,
            );

        assert!(!outcome.settings_succeeded);
        assert_eq!(outcome.feature_results.get("privacy"), Some(&false));
        assert_eq!(outcome.feature_results.get("theme"), Some(&true));
        // Both features were attempted exactly once.
        assert_eq!(applier.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn app_sections_follow_checkbox_selection() {
        let remover = RecordingRemover::default();
        let applier = RecordingApplier::default();
        let shell = StubShell::new(true);

        let options = ImportOptions {
            selected_app_ids: Some(
                ["Microsoft.BingWeather".to_string()].into_iter().collect(),
            ),
            ..Default::default()
        };
        let outcome = orchestrator(&remover, &applier, &shell)
            .apply_configuration_with_options(
                &sample_config(),
                SectionSelection::all(),
                &options,
                &IndexSet::new(),
            );

        assert!(outcome.apps_succeeded);
        let calls = remover.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "WindowsApps");
        assert_eq!(calls[0].1, vec!["Microsoft.BingWeather".to_string()]);
    }

    #[test]
    fn confirmation_policy_matrix() {
        let options = ImportOptions {
            apply_wallpaper: false,
            clean_taskbar: true,
            clean_start_menu: false,
            selected_app_ids: None,
        };
        // Hard-wired settings always confirm.
        assert!(resolve_confirmation("power-plan-selection", &options));
        assert!(resolve_confirmation("updates-policy-mode", &options));
        // Actions follow their checkbox.
        assert!(!resolve_confirmation("theme-wallpaper", &options));
        assert!(resolve_confirmation("clean-taskbar", &options));
        assert!(!resolve_confirmation("clean-start-menu-10", &options));
        assert!(!resolve_confirmation("clean-start-menu-11", &options));
        // Everything else auto-confirms.
        assert!(resolve_confirmation("disable-telemetry", &options));
    }

    #[test]
    fn declined_action_is_withheld_from_applier() {
        let remover = RecordingRemover::default();
        let applier = RecordingApplier::default();
        let shell = StubShell::new(true);

        let approved: IndexSet<String> = ["theme-wallpaper".to_string()].into_iter().collect();
        let options = ImportOptions::default(); // apply_wallpaper = false
        orchestrator(&remover, &applier, &shell).apply_configuration_with_options(
            &sample_config(),
            SectionSelection::settings_only(),
            &options,
            &approved,
        );

        let calls = applier.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "theme");
        assert!(calls[0].1.is_empty(), "declined action must not be applied");
    }

    #[test]
    fn shell_is_relaunched_when_it_never_returns() {
        let remover = RecordingRemover::default();
        let applier = RecordingApplier::default();
        let shell = StubShell::new(false);

        orchestrator(&remover, &applier, &shell).apply_configuration_with_options(
            &sample_config(),
            SectionSelection::settings_only(),
            &ImportOptions::default(),
            &IndexSet::new(),
        );

        assert!(*shell.terminated.lock().unwrap());
        assert!(*shell.launched.lock().unwrap());
    }

    #[test]
    fn shell_restart_is_detected_without_relaunch() {
        let remover = RecordingRemover::default();
        let applier = RecordingApplier::default();
        let shell = StubShell::new(true);

        orchestrator(&remover, &applier, &shell).apply_configuration_with_options(
            &sample_config(),
            SectionSelection::settings_only(),
            &ImportOptions::default(),
            &IndexSet::new(),
        );

        assert!(*shell.terminated.lock().unwrap());
        assert!(!*shell.launched.lock().unwrap());
    }
}
