//! Settings loading and hot-reloading.
//! This module provides utilities for loading settings from RON files and watching
//! for changes to enable hot-reloading of settings at runtime.
//!
//! Settings are loaded from RON files in the `data/settings` directory. If multiple
//! RON files are present, the first successfully parsed `Settings` will be used.
//! If no RON files are found or if no parsing succeeds, default settings will be used.
use crate::ron_loader::{load_ron_files, setup_ron_watcher, RonWatcher};
use crate::settings::Settings;
use bevy::prelude::{info, Res, ResMut, Resource};

pub const SETTINGS_DIR: &str = "data/settings";

#[derive(Resource)]
pub struct SettingsWatcher {
    pub watcher: RonWatcher,
    pub dir: String,
}

/// Load settings from `path` (directory). If multiple `.ron` files are present
/// the first parsed `Settings` will be used. If none exist the `Default` is used.
///
/// # Arguments
/// * `path` - The directory path where settings RON files are located (e.g., "data/settings").
///
/// # Example
/// ```
/// use entity_physics::settings::loader::load_settings_from_dir;
///
/// let settings = load_settings_from_dir("data/settings");
/// assert!(settings.physics.fixed_step > 0.0);
/// ```
#[must_use]
pub fn load_settings_from_dir(path: &str) -> Settings {
    let items: Vec<Settings> = load_ron_files(path);
    if let Some(first) = items.into_iter().next() {
        first
    } else {
        info!("no settings found in {path}, using defaults");
        Settings::defaults()
    }
}

/// Create a watcher for the settings directory (hot-reload).
///
/// # Errors
/// Returns a `notify::Error` if the underlying watcher could not be created.
pub fn setup_settings_watcher(path: &str) -> Result<SettingsWatcher, notify::Error> {
    setup_ron_watcher(path).map(|watcher| SettingsWatcher { watcher, dir: path.to_string() })
}

/// Check for changes and reload settings resource when files change.
///
/// # Arguments
/// * `watcher` - The `SettingsWatcher` resource that monitors changes in settings RON files.
/// * `settings` - The mutable `Settings` resource that is updated when changes are detected
#[allow(clippy::needless_pass_by_value)]
pub fn check_settings_changes(watcher: Res<SettingsWatcher>, mut settings: ResMut<Settings>) {
    if watcher.watcher.take_changed() {
        info!("settings changed, reloading from {}", watcher.dir);
        *settings = load_settings_from_dir(&watcher.dir);
    }
}

impl SettingsWatcher {
    #[must_use]
    pub fn stub() -> Self {
        SettingsWatcher { watcher: RonWatcher::stub(), dir: SETTINGS_DIR.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_gives_defaults() {
        let s = load_settings_from_dir("does/not/exist");
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn stub_watcher_reports_manual_changes_once() {
        let w = SettingsWatcher::stub();
        *w.watcher.changed.lock().unwrap() = true;
        assert!(w.watcher.take_changed());
        assert!(!w.watcher.take_changed());
    }
}
