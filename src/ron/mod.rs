//! Utilities for loading RON files and watching directories for changes.
//!
//! Settings, block definitions and entity physics types all live in RON
//! files under `data/`. This module reads them and provides a filesystem
//! watcher resource that flips a shared flag when a watched file changes,
//! which the per-resource `check_*_changes` systems poll for hot reloading.

use bevy::prelude::*;
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Failure to turn a single RON file into a value.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

#[derive(Resource)]
/// File-watcher resource for RON hot-reload.
pub struct RonWatcher {
    pub changed: Arc<Mutex<bool>>, // Set to `true` when watched files change.
    _watcher: Option<RecommendedWatcher>, // Kept alive so the OS watch is not dropped.
}

impl RonWatcher {
    /// Create a `RonWatcher` with no underlying OS watcher.
    ///
    /// Used as a fallback when watcher creation fails and in tests.
    #[must_use]
    pub fn stub() -> Self {
        RonWatcher {
            changed: Arc::new(Mutex::new(false)),
            _watcher: None,
        }
    }

    /// Return whether a change was observed and clear the flag.
    ///
    /// A poisoned mutex is recovered rather than propagated; the flag is a
    /// plain boolean so there is no invariant to lose.
    pub fn take_changed(&self) -> bool {
        let mut flag = match self.changed.lock() {
            Ok(flag) => flag,
            Err(poisoned) => {
                warn!("ron watcher mutex poisoned, recovering");
                poisoned.into_inner()
            }
        };
        std::mem::take(&mut *flag)
    }
}

/// Read and deserialize one RON file.
///
/// # Errors
/// Returns [`LoadError::Io`] if the file cannot be read and
/// [`LoadError::Parse`] if its contents are not a valid `T`.
pub fn load_ron_file<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str::<T>(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load all `.ron` files from a directory and deserialize them into `T`.
///
/// Files are visited in file-name order so reloads are deterministic. Files
/// that fail to load are skipped with a warning; a missing directory yields
/// an empty `Vec`.
#[must_use]
pub fn load_ron_files<T: DeserializeOwned>(path: &str) -> Vec<T> {
    let Ok(entries) = std::fs::read_dir(path) else {
        debug!("ron directory {path} not found, nothing loaded");
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();

    let mut items = Vec::with_capacity(files.len());
    for file in files {
        match load_ron_file::<T>(&file) {
            Ok(item) => items.push(item),
            Err(e) => warn!("{e}"),
        }
    }
    items
}

/// Create a `RonWatcher` that watches a directory for modifications.
///
/// The watcher's `changed` flag is set when a modify event is observed for
/// a path under the watched directory.
///
/// # Errors
/// Returns a `notify::Error` if the file watcher cannot be created or the
/// directory cannot be registered.
pub fn setup_ron_watcher(path: &str) -> Result<RonWatcher, notify::Error> {
    let changed = Arc::new(Mutex::new(false));
    let changed_clone = Arc::clone(&changed);
    let watched_path: PathBuf = std::fs::canonicalize(path).unwrap_or_else(|_| PathBuf::from(path));

    let mut watcher: RecommendedWatcher = Watcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if !matches!(event.kind, notify::EventKind::Modify(_)) {
                    return;
                }
                let relevant = event.paths.iter().any(|p| {
                    let p_canon = std::fs::canonicalize(p).unwrap_or_else(|_| p.clone());
                    p_canon.starts_with(&watched_path)
                });
                if relevant {
                    match changed_clone.lock() {
                        Ok(mut flag) => *flag = true,
                        Err(poisoned) => *poisoned.into_inner() = true,
                    }
                }
            }
            Err(e) => warn!("watch error: {e:?}"),
        },
        Config::default(),
    )?;

    watcher.watch(Path::new(path), RecursiveMode::NonRecursive)?;
    Ok(RonWatcher { changed, _watcher: Some(watcher) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        value: f32,
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("entity_physics_ron_{tag}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn loads_files_in_name_order_and_skips_bad_ones() {
        let dir = scratch_dir("order");
        std::fs::write(dir.join("b.ron"), "(name: \"second\", value: 2.0)").unwrap();
        std::fs::write(dir.join("a.ron"), "(name: \"first\", value: 1.0)").unwrap();
        std::fs::write(dir.join("c.ron"), "(name: broken").unwrap();
        std::fs::write(dir.join("ignored.txt"), "(name: \"x\", value: 0.0)").unwrap();

        let items: Vec<Sample> = load_ron_files(dir.to_str().unwrap());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "first");
        assert_eq!(items[1].name, "second");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn parse_errors_carry_the_path() {
        let dir = scratch_dir("err");
        let file = dir.join("bad.ron");
        std::fs::write(&file, "(name: 3)").unwrap();
        let err = load_ron_file::<Sample>(&file).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
        assert!(err.to_string().contains("bad.ron"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_directory_is_empty() {
        let items: Vec<Sample> = load_ron_files("/definitely/not/here");
        assert!(items.is_empty());
    }

    #[test]
    fn stub_watcher_flag_is_taken_once() {
        let w = RonWatcher::stub();
        assert!(!w.take_changed());
        *w.changed.lock().unwrap() = true;
        assert!(w.take_changed());
        assert!(!w.take_changed());
    }
}
