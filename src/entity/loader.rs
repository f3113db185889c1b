//! Entity type loader and watcher.
//!
//! Entity physics types are RON files under `data/entities/`, one
//! [`EntityProperties`] per file. Invalid types are skipped with a warning.

use super::{EntityProperties, PhysicsBody};
use crate::ron_loader::{load_ron_files, setup_ron_watcher, RonWatcher};
use bevy::prelude::*;
use std::collections::HashMap;

pub const ENTITIES_DIR: &str = "data/entities";

/// Loaded entity types by name.
#[derive(Resource, Default, Clone)]
pub struct EntityTypes {
    types: HashMap<String, EntityProperties>,
}

impl EntityTypes {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EntityProperties> {
        self.types.get(name)
    }

    pub fn insert(&mut self, props: EntityProperties) {
        self.types.insert(props.name.clone(), props);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[derive(Resource)]
pub struct EntityTypeWatcher {
    pub watcher: RonWatcher,
    pub dir: String,
}

impl EntityTypeWatcher {
    #[must_use]
    pub fn stub() -> Self {
        EntityTypeWatcher { watcher: RonWatcher::stub(), dir: ENTITIES_DIR.to_string() }
    }
}

/// Load every entity type in `path`, validating each against
/// [`PhysicsBody::from_properties`].
#[must_use]
pub fn load_entity_types_from_dir(path: &str) -> EntityTypes {
    let mut types = EntityTypes::default();
    for props in load_ron_files::<EntityProperties>(path) {
        match PhysicsBody::from_properties(&props) {
            Ok(_) => types.insert(props),
            Err(e) => warn!("skipping entity type: {e}"),
        }
    }
    info!("loaded {} entity types from {path}", types.len());
    types
}

/// # Errors
/// Returns a `notify::Error` if the watcher could not be created.
pub fn setup_entity_type_watcher(path: &str) -> Result<EntityTypeWatcher, notify::Error> {
    setup_ron_watcher(path).map(|watcher| EntityTypeWatcher { watcher, dir: path.to_string() })
}

/// Reload `EntityTypes` when the watched directory changes. Already spawned
/// entities keep their bodies.
#[allow(clippy::needless_pass_by_value)]
pub fn check_entity_type_changes(watcher: Res<EntityTypeWatcher>, mut types: ResMut<EntityTypes>) {
    if watcher.watcher.take_changed() {
        info!("entity types changed, reloading from {}", watcher.dir);
        *types = load_entity_types_from_dir(&watcher.dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_valid_types_only() {
        let dir = std::env::temp_dir().join(format!("entity_physics_types_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("wolf.ron"), "(name: \"wolf\", hitbox_width: 0.9, hitbox_height: 1.0)").unwrap();
        std::fs::write(dir.join("ghost.ron"), "(name: \"ghost\", hitbox_width: 0.0)").unwrap();
        std::fs::write(dir.join("broken.ron"), "(name: ").unwrap();

        let types = load_entity_types_from_dir(dir.to_str().unwrap());
        assert_eq!(types.len(), 1);
        assert_eq!(types.get("wolf").unwrap().hitbox_width, 0.9);
        assert!(types.get("ghost").is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
