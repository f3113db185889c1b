pub mod behavior;
pub mod block;
pub mod chunk;
pub mod collision;
pub mod entity;
pub mod partition;
pub mod physics;
pub mod plugin;
pub mod ron;
pub use crate::ron as ron_loader;
pub mod settings;
pub mod world;

pub use plugin::{EntityPhysicsBundle, EntityPhysicsEvent, EntityPhysicsPlugin, PhysicsEventKind};
