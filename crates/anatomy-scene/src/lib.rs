//! Anatomy Scene - Bevy plugins for the anatomical diagnostic viewer
//!
//! This crate turns the engine-independent pieces of `anatomy-core` into a
//! running scene: model loading with fallback geometry, normalization, the
//! diagnostic marker, the lighting rig, orbit camera controls, and the viewer
//! lifecycle that owns all of it.

pub mod camera;
pub mod lifecycle;
pub mod lighting;
pub mod loader;
pub mod marker;
pub mod normalize;
pub mod settings;
pub mod viewer;

use bevy::prelude::*;

pub use camera::{CameraController, MainCamera};
pub use lifecycle::{FrameSet, HostCommand, ViewerLifecycle, ViewerOwned};
pub use loader::{LoadOutcome, ModelLoadResolved, ModelSource};
pub use settings::ViewerSettings;
pub use viewer::{Viewer, ViewerLink, ViewerOptions};

/// Plugin that sets up the whole anatomical scene
pub struct AnatomyScenePlugin {
    pub settings: ViewerSettings,
    pub source: ModelSource,
}

impl Plugin for AnatomyScenePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.settings.clone())
            .insert_resource(self.source.clone())
            .add_plugins(lifecycle::LifecyclePlugin)
            .add_plugins(loader::LoaderPlugin)
            .add_plugins(normalize::NormalizePlugin)
            .add_plugins(marker::MarkerPlugin)
            .add_plugins(lighting::LightingPlugin)
            .add_plugins(camera::CameraPlugin);
    }
}
