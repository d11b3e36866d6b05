//! Viewer settings shared by every plugin

use anatomy_core::{LocationCode, ViewerConfig};
use bevy::prelude::*;

#[derive(Resource, Debug, Clone, Default)]
pub struct ViewerSettings {
    pub config: ViewerConfig,
    /// Classifier code; `None` shows the model without a marker
    pub code: Option<LocationCode>,
}

/// Convert a core math vector to Bevy's
pub(crate) fn vec3(v: anatomy_core::Vec3) -> Vec3 {
    Vec3::from_array(v.to_array())
}

pub(crate) fn rgb(c: [f32; 3]) -> Color {
    Color::srgb(c[0], c[1], c[2])
}

/// Convert a Bevy math vector to the core crate's
pub(crate) fn core_vec3(v: Vec3) -> anatomy_core::Vec3 {
    anatomy_core::Vec3::from_array(v.to_array())
}
