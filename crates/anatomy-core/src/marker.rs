//! Diagnostic marker animation and layout
//!
//! Every animated quantity is a closed-form function of `t`, the seconds
//! elapsed since the viewer was created. Nothing here keeps state, so the
//! marker can be re-derived for any frame.

use glam::{Quat, Vec3};

/// Default leader line offset from the marker to the label anchor
pub const POINTER_OFFSET: Vec3 = Vec3::new(0.5, 0.4, 0.3);

/// Emissive intensity of the core sphere: `0.6 + sin(4t) * 0.4`
pub fn core_emissive_intensity(t: f32) -> f32 {
    0.6 + (t * 4.0).sin() * 0.4
}

/// Uniform scale of the core sphere: `1 + sin(3t) * 0.2`
pub fn core_scale(t: f32) -> f32 {
    1.0 + (t * 3.0).sin() * 0.2
}

/// Uniform scale of the pulse ring: `1 + sin(2t) * 0.3`
pub fn ring_scale(t: f32) -> f32 {
    1.0 + (t * 2.0).sin() * 0.3
}

/// Opacity of the pulse ring: `0.3 + sin(2t) * 0.3`
pub fn ring_opacity(t: f32) -> f32 {
    0.3 + (t * 2.0).sin() * 0.3
}

/// All animated marker values for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerFrame {
    pub core_scale: f32,
    pub emissive_intensity: f32,
    pub ring_scale: f32,
    pub ring_opacity: f32,
}

impl MarkerFrame {
    pub fn at(t: f32) -> Self {
        Self {
            core_scale: core_scale(t),
            emissive_intensity: core_emissive_intensity(t),
            ring_scale: ring_scale(t),
            ring_opacity: ring_opacity(t),
        }
    }
}

/// Placement of the marker parts relative to the marker group origin.
/// The group itself sits at the location entry's position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerLayout {
    /// Group position in model space
    pub position: Vec3,
    /// Outward direction from the model center through the marker
    pub normal: Vec3,
    /// Local offset of the pulse ring (in front of the core along `normal`)
    pub ring_offset: Vec3,
    /// Local end point of the pointer line, where the label is anchored
    pub pointer_end: Vec3,
}

impl MarkerLayout {
    pub fn new(position: Vec3, pointer_offset: Vec3, ring_lift: f32) -> Self {
        let normal = position.try_normalize().unwrap_or(Vec3::Z);
        Self {
            position,
            normal,
            ring_offset: normal * ring_lift,
            pointer_end: pointer_offset,
        }
    }

    /// Rotation taking a +Z facing flat primitive onto the outward normal
    pub fn ring_rotation(&self) -> Quat {
        Quat::from_rotation_arc(Vec3::Z, self.normal)
    }

    pub fn pointer_length(&self) -> f32 {
        self.pointer_end.length()
    }

    pub fn pointer_midpoint(&self) -> Vec3 {
        self.pointer_end * 0.5
    }

    /// Rotation taking a +Y aligned cylinder onto the pointer direction
    pub fn pointer_rotation(&self) -> Quat {
        match self.pointer_end.try_normalize() {
            Some(dir) => Quat::from_rotation_arc(Vec3::Y, dir),
            None => Quat::IDENTITY,
        }
    }

    /// Label anchor in model space
    pub fn label_anchor(&self) -> Vec3 {
        self.position + self.pointer_end
    }
}
