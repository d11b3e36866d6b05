//! Anatomical asset outcomes and the deterministic fallback shape

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bounds::Aabb;

/// Why the anatomical asset could not be used. Never surfaced to the host;
/// every variant is recovered by building the fallback torus.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetError {
    #[error("Failed to fetch asset {path}: {reason}")]
    Fetch { path: String, reason: String },
    #[error("Failed to parse asset {path}: {reason}")]
    Parse { path: String, reason: String },
    #[error("Asset {0} contains no scene")]
    NoScene(String),
}

impl AssetError {
    pub fn path(&self) -> &str {
        match self {
            AssetError::Fetch { path, .. } | AssetError::Parse { path, .. } => path,
            AssetError::NoScene(path) => path,
        }
    }
}

/// Where the anatomical representation in the scene came from
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOrigin {
    Asset { path: String },
    Fallback { error: AssetError },
}

impl ModelOrigin {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ModelOrigin::Fallback { .. })
    }
}

/// Placeholder torus substituted when the asset cannot be loaded.
/// The ring lies in the XZ plane around the Y axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackTorus {
    /// Distance from the torus center to the center of the tube
    pub major_radius: f32,
    /// Tube radius
    pub minor_radius: f32,
    /// Surface color as linear-ish sRGB (0.0-1.0)
    pub color: [f32; 3],
    pub metallic: f32,
    pub roughness: f32,
}

impl Default for FallbackTorus {
    fn default() -> Self {
        Self {
            major_radius: 1.0,
            minor_radius: 0.4,
            color: [0.91, 0.59, 0.55], // Soft tissue pink
            metallic: 0.1,
            roughness: 0.6,
        }
    }
}

impl FallbackTorus {
    /// Analytic bounds of the ideal torus
    pub fn bounds(&self) -> Aabb {
        let outer = self.major_radius + self.minor_radius;
        Aabb::new(
            Vec3::new(-outer, -self.minor_radius, -outer),
            Vec3::new(outer, self.minor_radius, outer),
        )
    }
}
