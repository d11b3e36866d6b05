//! Viewer configuration
//!
//! Every section is optional in TOML; missing keys take the defaults below,
//! which reproduce the stock viewer.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::asset::FallbackTorus;
use crate::label::{LabelStyle, MAX_CANVAS_SIDE};
use crate::marker::POINTER_OFFSET;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read viewer config: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse viewer config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid viewer config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub fallback: FallbackTorus,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub marker: MarkerConfig,
    #[serde(default)]
    pub label: LabelConfig,
    #[serde(default)]
    pub lighting: LightingConfig,
}

impl ViewerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.model.target_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "model.target_size must be positive, got {}",
                self.model.target_size
            )));
        }
        if !(0.0..=1.0).contains(&self.model.surface_opacity) {
            return Err(ConfigError::Invalid(format!(
                "model.surface_opacity must be within [0, 1], got {}",
                self.model.surface_opacity
            )));
        }
        let cam = &self.camera;
        if !(cam.min_distance > 0.0) || cam.min_distance > cam.max_distance {
            return Err(ConfigError::Invalid(format!(
                "camera distance bounds [{}, {}] are invalid",
                cam.min_distance, cam.max_distance
            )));
        }
        if !(cam.damping > 0.0 && cam.damping <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "camera.damping must be within (0, 1], got {}",
                cam.damping
            )));
        }
        if !(cam.max_pan >= 0.0) || !cam.max_pan.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "camera.max_pan must be a finite non-negative radius, got {}",
                cam.max_pan
            )));
        }
        if !(cam.fov_degrees > 0.0 && cam.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera.fov_degrees must be within (0, 180), got {}",
                cam.fov_degrees
            )));
        }
        if self.fallback.minor_radius <= 0.0 || self.fallback.major_radius <= 0.0 {
            return Err(ConfigError::Invalid(
                "fallback torus radii must be positive".to_string(),
            ));
        }
        let style = &self.label.style;
        if style.width == 0 || style.height == 0 {
            return Err(ConfigError::Invalid(
                "label canvas must be non-empty".to_string(),
            ));
        }
        if style.width > MAX_CANVAS_SIDE || style.height > MAX_CANVAS_SIDE {
            return Err(ConfigError::Invalid(format!(
                "label canvas {}x{} exceeds {} pixels per side",
                style.width, style.height, MAX_CANVAS_SIDE
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// glTF/GLB asset path, relative to the asset root or an URL
    #[serde(default = "default_asset_path")]
    pub asset_path: String,
    /// Largest dimension of the model after normalization
    #[serde(default = "default_target_size")]
    pub target_size: f32,
    /// Opacity forced onto every surface material
    #[serde(default = "default_surface_opacity")]
    pub surface_opacity: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            asset_path: default_asset_path(),
            target_size: default_target_size(),
            surface_opacity: default_surface_opacity(),
        }
    }
}

fn default_asset_path() -> String {
    "models/thyroid.glb".to_string()
}

fn default_target_size() -> f32 {
    2.0
}

fn default_surface_opacity() -> f32 {
    0.9
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_initial_distance")]
    pub initial_distance: f32,
    #[serde(default = "default_min_distance")]
    pub min_distance: f32,
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
    /// Fraction of the remaining gap closed per 60 Hz frame
    #[serde(default = "default_damping")]
    pub damping: f32,
    /// Radians around +Y, 0 looks from +Z
    #[serde(default)]
    pub initial_azimuth: f32,
    /// Radians from +Y
    #[serde(default = "default_initial_polar")]
    pub initial_polar: f32,
    #[serde(default = "default_fov_degrees")]
    pub fov_degrees: f32,
    /// Radians per dragged pixel
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
    /// Relative distance change per scroll line
    #[serde(default = "default_zoom_speed")]
    pub zoom_speed: f32,
    /// Focus shift per dragged pixel, scaled by distance
    #[serde(default = "default_pan_speed")]
    pub pan_speed: f32,
    /// Farthest the orbit focus may be panned from the origin
    #[serde(default = "default_max_pan")]
    pub max_pan: f32,
    /// Idle sway amplitude in radians
    #[serde(default = "default_idle_amplitude")]
    pub idle_amplitude: f32,
    /// Idle sway angular frequency in radians per second
    #[serde(default = "default_idle_frequency")]
    pub idle_frequency: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            initial_distance: default_initial_distance(),
            min_distance: default_min_distance(),
            max_distance: default_max_distance(),
            damping: default_damping(),
            initial_azimuth: 0.0,
            initial_polar: default_initial_polar(),
            fov_degrees: default_fov_degrees(),
            sensitivity: default_sensitivity(),
            zoom_speed: default_zoom_speed(),
            pan_speed: default_pan_speed(),
            max_pan: default_max_pan(),
            idle_amplitude: default_idle_amplitude(),
            idle_frequency: default_idle_frequency(),
        }
    }
}

fn default_initial_distance() -> f32 {
    4.0
}

fn default_min_distance() -> f32 {
    2.0
}

fn default_max_distance() -> f32 {
    8.0
}

fn default_damping() -> f32 {
    0.05
}

fn default_initial_polar() -> f32 {
    1.25 // Slightly above the horizon
}

fn default_fov_degrees() -> f32 {
    45.0
}

fn default_sensitivity() -> f32 {
    0.005
}

fn default_zoom_speed() -> f32 {
    0.1
}

fn default_pan_speed() -> f32 {
    0.002
}

fn default_max_pan() -> f32 {
    1.5
}

fn default_idle_amplitude() -> f32 {
    0.1
}

fn default_idle_frequency() -> f32 {
    0.3
}

/// Geometry and colors of the diagnostic marker parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub core_radius: f32,
    pub core_color: [f32; 3],
    /// Emissive tint, multiplied by the animated intensity
    pub emissive_color: [f32; 3],
    pub ring_inner_radius: f32,
    pub ring_outer_radius: f32,
    /// Distance of the ring in front of the core along the outward normal
    pub ring_lift: f32,
    pub ring_color: [f32; 3],
    pub halo_radius: f32,
    pub halo_color: [f32; 3],
    pub halo_opacity: f32,
    pub pointer_offset: [f32; 3],
    pub pointer_thickness: f32,
    pub pointer_color: [f32; 3],
    /// Width of the label billboard in world units
    pub label_world_width: f32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            core_radius: 0.05,
            core_color: [0.86, 0.15, 0.15],
            emissive_color: [1.0, 0.2, 0.2],
            ring_inner_radius: 0.07,
            ring_outer_radius: 0.09,
            ring_lift: 0.02,
            ring_color: [0.94, 0.27, 0.27],
            halo_radius: 0.12,
            halo_color: [1.0, 0.4, 0.4],
            halo_opacity: 0.25,
            pointer_offset: POINTER_OFFSET.to_array(),
            pointer_thickness: 0.004,
            pointer_color: [1.0, 1.0, 1.0],
            label_world_width: 0.6,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Font asset replacing the bundled label font
    pub font_path: Option<String>,
    pub style: LabelStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient_color: [f32; 3],
    pub ambient_brightness: f32,
    pub key: DirectionalLightConfig,
    pub fill: DirectionalLightConfig,
    pub rim: DirectionalLightConfig,
    pub hemisphere: HemisphereLightConfig,
    pub background: [f32; 3],
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_color: [1.0, 1.0, 1.0],
            ambient_brightness: 250.0,
            key: DirectionalLightConfig {
                position: [5.0, 5.0, 5.0],
                color: [1.0, 1.0, 1.0],
                illuminance: 6000.0,
                shadows: true,
            },
            fill: DirectionalLightConfig {
                position: [-5.0, 0.0, -5.0],
                color: [0.75, 0.85, 1.0], // Cool
                illuminance: 2500.0,
                shadows: false,
            },
            rim: DirectionalLightConfig {
                position: [0.0, -5.0, -5.0],
                color: [1.0, 0.85, 0.7], // Warm
                illuminance: 1200.0,
                shadows: false,
            },
            hemisphere: HemisphereLightConfig::default(),
            background: [0.06, 0.07, 0.09],
        }
    }
}

/// A directional light shining from `position` toward the origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLightConfig {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub illuminance: f32,
    #[serde(default)]
    pub shadows: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HemisphereLightConfig {
    pub sky_color: [f32; 3],
    pub ground_color: [f32; 3],
    pub sky_illuminance: f32,
    pub ground_illuminance: f32,
}

impl Default for HemisphereLightConfig {
    fn default() -> Self {
        Self {
            sky_color: [0.85, 0.9, 1.0],
            ground_color: [0.45, 0.35, 0.3],
            sky_illuminance: 1500.0,
            ground_illuminance: 600.0,
        }
    }
}
