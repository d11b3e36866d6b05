//! Anatomy Core - Engine-independent logic for the anatomical diagnostic viewer
//!
//! This crate provides the foundational pieces that the Bevy scene layer drives:
//! - Diagnostic location table (classifier code to model-space position)
//! - Bounding box and normalization math for loaded or fallback models
//! - Marker animation formulas and part layout
//! - Label rasterization into RGBA pixel buffers
//! - Damped orbit camera and idle sway
//! - Viewer lifecycle state machine and load tickets
//! - TOML configuration

pub mod asset;
pub mod bounds;
pub mod camera;
pub mod config;
pub mod label;
pub mod lifecycle;
pub mod location;
pub mod marker;

pub use asset::{AssetError, FallbackTorus, ModelOrigin};
pub use bounds::{Aabb, Normalization};
pub use camera::{IdleSway, OrbitCamera};
pub use config::{ConfigError, ViewerConfig};
pub use label::{LabelBitmap, LabelError, LabelRasterizer, LabelStyle};
pub use lifecycle::{Lifecycle, LoadTicket, ViewerState};
pub use location::{LocationCode, LocationEntry};
pub use marker::{MarkerFrame, MarkerLayout};

pub use glam::{Quat, Vec2, Vec3};
