//! Anatomy Viewer - browser and desktop host
//!
//! On the web the viewer is exposed to JavaScript as the `AnatomyViewer`
//! class; natively the `anatomy-viewer` binary opens a window.

pub mod host;

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::AnatomyViewer;
