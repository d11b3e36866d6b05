//! Damped orbit camera and idle sway
//!
//! The orbit is Y-up: azimuth spins around +Y, polar is measured from +Y.
//! Input only moves the *target* values; `update` eases the current values
//! toward them so motion decelerates smoothly once input stops.

use glam::{Vec2, Vec3};
use std::f32::consts::PI;

use crate::config::CameraConfig;

/// Polar angle is kept this far away from the poles
const POLAR_MARGIN: f32 = 0.05;

/// Per-frame damping factor converted to a frame-rate independent blend.
/// At 60 Hz one step closes exactly `damping` of the gap.
pub fn damping_blend(damping: f32, dt: f32) -> f32 {
    1.0 - (1.0 - damping.clamp(0.0, 1.0)).powf(dt.max(0.0) * 60.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub target_focus: Vec3,
    pub azimuth: f32,
    pub target_azimuth: f32,
    pub polar: f32,
    pub target_polar: f32,
    pub distance: f32,
    pub target_distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub damping: f32,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    /// Radius around the origin the focus is kept within
    pub max_pan: f32,
    dragging: bool,
}

impl OrbitCamera {
    pub fn from_config(config: &CameraConfig) -> Self {
        let distance = config
            .initial_distance
            .clamp(config.min_distance, config.max_distance);
        let polar = clamp_polar(config.initial_polar);
        Self {
            target: Vec3::ZERO,
            target_focus: Vec3::ZERO,
            azimuth: config.initial_azimuth,
            target_azimuth: config.initial_azimuth,
            polar,
            target_polar: polar,
            distance,
            target_distance: distance,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            damping: config.damping,
            sensitivity: config.sensitivity,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            max_pan: config.max_pan,
            dragging: false,
        }
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Orbit by a pointer delta in pixels
    pub fn rotate(&mut self, delta: Vec2) {
        self.target_azimuth -= delta.x * self.sensitivity;
        self.target_polar = clamp_polar(self.target_polar - delta.y * self.sensitivity);
    }

    /// Zoom by a scroll amount (positive = closer)
    pub fn zoom(&mut self, scroll: f32) {
        self.zoom_by_factor(1.0 - scroll * self.zoom_speed);
    }

    /// Multiply the target distance, e.g. with a pinch ratio
    pub fn zoom_by_factor(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.target_distance =
            (self.target_distance * factor).clamp(self.min_distance, self.max_distance);
    }

    /// Move the orbit focus in the camera's screen plane
    pub fn pan(&mut self, delta: Vec2) {
        let forward = (self.target - self.eye()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        let speed = self.distance * self.pan_speed;
        let focus = self.target_focus + (-right * delta.x + up * delta.y) * speed;
        self.target_focus = focus.clamp_length_max(self.max_pan.max(0.0));
    }

    /// Advance damping by `dt` seconds
    pub fn update(&mut self, dt: f32) {
        let blend = damping_blend(self.damping, dt);
        self.azimuth += (self.target_azimuth - self.azimuth) * blend;
        self.polar += (self.target_polar - self.polar) * blend;
        self.distance += (self.target_distance - self.distance) * blend;
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);
        self.target += (self.target_focus - self.target) * blend;
    }

    /// Camera position in world space
    pub fn eye(&self) -> Vec3 {
        let (sin_p, cos_p) = self.polar.sin_cos();
        let (sin_a, cos_a) = self.azimuth.sin_cos();
        self.target + Vec3::new(sin_p * sin_a, cos_p, sin_p * cos_a) * self.distance
    }
}

fn clamp_polar(polar: f32) -> f32 {
    polar.clamp(POLAR_MARGIN, PI - POLAR_MARGIN)
}

/// Idle "breathing" rotation of the model: `sin(frequency * t) * amplitude`.
///
/// Suppressed while the user drags: the angle holds, and after release it
/// eases back onto the sinusoid with the camera damping instead of snapping.
#[derive(Debug, Clone, PartialEq)]
pub struct IdleSway {
    pub amplitude: f32,
    pub frequency: f32,
    pub damping: f32,
    angle: f32,
    recovering: bool,
}

impl IdleSway {
    pub fn new(amplitude: f32, frequency: f32, damping: f32) -> Self {
        Self {
            amplitude,
            frequency,
            damping,
            angle: 0.0,
            recovering: false,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(config.idle_amplitude, config.idle_frequency, config.damping)
    }

    /// Undisturbed sway angle at time `t`
    pub fn target_angle(&self, t: f32) -> f32 {
        (t * self.frequency).sin() * self.amplitude
    }

    /// Advance to time `t` and return the rotation about Y to apply
    pub fn update(&mut self, t: f32, dt: f32, dragging: bool) -> f32 {
        if dragging {
            self.recovering = true;
            return self.angle;
        }

        let target = self.target_angle(t);
        if self.recovering {
            // Decay the offset from the sinusoid rather than chasing a moving target
            let offset = (self.angle - target) * (1.0 - damping_blend(self.damping, dt));
            if offset.abs() < 1e-4 {
                self.recovering = false;
                self.angle = target;
            } else {
                self.angle = target + offset;
            }
        } else {
            self.angle = target;
        }
        self.angle
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn camera() -> OrbitCamera {
        OrbitCamera::from_config(&CameraConfig::default())
    }

    #[test]
    fn test_blend_matches_per_frame_factor() {
        assert!((damping_blend(0.05, DT) - 0.05).abs() < 1e-5);
        assert_eq!(damping_blend(0.05, 0.0), 0.0);
        // Two 60 Hz frames equal one 30 Hz frame
        let two = 1.0 - (1.0 - 0.05f32).powi(2);
        assert!((damping_blend(0.05, 2.0 * DT) - two).abs() < 1e-5);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut cam = camera();
        for _ in 0..100 {
            cam.zoom(5.0);
        }
        assert_eq!(cam.target_distance, cam.min_distance);
        for _ in 0..100 {
            cam.zoom(-5.0);
        }
        assert_eq!(cam.target_distance, cam.max_distance);

        for _ in 0..2000 {
            cam.update(DT);
            assert!(cam.distance >= 2.0 && cam.distance <= 8.0);
        }
        assert!((cam.distance - 8.0).abs() < 1e-3);
    }

    #[test]
    fn test_damped_motion_never_snaps() {
        let mut cam = camera();
        let start = cam.azimuth;
        cam.rotate(Vec2::new(-200.0, 0.0));
        let goal = cam.target_azimuth;
        assert!(goal > start);

        cam.update(DT);
        let first_step = cam.azimuth - start;
        assert!((first_step - (goal - start) * 0.05).abs() < 1e-4);

        // Monotonic approach without overshoot
        let mut prev = cam.azimuth;
        for _ in 0..600 {
            cam.update(DT);
            assert!(cam.azimuth >= prev);
            assert!(cam.azimuth <= goal + 1e-6);
            prev = cam.azimuth;
        }
        assert!((cam.azimuth - goal).abs() < 1e-3);
    }

    #[test]
    fn test_polar_stays_off_the_poles() {
        let mut cam = camera();
        cam.rotate(Vec2::new(0.0, 1.0e6));
        assert!((cam.target_polar - POLAR_MARGIN).abs() < 1e-6);
        cam.rotate(Vec2::new(0.0, -1.0e6));
        assert!((cam.target_polar - (PI - POLAR_MARGIN)).abs() < 1e-6);
    }

    #[test]
    fn test_eye_position() {
        let mut cam = camera();
        cam.azimuth = 0.0;
        cam.polar = PI / 2.0;
        cam.distance = 4.0;
        let eye = cam.eye();
        assert!((eye - Vec3::new(0.0, 0.0, 4.0)).length() < 1e-5);

        cam.polar = POLAR_MARGIN;
        assert!(cam.eye().y > 3.9);
    }

    #[test]
    fn test_pan_moves_focus_not_angles() {
        let mut cam = camera();
        let (az, polar, dist) = (cam.azimuth, cam.polar, cam.distance);
        cam.pan(Vec2::new(10.0, 5.0));
        assert!(cam.target_focus.length() > 0.0);
        for _ in 0..10 {
            cam.update(DT);
        }
        assert_eq!(cam.azimuth, az);
        assert_eq!(cam.polar, polar);
        assert_eq!(cam.distance, dist);
        assert!(cam.target.length() > 0.0);
    }

    #[test]
    fn test_pan_is_bounded() {
        let mut cam = camera();
        for _ in 0..100 {
            cam.pan(Vec2::new(5000.0, 0.0));
        }
        assert!((cam.target_focus.length() - cam.max_pan).abs() < 1e-4);

        for _ in 0..2000 {
            cam.update(DT);
            assert!(cam.target.length() <= cam.max_pan + 1e-4);
        }
        assert!((cam.target - cam.target_focus).length() < 1e-3);

        // Panning back inside the radius still works
        cam.pan(Vec2::new(-50.0, 0.0));
        assert!(cam.target_focus.length() < cam.max_pan);

        let mut pinned = OrbitCamera::from_config(&CameraConfig {
            max_pan: 0.0,
            ..CameraConfig::default()
        });
        pinned.pan(Vec2::new(40.0, -40.0));
        assert_eq!(pinned.target_focus, Vec3::ZERO);
    }

    #[test]
    fn test_idle_sway_follows_sinusoid() {
        let mut sway = IdleSway::new(0.1, 0.3, 0.05);
        for i in 0..300 {
            let t = i as f32 * DT;
            let angle = sway.update(t, DT, false);
            assert!((angle - (t * 0.3).sin() * 0.1).abs() < 1e-6);
        }
    }

    #[test]
    fn test_idle_sway_holds_while_dragging() {
        let mut sway = IdleSway::new(0.1, 0.3, 0.05);
        let held = sway.update(3.0, DT, false);
        for i in 1..120 {
            let angle = sway.update(3.0 + i as f32 * DT, DT, true);
            assert_eq!(angle, held);
        }

        // Released: eases back instead of jumping to the sinusoid
        let t = 5.0;
        let after = sway.update(t, DT, false);
        let target = sway.target_angle(t);
        assert!((after - held).abs() < (target - held).abs());

        let mut t = t;
        for _ in 0..2000 {
            t += DT;
            sway.update(t, DT, false);
        }
        assert!((sway.angle() - sway.target_angle(t)).abs() < 1e-4);
    }
}
