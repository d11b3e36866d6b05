//! Orbit camera controls and the idle sway of the model

use anatomy_core::lifecycle::aspect_ratio;
use anatomy_core::{IdleSway, OrbitCamera};
use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use tracing::{debug};
use bevy::window::PrimaryWindow;

use crate::lifecycle::{FrameSet, StartupSet, ViewerClock, ViewerOwned};
use crate::loader::AnatomyPivot;
use crate::settings::{vec3, ViewerSettings};

/// Pixels per scroll line for pixel-precise wheels and trackpads
const PIXELS_PER_LINE: f32 = 100.0;

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Damped orbit state driving the main camera
#[derive(Resource, Debug, Clone)]
pub struct CameraController(pub OrbitCamera);

#[derive(Resource, Debug, Clone)]
pub struct IdleSwayState(pub IdleSway);

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        let camera = app
            .world()
            .get_resource::<ViewerSettings>()
            .map(|settings| settings.config.camera.clone())
            .unwrap_or_default();

        app.insert_resource(CameraController(OrbitCamera::from_config(&camera)))
            .insert_resource(IdleSwayState(IdleSway::from_config(&camera)))
            .add_systems(Startup, spawn_camera.in_set(StartupSet::Build))
            .add_systems(Update, orbit_input.in_set(FrameSet::Input))
            .add_systems(
                Update,
                (update_camera, idle_sway).in_set(FrameSet::Camera),
            );
    }
}

fn spawn_camera(
    mut commands: Commands,
    settings: Res<ViewerSettings>,
    controller: Res<CameraController>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let orbit = &controller.0;
    let aspect = windows
        .single()
        .ok()
        .and_then(|w| aspect_ratio(w.physical_width(), w.physical_height()))
        .unwrap_or(1.0);

    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: settings.config.camera.fov_degrees.to_radians(),
            aspect_ratio: aspect,
            near: 0.01,
            far: 100.0,
            ..default()
        }),
        Transform::from_translation(vec3(orbit.eye())).looking_at(vec3(orbit.target), Vec3::Y),
        MainCamera,
        ViewerOwned,
    ));
}

/// Mouse and touch input: left drag orbits, right drag pans, wheel and
/// pinch zoom
fn orbit_input(
    mut controller: ResMut<CameraController>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touches: Res<Touches>,
) {
    let orbit = &mut controller.0;

    let mut motion = Vec2::ZERO;
    for event in mouse_motion.read() {
        motion += event.delta;
    }
    let motion = core_vec2(motion);

    if mouse_button.pressed(MouseButton::Left) {
        orbit.rotate(motion);
    }
    if mouse_button.pressed(MouseButton::Right) {
        orbit.pan(motion);
    }

    for scroll in mouse_wheel.read() {
        let lines = match scroll.unit {
            MouseScrollUnit::Line => scroll.y,
            MouseScrollUnit::Pixel => scroll.y / PIXELS_PER_LINE,
        };
        orbit.zoom(lines);
    }

    let active: Vec<_> = touches.iter().collect();
    match active.as_slice() {
        [touch] => {
            let delta = touch.delta();
            if delta != Vec2::ZERO {
                orbit.rotate(core_vec2(delta));
            }
        }
        [a, b] => {
            let current = a.position().distance(b.position());
            let previous = (a.position() - a.delta()).distance(b.position() - b.delta());
            if current > 1.0 {
                orbit.zoom_by_factor(previous / current);
            }
        }
        _ => {}
    }

    let dragging = mouse_button.pressed(MouseButton::Left)
        || mouse_button.pressed(MouseButton::Right)
        || !active.is_empty();
    if dragging != orbit.is_dragging() {
        debug!(dragging, "Pointer drag state changed");
    }
    orbit.set_dragging(dragging);
}

fn update_camera(
    clock: Res<ViewerClock>,
    mut controller: ResMut<CameraController>,
    mut cameras: Query<&mut Transform, With<MainCamera>>,
) {
    let orbit = &mut controller.0;
    orbit.update(clock.delta);

    let Ok(mut transform) = cameras.single_mut() else {
        return;
    };
    transform.translation = vec3(orbit.eye());
    transform.look_at(vec3(orbit.target), Vec3::Y);
}

/// Gentle rotation of the model while nobody interacts with it
fn idle_sway(
    clock: Res<ViewerClock>,
    controller: Res<CameraController>,
    mut sway: ResMut<IdleSwayState>,
    mut pivots: Query<&mut Transform, With<AnatomyPivot>>,
) {
    let angle = sway
        .0
        .update(clock.elapsed, clock.delta, controller.0.is_dragging());
    for mut transform in &mut pivots {
        transform.rotation = Quat::from_rotation_y(angle);
    }
}

fn core_vec2(v: Vec2) -> anatomy_core::Vec2 {
    anatomy_core::Vec2::from_array(v.to_array())
}
