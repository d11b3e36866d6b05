//! Lighting rig: ambient, key, cool fill, warm rim and a hemisphere pair

use anatomy_core::config::DirectionalLightConfig;
use bevy::prelude::*;
use tracing::{debug};

use crate::lifecycle::{StartupSet, ViewerOwned};
use crate::settings::{rgb, ViewerSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightRole {
    Key,
    Fill,
    Rim,
    /// Sky and ground halves of the hemisphere light
    Hemisphere,
}

/// Tags every light the rig spawns
#[derive(Component, Debug)]
pub struct RigLight(pub LightRole);

pub struct LightingPlugin;

impl Plugin for LightingPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_light_rig.in_set(StartupSet::Build));
    }
}

fn spawn_light_rig(mut commands: Commands, settings: Res<ViewerSettings>) {
    let lighting = &settings.config.lighting;

    commands.insert_resource(AmbientLight {
        color: rgb(lighting.ambient_color),
        brightness: lighting.ambient_brightness,
        ..default()
    });
    commands.insert_resource(ClearColor(rgb(lighting.background)));

    for (role, light) in [
        (LightRole::Key, &lighting.key),
        (LightRole::Fill, &lighting.fill),
        (LightRole::Rim, &lighting.rim),
    ] {
        spawn_directional(&mut commands, role, light);
    }

    // No hemisphere light in the renderer: a shadowless pair from above and below
    let hemi = &lighting.hemisphere;
    commands.spawn((
        RigLight(LightRole::Hemisphere),
        ViewerOwned,
        DirectionalLight {
            color: rgb(hemi.sky_color),
            illuminance: hemi.sky_illuminance,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(0.0, 10.0, 0.0).looking_at(Vec3::ZERO, Vec3::Z),
    ));
    commands.spawn((
        RigLight(LightRole::Hemisphere),
        ViewerOwned,
        DirectionalLight {
            color: rgb(hemi.ground_color),
            illuminance: hemi.ground_illuminance,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(0.0, -10.0, 0.0).looking_at(Vec3::ZERO, Vec3::Z),
    ));

    debug!("Lighting rig ready");
}

fn spawn_directional(commands: &mut Commands, role: LightRole, light: &DirectionalLightConfig) {
    let [x, y, z] = light.position;
    commands.spawn((
        RigLight(role),
        ViewerOwned,
        DirectionalLight {
            color: rgb(light.color),
            illuminance: light.illuminance,
            shadows_enabled: light.shadows,
            ..default()
        },
        Transform::from_xyz(x, y, z).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}
