//! Diagnostic marker: core, pulse ring, glow halo, pointer line and label

use anatomy_core::location;
use anatomy_core::{LabelBitmap, LabelRasterizer, LocationCode, MarkerFrame, MarkerLayout};
use bevy::asset::{LoadState, RenderAssetUsages};
use bevy::prelude::*;
use tracing::{debug, info, warn};
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::text::Font;

use crate::camera::MainCamera;
use crate::lifecycle::{FrameSet, OwnedAssets, StartupSet, ViewerClock, ViewerOwned};
use crate::settings::{rgb, vec3, ViewerSettings};

/// Group entity placed at the location entry's position
#[derive(Component, Debug)]
pub struct DiagnosticMarker {
    pub code: LocationCode,
    pub label: String,
}

#[derive(Component, Debug)]
pub struct MarkerCore {
    pub base_emissive: LinearRgba,
    pub emissive_intensity: f32,
}

#[derive(Component, Debug)]
pub struct PulseRing {
    pub opacity: f32,
}

#[derive(Component)]
pub struct GlowHalo;

#[derive(Component)]
pub struct PointerLine;

/// Camera-facing quad showing the rasterized label
#[derive(Component, Debug)]
pub struct LabelBillboard {
    pub text: String,
    pub image: Handle<Image>,
}

/// Font requested for label glyphs, applied once it loads
#[derive(Resource, Default)]
pub struct LabelFont {
    pub handle: Option<Handle<Font>>,
    pub applied: bool,
}

pub struct MarkerPlugin;

impl Plugin for MarkerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LabelFont>()
            .add_systems(Startup, compose_marker.in_set(StartupSet::Build))
            .add_systems(Update, animate_marker.in_set(FrameSet::Animate))
            .add_systems(
                Update,
                (apply_label_font, face_camera).in_set(FrameSet::Present),
            );
    }
}

fn compose_marker(
    mut commands: Commands,
    settings: Res<ViewerSettings>,
    asset_server: Res<AssetServer>,
    mut label_font: ResMut<LabelFont>,
    mut owned: ResMut<OwnedAssets>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut images: ResMut<Assets<Image>>,
) {
    let Some(code) = settings.code else {
        info!("No location code; showing the model without a marker");
        return;
    };
    let Some(entry) = location::map(code) else {
        info!("Unknown location code {}; no marker", code);
        return;
    };

    let cfg = &settings.config.marker;
    let layout = MarkerLayout::new(
        entry.position,
        anatomy_core::Vec3::from_array(cfg.pointer_offset),
        cfg.ring_lift,
    );

    // Core
    let base_emissive = LinearRgba::from(rgb(cfg.emissive_color));
    let rest = MarkerFrame::at(0.0);
    let core_mesh = owned.mesh(&mut meshes, Sphere::new(cfg.core_radius));
    let core_material = owned.material(
        &mut materials,
        StandardMaterial {
            base_color: rgb(cfg.core_color),
            emissive: scale_emissive(base_emissive, rest.emissive_intensity),
            ..default()
        },
    );

    // Pulse ring
    let ring_mesh = owned.mesh(
        &mut meshes,
        Annulus::new(cfg.ring_inner_radius, cfg.ring_outer_radius),
    );
    let ring_material = owned.material(
        &mut materials,
        translucent(rgb(cfg.ring_color).with_alpha(rest.ring_opacity)),
    );

    // Glow halo
    let halo_mesh = owned.mesh(&mut meshes, Sphere::new(cfg.halo_radius));
    let halo_material = owned.material(
        &mut materials,
        translucent(rgb(cfg.halo_color).with_alpha(cfg.halo_opacity)),
    );

    // Pointer line
    let pointer_mesh = owned.mesh(
        &mut meshes,
        Cylinder::new(cfg.pointer_thickness, layout.pointer_length()),
    );
    let pointer_material = owned.material(
        &mut materials,
        StandardMaterial {
            base_color: rgb(cfg.pointer_color),
            unlit: true,
            ..default()
        },
    );

    // Label
    let style = &settings.config.label.style;
    let bitmap = match LabelRasterizer::new().render(entry.label, style) {
        Ok(bitmap) => bitmap,
        Err(err) => {
            warn!("Failed to rasterize label: {}", err);
            LabelBitmap {
                width: 1,
                height: 1,
                pixels: vec![0; 4],
            }
        }
    };
    let label_height = cfg.label_world_width / bitmap.aspect();
    let label_texture = owned.image(&mut images, label_image(bitmap));
    let label_mesh = owned.mesh(
        &mut meshes,
        Rectangle::new(cfg.label_world_width, label_height),
    );
    let label_material = owned.material(
        &mut materials,
        StandardMaterial {
            base_color_texture: Some(label_texture.clone()),
            ..translucent(Color::WHITE)
        },
    );

    if let Some(path) = &settings.config.label.font_path {
        label_font.handle = Some(asset_server.load(path.clone()));
    }

    commands
        .spawn((
            DiagnosticMarker {
                code,
                label: entry.label.to_string(),
            },
            ViewerOwned,
            Transform::from_translation(vec3(layout.position)),
            Visibility::default(),
        ))
        .with_children(|group| {
            group.spawn((
                MarkerCore {
                    base_emissive,
                    emissive_intensity: rest.emissive_intensity,
                },
                Mesh3d(core_mesh),
                MeshMaterial3d(core_material),
                Transform::default(),
            ));
            group.spawn((
                PulseRing {
                    opacity: rest.ring_opacity,
                },
                Mesh3d(ring_mesh),
                MeshMaterial3d(ring_material),
                Transform::from_translation(vec3(layout.ring_offset))
                    .with_rotation(quat(layout.ring_rotation())),
            ));
            group.spawn((
                GlowHalo,
                Mesh3d(halo_mesh),
                MeshMaterial3d(halo_material),
                Transform::default(),
            ));
            group.spawn((
                PointerLine,
                Mesh3d(pointer_mesh),
                MeshMaterial3d(pointer_material),
                Transform::from_translation(vec3(layout.pointer_midpoint()))
                    .with_rotation(quat(layout.pointer_rotation())),
            ));
            group.spawn((
                LabelBillboard {
                    text: entry.label.to_string(),
                    image: label_texture,
                },
                Mesh3d(label_mesh),
                MeshMaterial3d(label_material),
                Transform::from_translation(vec3(layout.pointer_end)),
            ));
        });

    info!(
        code = code.0,
        label = entry.label,
        "Marker placed at ({:.2}, {:.2}, {:.2})",
        entry.position.x,
        entry.position.y,
        entry.position.z
    );
}

/// Unlit, alpha-blended, double-sided surface
fn translucent(color: Color) -> StandardMaterial {
    StandardMaterial {
        base_color: color,
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        cull_mode: None,
        ..default()
    }
}

fn quat(q: anatomy_core::Quat) -> Quat {
    Quat::from_array(q.to_array())
}

fn scale_emissive(base: LinearRgba, intensity: f32) -> LinearRgba {
    LinearRgba::rgb(base.red * intensity, base.green * intensity, base.blue * intensity)
}

fn label_image(bitmap: LabelBitmap) -> Image {
    Image::new(
        Extent3d {
            width: bitmap.width,
            height: bitmap.height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        bitmap.pixels,
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    )
}

pub fn animate_marker(
    clock: Res<ViewerClock>,
    mut cores: Query<(&mut Transform, &mut MarkerCore, &MeshMaterial3d<StandardMaterial>)>,
    mut rings: Query<
        (&mut Transform, &mut PulseRing, &MeshMaterial3d<StandardMaterial>),
        Without<MarkerCore>,
    >,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let frame = MarkerFrame::at(clock.elapsed);

    for (mut transform, mut core, material) in &mut cores {
        transform.scale = Vec3::splat(frame.core_scale);
        core.emissive_intensity = frame.emissive_intensity;
        if let Some(material) = materials.get_mut(&material.0) {
            material.emissive = scale_emissive(core.base_emissive, frame.emissive_intensity);
        }
    }

    for (mut transform, mut ring, material) in &mut rings {
        transform.scale = Vec3::splat(frame.ring_scale);
        ring.opacity = frame.ring_opacity;
        if let Some(material) = materials.get_mut(&material.0) {
            material.base_color.set_alpha(frame.ring_opacity.clamp(0.0, 1.0));
        }
    }
}

/// Re-rasterize labels in place once the configured font has loaded
fn apply_label_font(
    settings: Res<ViewerSettings>,
    asset_server: Res<AssetServer>,
    fonts: Res<Assets<Font>>,
    mut label_font: ResMut<LabelFont>,
    labels: Query<&LabelBillboard>,
    mut images: ResMut<Assets<Image>>,
) {
    if label_font.applied {
        return;
    }
    let Some(handle) = label_font.handle.clone() else {
        return;
    };

    if let Some(LoadState::Failed(err)) = asset_server.get_load_state(handle.id()) {
        warn!("Label font failed to load, keeping plain labels: {}", err);
        label_font.applied = true;
        return;
    }
    let Some(font) = fonts.get(&handle) else {
        return;
    };
    label_font.applied = true;

    let rasterizer = match LabelRasterizer::with_font_bytes(font.data.as_ref().clone()) {
        Ok(rasterizer) => rasterizer,
        Err(err) => {
            warn!("Label font unusable: {}", err);
            return;
        }
    };

    let style = &settings.config.label.style;
    for label in &labels {
        match rasterizer.render(&label.text, style) {
            Ok(bitmap) => {
                if let Some(image) = images.get_mut(&label.image) {
                    *image = label_image(bitmap);
                }
            }
            Err(err) => warn!("Failed to rasterize label: {}", err),
        }
    }
    debug!("Label glyphs applied");
}

/// Keep billboards facing the camera
fn face_camera(
    cameras: Query<&Transform, (With<MainCamera>, Without<LabelBillboard>)>,
    mut billboards: Query<&mut Transform, With<LabelBillboard>>,
) {
    let Ok(camera) = cameras.single() else {
        return;
    };
    for mut transform in &mut billboards {
        transform.rotation = camera.rotation;
    }
}
