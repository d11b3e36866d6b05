//! Fits the anatomical model into a box of the configured size
//!
//! Bounds are gathered from mesh vertices transformed by their node transforms
//! relative to the model root, so the model's own (normalizing) transform never
//! feeds back into the result.

use anatomy_core::{Aabb, Normalization};
use bevy::math::Affine3A;
use bevy::prelude::*;
use tracing::{info, warn};
use bevy::scene::SceneInstanceReady;

use crate::lifecycle::FrameSet;
use crate::loader::{AnatomicalModel, AwaitingNormalization};
use crate::settings::{core_vec3, vec3, ViewerSettings};

pub struct NormalizePlugin;

impl Plugin for NormalizePlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(mark_scene_spawned)
            .add_systems(Update, normalize_model.in_set(FrameSet::Animate));
    }
}

/// The scene spawner finished instantiating the model's scene
#[derive(Component)]
pub struct SceneSpawned;

fn mark_scene_spawned(
    ready: On<SceneInstanceReady>,
    mut commands: Commands,
    models: Query<(), With<AnatomicalModel>>,
) {
    let entity = ready.event_target();
    if models.contains(entity) {
        commands.entity(entity).try_insert(SceneSpawned);
    }
}

/// Some part of the hierarchy has not spawned or loaded yet
struct NotReady;

pub fn normalize_model(
    mut commands: Commands,
    settings: Res<ViewerSettings>,
    mut models: Query<
        (Entity, &mut AnatomicalModel, &mut Transform, &mut Visibility),
        With<AwaitingNormalization>,
    >,
    children_query: Query<&Children>,
    spawned: Query<(), With<SceneSpawned>>,
    locals: Query<&Transform, Without<AnatomicalModel>>,
    mesh_query: Query<&Mesh3d>,
    material_query: Query<&MeshMaterial3d<StandardMaterial>>,
    meshes: Res<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for (entity, mut model, mut transform, mut visibility) in &mut models {
        // A scene root without children is either still spawning or empty
        let childless = mesh_query.get(entity).is_err() && children_query.get(entity).is_err();
        if childless && !spawned.contains(entity) {
            continue;
        }
        let Ok((bounds, mesh_entities)) =
            gather_bounds(entity, &children_query, &locals, &mesh_query, &meshes)
        else {
            continue;
        };

        let target = settings.config.model.target_size;
        let fit = match bounds {
            Some(bounds) => Normalization::fit(bounds, target),
            None => {
                warn!("Model has no geometry; leaving it unscaled");
                Normalization::fit(Aabb::new(Default::default(), Default::default()), target)
            }
        };

        transform.scale = Vec3::splat(fit.scale);
        transform.translation = vec3(fit.translation);
        model.bounds = bounds;
        model.scale = fit.scale;
        model.translation = vec3(fit.translation);

        let opacity = settings.config.model.surface_opacity;
        for mesh_entity in mesh_entities {
            let Ok(handle) = material_query.get(mesh_entity) else {
                continue;
            };
            if let Some(material) = materials.get_mut(&handle.0) {
                material.base_color.set_alpha(opacity);
                material.alpha_mode = AlphaMode::Blend;
            }
        }

        *visibility = Visibility::Inherited;
        commands.entity(entity).remove::<AwaitingNormalization>();
        info!(
            scale = fit.scale,
            fallback = model.origin.is_fallback(),
            "Model normalized"
        );
    }
}

/// Bounds of every mesh below `root` in root space, plus the mesh entities
fn gather_bounds(
    root: Entity,
    children_query: &Query<&Children>,
    locals: &Query<&Transform, Without<AnatomicalModel>>,
    mesh_query: &Query<&Mesh3d>,
    meshes: &Assets<Mesh>,
) -> Result<(Option<Aabb>, Vec<Entity>), NotReady> {
    let mut bounds: Option<Aabb> = None;
    let mut mesh_entities = Vec::new();
    let mut stack = vec![(root, Affine3A::IDENTITY)];

    while let Some((entity, to_root)) = stack.pop() {
        if let Ok(mesh3d) = mesh_query.get(entity) {
            let mesh = meshes.get(&mesh3d.0).ok_or(NotReady)?;
            let positions = mesh
                .attribute(Mesh::ATTRIBUTE_POSITION)
                .and_then(|values| values.as_float3());
            if let Some(positions) = positions {
                for p in positions {
                    let point = core_vec3(to_root.transform_point3(Vec3::from_array(*p)));
                    match bounds.as_mut() {
                        Some(b) => b.extend(point),
                        None => bounds = Some(Aabb::new(point, point)),
                    }
                }
            }
            mesh_entities.push(entity);
        }

        if let Ok(children) = children_query.get(entity) {
            for child in children.iter() {
                let local = locals
                    .get(child)
                    .map(|t| Affine3A::from_scale_rotation_translation(t.scale, t.rotation, t.translation))
                    .unwrap_or(Affine3A::IDENTITY);
                stack.push((child, to_root * local));
            }
        }
    }

    Ok((bounds, mesh_entities))
}
