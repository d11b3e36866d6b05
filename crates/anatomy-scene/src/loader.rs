//! Anatomical asset loading with fallback geometry
//!
//! The glTF is requested from the `AssetServer` and polled every frame. Its
//! resolution (loaded scene or error) is published as a [`ModelLoadResolved`]
//! message carrying the load ticket; [`apply_model_load`] is the only system
//! that turns a resolution into scene entities, and it does so at most once.

use anatomy_core::{AssetError, FallbackTorus, LoadTicket, ModelOrigin};
use bevy::asset::{AssetLoadError, LoadState};
use bevy::gltf::Gltf;
use bevy::prelude::*;
use tracing::{debug, info, warn};

use crate::lifecycle::{OwnedAssets, StartupSet, ViewerLifecycle, ViewerOwned};
use crate::settings::ViewerSettings;

/// Where the anatomical model comes from
#[derive(Resource, Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// Load a glTF/GLB through the asset server
    AssetServer(String),
    /// Resolution is delivered from outside as a [`ModelLoadResolved`] message
    External,
}

#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Loaded { path: String, scene: Handle<Scene> },
    Failed(AssetError),
}

/// Result of the one model load issued per viewer
#[derive(Message, Debug, Clone)]
pub struct ModelLoadResolved {
    pub ticket: LoadTicket,
    pub outcome: LoadOutcome,
}

/// Ticket of the load issued at startup
#[derive(Resource, Debug, Default)]
pub struct ModelLoadTicket(pub Option<LoadTicket>);

/// In-flight glTF load
#[derive(Resource)]
pub struct PendingModel {
    pub path: String,
    pub handle: Handle<Gltf>,
    pub ticket: LoadTicket,
}

/// Guards the single model slot of the scene
#[derive(Resource, Debug, Default)]
pub struct ModelSlot {
    pub filled: bool,
}

/// Rotated by the idle sway; parent of the model root
#[derive(Component)]
pub struct AnatomyPivot;

/// Root of the anatomical mesh hierarchy
#[derive(Component, Debug)]
pub struct AnatomicalModel {
    pub origin: ModelOrigin,
    /// Raw bounds, set once normalization ran
    pub bounds: Option<anatomy_core::Aabb>,
    pub scale: f32,
    pub translation: Vec3,
}

/// Present until the normalizer has fitted the model
#[derive(Component)]
pub struct AwaitingNormalization;

/// Marks the torus substituted for a failed load
#[derive(Component)]
pub struct FallbackShape;

pub struct LoaderPlugin;

impl Plugin for LoaderPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ModelLoadResolved>()
            .init_resource::<ModelLoadTicket>()
            .init_resource::<ModelSlot>()
            .add_systems(Startup, begin_model_load.in_set(StartupSet::Build))
            .add_systems(
                Update,
                (poll_model_load, apply_model_load)
                    .chain()
                    .before(crate::lifecycle::FrameSet::Clock),
            );
    }
}

fn begin_model_load(
    mut commands: Commands,
    source: Res<ModelSource>,
    lifecycle: Res<ViewerLifecycle>,
    asset_server: Res<AssetServer>,
    mut ticket_slot: ResMut<ModelLoadTicket>,
) {
    let Some(ticket) = lifecycle.with(|lc| lc.issue_ticket()).flatten() else {
        return;
    };
    ticket_slot.0 = Some(ticket);

    match source.as_ref() {
        ModelSource::AssetServer(path) => {
            info!("Loading anatomical model: {}", path);
            let handle: Handle<Gltf> = asset_server.load(path.clone());
            commands.insert_resource(PendingModel {
                path: path.clone(),
                handle,
                ticket,
            });
        }
        ModelSource::External => {
            debug!("Model load delegated to the host");
        }
    }
}

/// Check loading state and turn the glTF into a scene or an error
fn poll_model_load(
    mut commands: Commands,
    pending: Option<Res<PendingModel>>,
    asset_server: Res<AssetServer>,
    gltf_assets: Res<Assets<Gltf>>,
    mut resolved: MessageWriter<ModelLoadResolved>,
) {
    let Some(pending) = pending else {
        return;
    };

    let outcome = match asset_server.get_load_state(pending.handle.id()) {
        Some(LoadState::Loaded) => match gltf_assets.get(&pending.handle) {
            Some(gltf) => scene_outcome(&pending.path, gltf.default_scene.as_ref(), &gltf.scenes),
            None => scene_outcome(&pending.path, None, &[]),
        },
        Some(LoadState::Failed(err)) => LoadOutcome::Failed(classify_load_error(&pending.path, &err)),
        None => LoadOutcome::Failed(AssetError::Fetch {
            path: pending.path.clone(),
            reason: "load was never started".to_string(),
        }),
        _ => return, // Still loading
    };

    resolved.write(ModelLoadResolved {
        ticket: pending.ticket,
        outcome,
    });
    commands.remove_resource::<PendingModel>();
}

/// The default scene of a loaded glTF, else its first scene
fn scene_outcome(
    path: &str,
    default_scene: Option<&Handle<Scene>>,
    scenes: &[Handle<Scene>],
) -> LoadOutcome {
    match default_scene.or(scenes.first()) {
        Some(scene) => LoadOutcome::Loaded {
            path: path.to_string(),
            scene: scene.clone(),
        },
        None => LoadOutcome::Failed(AssetError::NoScene(path.to_string())),
    }
}

/// Reader and source errors mean the bytes never arrived; the rest is parsing
fn classify_load_error(path: &str, err: &AssetLoadError) -> AssetError {
    match err {
        AssetLoadError::AssetReaderError(_) | AssetLoadError::MissingAssetSourceError(_) => {
            AssetError::Fetch {
                path: path.to_string(),
                reason: err.to_string(),
            }
        }
        other => AssetError::Parse {
            path: path.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Spawn the loaded scene, or the fallback torus, under a fresh pivot
pub fn apply_model_load(
    mut commands: Commands,
    mut resolved: MessageReader<ModelLoadResolved>,
    lifecycle: Res<ViewerLifecycle>,
    settings: Res<ViewerSettings>,
    mut slot: ResMut<ModelSlot>,
    mut owned: ResMut<OwnedAssets>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for message in resolved.read() {
        if lifecycle.with(|lc| lc.accepts(message.ticket)) != Some(true) {
            debug!("Discarding stale model load resolution");
            continue;
        }
        if slot.filled {
            warn!("Model already resolved; ignoring duplicate resolution");
            continue;
        }
        slot.filled = true;

        let pivot = commands
            .spawn((
                AnatomyPivot,
                ViewerOwned,
                Transform::default(),
                Visibility::default(),
            ))
            .id();

        match &message.outcome {
            LoadOutcome::Loaded { path, scene } => {
                info!("Anatomical model loaded: {}", path);
                commands.spawn((
                    AnatomicalModel::new(ModelOrigin::Asset { path: path.clone() }),
                    AwaitingNormalization,
                    SceneRoot(scene.clone()),
                    Transform::default(),
                    Visibility::Hidden,
                    ChildOf(pivot),
                ));
            }
            LoadOutcome::Failed(error) => {
                warn!("{}; using fallback geometry", error);
                let (mesh, material) =
                    fallback_assets(&settings.config.fallback, &mut owned, &mut meshes, &mut materials);
                commands.spawn((
                    AnatomicalModel::new(ModelOrigin::Fallback {
                        error: error.clone(),
                    }),
                    AwaitingNormalization,
                    FallbackShape,
                    Mesh3d(mesh),
                    MeshMaterial3d(material),
                    Transform::default(),
                    Visibility::Hidden,
                    ChildOf(pivot),
                ));
            }
        }
    }
}

impl AnatomicalModel {
    fn new(origin: ModelOrigin) -> Self {
        Self {
            origin,
            bounds: None,
            scale: 1.0,
            translation: Vec3::ZERO,
        }
    }
}

fn fallback_assets(
    torus: &FallbackTorus,
    owned: &mut OwnedAssets,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) -> (Handle<Mesh>, Handle<StandardMaterial>) {
    let [r, g, b] = torus.color;
    let mesh = owned.mesh(
        meshes,
        Torus {
            minor_radius: torus.minor_radius,
            major_radius: torus.major_radius,
        },
    );
    let material = owned.material(
        materials,
        StandardMaterial {
            base_color: Color::srgb(r, g, b),
            metallic: torus.metallic,
            perceptual_roughness: torus.roughness,
            ..default()
        },
    );
    (mesh, material)
}
