//! Frame loop ordering, host commands and teardown
//!
//! The lifecycle state machine is shared between the Bevy world and the host
//! handle through an `Arc<Mutex<..>>`, so a host `dispose()` takes effect
//! before the next frame runs instead of waiting for a queued command.

use anatomy_core::lifecycle::aspect_ratio;
use anatomy_core::{Lifecycle, ViewerState};
use bevy::prelude::*;
use tracing::{debug, info, warn};
use bevy::window::PrimaryWindow;
use std::sync::{Arc, Mutex};

use crate::camera::MainCamera;

/// Shared lifecycle state. A poisoned lock reads as disposed.
#[derive(Resource, Clone, Default)]
pub struct ViewerLifecycle(pub Arc<Mutex<Lifecycle>>);

impl ViewerLifecycle {
    pub fn with<R>(&self, f: impl FnOnce(&mut Lifecycle) -> R) -> Option<R> {
        self.0.lock().ok().map(|mut lc| f(&mut lc))
    }

    pub fn state(&self) -> ViewerState {
        self.with(|lc| lc.state()).unwrap_or(ViewerState::Disposed)
    }

    pub fn is_running(&self) -> bool {
        self.state() == ViewerState::Running
    }

    pub fn frames(&self) -> u64 {
        self.with(|lc| lc.frames()).unwrap_or(0)
    }
}

/// Commands sent by the host between frames
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    Resize { width: u32, height: u32 },
}

/// Queue of host commands, drained once per frame
#[derive(Resource, Clone, Default)]
pub struct HostQueue(pub Arc<Mutex<Vec<HostCommand>>>);

impl HostQueue {
    pub fn push(&self, command: HostCommand) {
        if let Ok(mut queue) = self.0.lock() {
            queue.push(command);
        }
    }

    fn drain(&self) -> Vec<HostCommand> {
        self.0
            .lock()
            .map(|mut queue| std::mem::take(&mut *queue))
            .unwrap_or_default()
    }
}

/// Seconds since the viewer started, advanced once per frame
#[derive(Resource, Debug, Default)]
pub struct ViewerClock {
    pub elapsed: f32,
    pub delta: f32,
}

/// Marker for every top-level entity the viewer spawns
#[derive(Component)]
pub struct ViewerOwned;

/// Asset handles created by the viewer, released on teardown
#[derive(Resource, Default)]
pub struct OwnedAssets {
    pub meshes: Vec<Handle<Mesh>>,
    pub materials: Vec<Handle<StandardMaterial>>,
    pub images: Vec<Handle<Image>>,
}

impl OwnedAssets {
    pub fn mesh(&mut self, meshes: &mut Assets<Mesh>, mesh: impl Into<Mesh>) -> Handle<Mesh> {
        let handle = meshes.add(mesh);
        self.meshes.push(handle.clone());
        handle
    }

    pub fn material(
        &mut self,
        materials: &mut Assets<StandardMaterial>,
        material: StandardMaterial,
    ) -> Handle<StandardMaterial> {
        let handle = materials.add(material);
        self.materials.push(handle.clone());
        handle
    }

    pub fn image(&mut self, images: &mut Assets<Image>, image: Image) -> Handle<Image> {
        let handle = images.add(image);
        self.images.push(handle.clone());
        handle
    }

    pub fn len(&self) -> usize {
        self.meshes.len() + self.materials.len() + self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Resource, Default)]
pub struct TeardownState {
    pub done: bool,
}

/// Per-frame stages, in order. Nothing here runs unless the viewer is running.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameSet {
    Clock,
    Input,
    Camera,
    Animate,
    Present,
}

/// Startup stages: `Build` only runs when `Start` left the viewer running
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum StartupSet {
    Start,
    Build,
}

pub struct LifecyclePlugin;

impl Plugin for LifecyclePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ViewerLifecycle>()
            .init_resource::<HostQueue>()
            .init_resource::<ViewerClock>()
            .init_resource::<OwnedAssets>()
            .init_resource::<TeardownState>()
            .configure_sets(
                Startup,
                (
                    StartupSet::Start,
                    StartupSet::Build.run_if(viewer_running),
                )
                    .chain(),
            )
            .configure_sets(
                Update,
                (
                    FrameSet::Clock,
                    FrameSet::Input,
                    FrameSet::Camera,
                    FrameSet::Animate,
                    FrameSet::Present,
                )
                    .chain()
                    .run_if(viewer_running),
            )
            .add_systems(Startup, start_viewer.in_set(StartupSet::Start))
            .add_systems(
                Update,
                (
                    process_host_commands.before(FrameSet::Clock),
                    tick_clock.in_set(FrameSet::Clock),
                    teardown_viewer.run_if(teardown_pending),
                ),
            );
    }
}

pub fn viewer_running(lifecycle: Res<ViewerLifecycle>) -> bool {
    lifecycle.is_running()
}

fn teardown_pending(lifecycle: Res<ViewerLifecycle>, teardown: Res<TeardownState>) -> bool {
    !teardown.done && lifecycle.state() == ViewerState::Disposed
}

fn start_viewer(lifecycle: Res<ViewerLifecycle>) {
    if lifecycle.with(|lc| lc.start()) != Some(true) {
        warn!("Viewer disposed before it started; skipping scene setup");
    }
}

fn tick_clock(lifecycle: Res<ViewerLifecycle>, time: Res<Time>, mut clock: ResMut<ViewerClock>) {
    if lifecycle.with(|lc| lc.begin_frame()) != Some(true) {
        return;
    }
    clock.delta = time.delta_secs();
    clock.elapsed += clock.delta;
}

fn process_host_commands(
    queue: Res<HostQueue>,
    lifecycle: Res<ViewerLifecycle>,
    mut cameras: Query<&mut Projection, With<MainCamera>>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    for command in queue.drain() {
        if !lifecycle.is_running() {
            debug!(?command, "Dropping host command, viewer not running");
            continue;
        }
        match command {
            HostCommand::Resize { width, height } => {
                let Some(aspect) = aspect_ratio(width, height) else {
                    debug!(width, height, "Ignoring resize to an empty viewport");
                    continue;
                };
                for mut projection in &mut cameras {
                    if let Projection::Perspective(perspective) = projection.as_mut() {
                        perspective.aspect_ratio = aspect;
                    }
                }
                for mut window in &mut windows {
                    window.resolution.set(width as f32, height as f32);
                }
                debug!(width, height, aspect, "Viewport resized");
            }
        }
    }
}

fn teardown_viewer(
    mut commands: Commands,
    mut teardown: ResMut<TeardownState>,
    mut owned: ResMut<OwnedAssets>,
    entities: Query<Entity, With<ViewerOwned>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut images: ResMut<Assets<Image>>,
    mut exit: MessageWriter<AppExit>,
) {
    let mut despawned = 0usize;
    for entity in &entities {
        commands.entity(entity).despawn();
        despawned += 1;
    }

    let released = owned.len();
    for handle in owned.meshes.drain(..) {
        meshes.remove(&handle);
    }
    for handle in owned.materials.drain(..) {
        materials.remove(&handle);
    }
    for handle in owned.images.drain(..) {
        images.remove(&handle);
    }

    commands.remove_resource::<crate::loader::PendingModel>();
    teardown.done = true;
    info!(despawned, released, "Viewer torn down");
    exit.write(AppExit::Success);
}
