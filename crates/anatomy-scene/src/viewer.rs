//! Viewer handle: builds the Bevy app and exposes the host controls
//!
//! A [`Viewer`] owns the app until it is run; a [`ViewerLink`] is a cheap,
//! cloneable handle the host keeps for `resize` and `dispose` afterwards.

use anatomy_core::lifecycle::aspect_ratio;
use anatomy_core::{Lifecycle, LocationCode, ViewerConfig, ViewerState};
use bevy::asset::AssetMetaCheck;
use bevy::gltf::Gltf;
use bevy::input::InputPlugin;
use bevy::prelude::*;
use tracing::{debug};
use bevy::text::Font;
use bevy::time::TimeUpdateStrategy;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::lifecycle::{HostCommand, HostQueue, ViewerLifecycle};
use crate::loader::ModelSource;
use crate::settings::ViewerSettings;
use crate::AnatomyScenePlugin;

/// Everything needed to create a viewer
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    /// CSS selector of the target canvas (web only)
    pub canvas: Option<String>,
    pub model: ModelSource,
    pub code: Option<LocationCode>,
    pub config: ViewerConfig,
}

impl ViewerOptions {
    /// Options for an asset path and code with the default configuration
    pub fn new(asset_path: impl Into<String>, code: Option<LocationCode>) -> Self {
        Self {
            canvas: None,
            model: ModelSource::AssetServer(asset_path.into()),
            code,
            config: ViewerConfig::default(),
        }
    }

    pub fn with_config(config: ViewerConfig, code: Option<LocationCode>) -> Self {
        Self {
            canvas: None,
            model: ModelSource::AssetServer(config.model.asset_path.clone()),
            code,
            config,
        }
    }
}

/// Host-side controls of a running viewer
#[derive(Clone)]
pub struct ViewerLink {
    lifecycle: ViewerLifecycle,
    queue: HostQueue,
}

impl ViewerLink {
    fn new() -> Self {
        Self {
            lifecycle: ViewerLifecycle(Arc::new(Mutex::new(Lifecycle::new()))),
            queue: HostQueue(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Request a viewport of `width` x `height` pixels. Ignored unless the
    /// viewer is running or when either side is zero.
    pub fn resize(&self, width: u32, height: u32) -> bool {
        if !self.lifecycle.is_running() {
            debug!(width, height, state = self.state().as_str(), "Resize ignored");
            return false;
        }
        if aspect_ratio(width, height).is_none() {
            debug!(width, height, "Resize to an empty viewport ignored");
            return false;
        }
        self.queue.push(HostCommand::Resize { width, height });
        true
    }

    /// Stop the viewer. Safe to call repeatedly; only the first call counts.
    pub fn dispose(&self) -> bool {
        self.lifecycle.with(|lc| lc.dispose()).unwrap_or(false)
    }

    pub fn state(&self) -> ViewerState {
        self.lifecycle.state()
    }

    /// Number of frames that ran while the viewer was running
    pub fn frames(&self) -> u64 {
        self.lifecycle.frames()
    }
}

/// Owning handle of a viewer app. Disposes the viewer when dropped before
/// it was handed to the runner.
pub struct Viewer {
    app: Option<App>,
    link: ViewerLink,
}

impl Viewer {
    /// Build a windowed viewer and run it. Returns the host link; on native
    /// targets this only returns after the window closed.
    pub fn create(options: ViewerOptions) -> ViewerLink {
        let viewer = Self::build(options);
        let link = viewer.link();
        let exit = viewer.run();
        debug!(?exit, "Viewer runner returned");
        link
    }

    /// Windowed viewer rendering into the configured canvas
    pub fn build(options: ViewerOptions) -> Self {
        let mut app = App::new();
        app.add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Anatomy Viewer".to_string(),
                        canvas: options.canvas.clone(),
                        fit_canvas_to_parent: true,
                        prevent_default_event_handling: true,
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    // Paths are relative to the page (web) or working directory (native)
                    file_path: "".to_string(),
                    // Static hosting has no .meta files
                    meta_check: AssetMetaCheck::Never,
                    ..default()
                }),
        );
        Self::assemble(app, options)
    }

    /// Viewer without window or renderer, driven by [`Viewer::update`]
    pub fn headless(options: ViewerOptions) -> Self {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default(), InputPlugin))
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
                1.0 / 60.0,
            )))
            .init_asset::<Mesh>()
            .init_asset::<StandardMaterial>()
            .init_asset::<Image>()
            .init_asset::<Scene>()
            .init_asset::<Gltf>()
            .init_asset::<Font>();
        Self::assemble(app, options)
    }

    fn assemble(mut app: App, options: ViewerOptions) -> Self {
        let link = ViewerLink::new();
        app.insert_resource(link.lifecycle.clone())
            .insert_resource(link.queue.clone())
            .add_plugins(AnatomyScenePlugin {
                settings: ViewerSettings {
                    config: options.config,
                    code: options.code,
                },
                source: options.model,
            });
        Self {
            app: Some(app),
            link,
        }
    }

    pub fn link(&self) -> ViewerLink {
        self.link.clone()
    }

    pub fn app(&self) -> Option<&App> {
        self.app.as_ref()
    }

    pub fn app_mut(&mut self) -> Option<&mut App> {
        self.app.as_mut()
    }

    /// Run one frame
    pub fn update(&mut self) {
        if let Some(app) = self.app.as_mut() {
            app.update();
        }
    }

    /// Hand the app to its runner
    pub fn run(mut self) -> AppExit {
        match self.app.take() {
            Some(mut app) => app.run(),
            None => AppExit::Success,
        }
    }

    pub fn dispose(&self) -> bool {
        self.link.dispose()
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        if self.app.is_some() {
            self.link.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraController, MainCamera};
    use crate::lifecycle::{OwnedAssets, ViewerClock, ViewerOwned};
    use crate::lighting::{LightRole, RigLight};
    use crate::loader::{
        AnatomicalModel, AnatomyPivot, AwaitingNormalization, FallbackShape, LoadOutcome,
        ModelLoadResolved, ModelLoadTicket, PendingModel,
    };
    use crate::marker::{DiagnosticMarker, LabelBillboard, LabelFont, MarkerCore, PulseRing};
    use anatomy_core::label::DEFAULT_FONT;
    use anatomy_core::{marker, AssetError, LabelRasterizer, LabelStyle, ModelOrigin, Normalization};
    use bevy::input::mouse::MouseMotion;

    fn viewer(code: Option<u32>) -> Viewer {
        let options = ViewerOptions {
            canvas: None,
            model: ModelSource::External,
            code: code.map(LocationCode),
            config: ViewerConfig::default(),
        };
        Viewer::headless(options)
    }

    fn world(viewer: &mut Viewer) -> &mut World {
        viewer.app_mut().unwrap().world_mut()
    }

    fn count<C: Component>(viewer: &mut Viewer) -> usize {
        let world = world(viewer);
        world.query_filtered::<Entity, With<C>>().iter(world).count()
    }

    fn fail_load(viewer: &mut Viewer) {
        let world = world(viewer);
        let ticket = world.resource::<ModelLoadTicket>().0.unwrap();
        world.write_message(ModelLoadResolved {
            ticket,
            outcome: LoadOutcome::Failed(AssetError::Fetch {
                path: "models/thyroid.glb".into(),
                reason: "404 Not Found".into(),
            }),
        });
    }

    /// Update until `done` holds, giving the asset IO threads time to finish
    fn update_until(viewer: &mut Viewer, mut done: impl FnMut(&mut Viewer) -> bool) -> bool {
        for _ in 0..500 {
            viewer.update();
            if done(viewer) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    fn fallback_error(viewer: &mut Viewer) -> AssetError {
        let world = world(viewer);
        let mut models = world.query::<&AnatomicalModel>();
        match &models.single(world).unwrap().origin {
            ModelOrigin::Fallback { error } => error.clone(),
            other => panic!("expected a fallback model, got {other:?}"),
        }
    }

    fn elapsed(viewer: &mut Viewer) -> f32 {
        world(viewer).resource::<ViewerClock>().elapsed
    }

    #[test]
    fn test_unknown_code_has_no_marker() {
        for code in [Some(0), Some(9), Some(4242), None] {
            let mut viewer = viewer(code);
            viewer.update();
            viewer.update();
            assert_eq!(viewer.link().state(), ViewerState::Running);
            assert_eq!(count::<DiagnosticMarker>(&mut viewer), 0);
            assert_eq!(count::<MarkerCore>(&mut viewer), 0);
            assert_eq!(count::<LabelBillboard>(&mut viewer), 0);
        }
    }

    #[test]
    fn test_marker_for_code_one() {
        let mut viewer = viewer(Some(1));
        viewer.update();

        let world = world(&mut viewer);
        let mut markers = world.query::<(&DiagnosticMarker, &Transform, &Children)>();
        let (marker, transform, children) = markers.single(world).unwrap();
        assert_eq!(marker.label, "Thyroid Center");
        assert_eq!(transform.translation, Vec3::new(-0.40, -0.50, 0.30));
        assert_eq!(children.len(), 5);

        let mut labels = world.query::<(&LabelBillboard, &Transform)>();
        let (label, label_transform) = labels.single(world).unwrap();
        assert_eq!(label.text, "Thyroid Center");
        // Label anchored at the end of the pointer line
        assert!((label_transform.translation - Vec3::new(0.5, 0.4, 0.3)).length() < 1e-6);
        let image = world.resource::<Assets<Image>>().get(&label.image).unwrap();
        assert_eq!(image.width(), 256);
        assert_eq!(image.height(), 64);
    }

    #[test]
    fn test_failed_load_builds_one_normalized_fallback() {
        let mut viewer = viewer(Some(1));
        viewer.update();
        fail_load(&mut viewer);
        viewer.update();
        viewer.update();

        assert_eq!(count::<FallbackShape>(&mut viewer), 1);
        assert_eq!(count::<AnatomicalModel>(&mut viewer), 1);
        assert_eq!(count::<AwaitingNormalization>(&mut viewer), 0);
        assert_eq!(count::<DiagnosticMarker>(&mut viewer), 1);

        let world = world(&mut viewer);
        let mut models = world.query::<(&AnatomicalModel, &Transform, &Visibility)>();
        let (model, transform, visibility) = models.single(world).unwrap();
        assert!(model.origin.is_fallback());
        assert_eq!(*visibility, Visibility::Inherited);

        let bounds = model.bounds.unwrap();
        let out = Normalization::fit(bounds, 2.0).normalized_bounds();
        assert!((out.max_dimension() - 2.0).abs() < 1e-4);
        assert!(out.center().length() < 1e-4);
        assert!((transform.scale.x - model.scale).abs() < 1e-6);
        // Torus is about 2.8 across before scaling
        assert!((model.scale - 2.0 / 2.8).abs() < 1e-2);
    }

    #[test]
    fn test_duplicate_resolution_is_ignored() {
        let mut viewer = viewer(None);
        viewer.update();
        fail_load(&mut viewer);
        fail_load(&mut viewer);
        viewer.update();
        viewer.update();
        assert_eq!(count::<AnatomicalModel>(&mut viewer), 1);
        assert_eq!(count::<AnatomyPivot>(&mut viewer), 1);
    }

    #[test]
    fn test_marker_animation_follows_clock() {
        let mut viewer = viewer(Some(3));
        for _ in 0..20 {
            viewer.update();
        }
        let t = elapsed(&mut viewer);
        assert!(t > 0.0);

        let world = world(&mut viewer);
        let mut cores = world.query::<(&MarkerCore, &Transform)>();
        let (core, transform) = cores.single(world).unwrap();
        assert!((core.emissive_intensity - marker::core_emissive_intensity(t)).abs() < 1e-6);
        assert!((transform.scale.x - marker::core_scale(t)).abs() < 1e-6);

        let mut rings = world.query::<(&PulseRing, &Transform, &MeshMaterial3d<StandardMaterial>)>();
        let (ring, transform, material) = rings.single(world).unwrap();
        assert!((ring.opacity - marker::ring_opacity(t)).abs() < 1e-6);
        assert!((transform.scale.x - marker::ring_scale(t)).abs() < 1e-6);
        let handle = material.0.clone();
        let alpha = world
            .resource::<Assets<StandardMaterial>>()
            .get(&handle)
            .unwrap()
            .base_color
            .alpha();
        assert!((alpha - marker::ring_opacity(t)).abs() < 1e-5);
    }

    #[test]
    fn test_light_rig() {
        let mut viewer = viewer(None);
        viewer.update();

        let world = world(&mut viewer);
        let roles: Vec<LightRole> = world
            .query::<&RigLight>()
            .iter(world)
            .map(|light| light.0)
            .collect();
        assert_eq!(roles.len(), 5);
        for (role, expected) in [
            (LightRole::Key, 1),
            (LightRole::Fill, 1),
            (LightRole::Rim, 1),
            (LightRole::Hemisphere, 2),
        ] {
            assert_eq!(roles.iter().filter(|r| **r == role).count(), expected);
        }
        assert!(world.get_resource::<AmbientLight>().is_some());
    }

    #[test]
    fn test_dispose_tears_down_and_stops_frames() {
        let mut viewer = viewer(Some(1));
        let link = viewer.link();
        viewer.update();
        fail_load(&mut viewer);
        viewer.update();
        viewer.update();
        assert!(count::<ViewerOwned>(&mut viewer) > 0);

        assert!(link.dispose());
        assert!(!link.dispose());
        let frames = link.frames();
        let clock = elapsed(&mut viewer);

        viewer.update();
        viewer.update();

        assert_eq!(link.state(), ViewerState::Disposed);
        assert_eq!(link.frames(), frames);
        assert_eq!(elapsed(&mut viewer), clock);
        assert_eq!(count::<ViewerOwned>(&mut viewer), 0);
        assert_eq!(count::<AnatomicalModel>(&mut viewer), 0);
        assert_eq!(count::<MarkerCore>(&mut viewer), 0);

        let world = world(&mut viewer);
        assert!(world.resource::<OwnedAssets>().is_empty());
        assert_eq!(world.resource::<Assets<Mesh>>().len(), 0);
        assert_eq!(world.resource::<Assets<Image>>().len(), 0);
    }

    #[test]
    fn test_late_load_after_dispose_is_noop() {
        let mut viewer = viewer(Some(1));
        let link = viewer.link();
        viewer.update();
        link.dispose();
        viewer.update();

        fail_load(&mut viewer);
        viewer.update();
        viewer.update();

        assert_eq!(count::<AnatomicalModel>(&mut viewer), 0);
        assert_eq!(count::<FallbackShape>(&mut viewer), 0);
        assert_eq!(count::<ViewerOwned>(&mut viewer), 0);
    }

    #[test]
    fn test_resize_updates_aspect_and_keeps_orbit() {
        let mut viewer = viewer(Some(1));
        let link = viewer.link();
        viewer.update();

        // Drag to a custom angle
        {
            let world = world(&mut viewer);
            world
                .resource_mut::<ButtonInput<MouseButton>>()
                .press(MouseButton::Left);
            world.write_message(MouseMotion {
                delta: Vec2::new(-150.0, 40.0),
            });
        }
        viewer.update();
        world(&mut viewer)
            .resource_mut::<ButtonInput<MouseButton>>()
            .release(MouseButton::Left);
        viewer.update();

        let before = world(&mut viewer).resource::<CameraController>().0.clone();
        assert!(before.target_azimuth > 0.0);

        assert!(link.resize(800, 400));
        viewer.update();

        let world = world(&mut viewer);
        let after = &world.resource::<CameraController>().0;
        assert_eq!(after.target_azimuth, before.target_azimuth);
        assert_eq!(after.target_polar, before.target_polar);
        assert_eq!(after.target_distance, before.target_distance);

        let mut projections = world.query_filtered::<&Projection, With<MainCamera>>();
        match projections.single(world).unwrap() {
            Projection::Perspective(p) => assert_eq!(p.aspect_ratio, 2.0),
            other => panic!("unexpected projection {other:?}"),
        }
    }

    #[test]
    fn test_resize_outside_running_is_noop() {
        let mut viewer = viewer(Some(1));
        let link = viewer.link();
        assert_eq!(link.state(), ViewerState::Uninitialized);
        assert!(!link.resize(800, 600));

        viewer.update();
        assert!(!link.resize(800, 0));
        assert!(link.resize(1024, 768));

        link.dispose();
        assert!(!link.resize(640, 480));
    }

    #[test]
    fn test_idle_sway_holds_while_dragging() {
        let mut viewer = viewer(None);
        viewer.update();
        fail_load(&mut viewer);
        for _ in 0..30 {
            viewer.update();
        }

        let t = elapsed(&mut viewer);
        let expected = Quat::from_rotation_y((t * 0.3).sin() * 0.1);
        let pivot = pivot_rotation(&mut viewer);
        assert!(pivot.angle_between(expected) < 1e-4);

        world(&mut viewer)
            .resource_mut::<ButtonInput<MouseButton>>()
            .press(MouseButton::Left);
        viewer.update();
        let held = pivot_rotation(&mut viewer);
        for _ in 0..30 {
            viewer.update();
            assert!(pivot_rotation(&mut viewer).angle_between(held) < 1e-6);
        }
    }

    fn pivot_rotation(viewer: &mut Viewer) -> Quat {
        let world = world(viewer);
        world
            .query_filtered::<&Transform, With<AnatomyPivot>>()
            .single(world)
            .unwrap()
            .rotation
    }

    #[test]
    fn test_drop_disposes() {
        let mut viewer = viewer(Some(1));
        let link = viewer.link();
        viewer.update();
        assert_eq!(link.state(), ViewerState::Running);
        drop(viewer);
        assert_eq!(link.state(), ViewerState::Disposed);
    }

    #[test]
    fn test_frames_count_while_running() {
        let mut viewer = viewer(None);
        let link = viewer.link();
        for _ in 0..10 {
            viewer.update();
        }
        assert_eq!(link.frames(), 10);
    }

    #[test]
    fn test_missing_asset_falls_back_through_asset_server() {
        let mut viewer = Viewer::headless(ViewerOptions::new(
            "models/missing.glb",
            Some(LocationCode(1)),
        ));
        viewer.update();
        assert!(world(&mut viewer).get_resource::<PendingModel>().is_some());

        assert!(update_until(&mut viewer, |v| count::<FallbackShape>(v) > 0));
        for _ in 0..3 {
            viewer.update();
        }

        assert_eq!(count::<FallbackShape>(&mut viewer), 1);
        assert_eq!(count::<AnatomicalModel>(&mut viewer), 1);
        assert_eq!(count::<AwaitingNormalization>(&mut viewer), 0);
        assert_eq!(count::<DiagnosticMarker>(&mut viewer), 1);
        assert!(world(&mut viewer).get_resource::<PendingModel>().is_none());

        let error = fallback_error(&mut viewer);
        assert_eq!(error.path(), "models/missing.glb");
        assert!(matches!(error, AssetError::Fetch { .. } | AssetError::Parse { .. }));
    }

    #[test]
    fn test_untracked_load_is_a_fetch_failure() {
        let mut viewer = viewer(None);
        viewer.update();
        {
            let world = world(&mut viewer);
            let ticket = world.resource::<ModelLoadTicket>().0.unwrap();
            world.insert_resource(PendingModel {
                path: "models/thyroid.glb".into(),
                handle: Handle::default(),
                ticket,
            });
        }
        viewer.update();
        viewer.update();

        assert_eq!(count::<FallbackShape>(&mut viewer), 1);
        match fallback_error(&mut viewer) {
            AssetError::Fetch { path, reason } => {
                assert_eq!(path, "models/thyroid.glb");
                assert!(reason.contains("never started"));
            }
            other => panic!("expected a fetch error, got {other:?}"),
        }
    }

    #[test]
    fn test_label_has_glyphs_from_first_frame() {
        let mut viewer = viewer(Some(1));
        viewer.update();

        let style = LabelStyle::default();
        let plate = LabelRasterizer::plate_only().render("", &style).unwrap();
        let expected = LabelRasterizer::new().render("Thyroid Center", &style).unwrap();

        let world = world(&mut viewer);
        let mut labels = world.query::<&LabelBillboard>();
        let handle = labels.single(world).unwrap().image.clone();
        let image = world.resource::<Assets<Image>>().get(&handle).unwrap();
        let data = image.data.as_ref().unwrap();
        assert_eq!(data, &expected.pixels);
        assert_ne!(data, &plate.pixels);
    }

    #[test]
    fn test_loaded_font_replaces_label_pixels() {
        let mut viewer = viewer(Some(1));
        viewer.update();

        let handle = {
            let world = world(&mut viewer);
            let mut labels = world.query::<&LabelBillboard>();
            let handle = labels.single(world).unwrap().image.clone();
            let mut images = world.resource_mut::<Assets<Image>>();
            let image = images.get_mut(&handle).unwrap();
            let blank = vec![0; image.data.as_ref().unwrap().len()];
            image.data = Some(blank);

            let font = Font::try_from_bytes(DEFAULT_FONT.to_vec()).unwrap();
            let font = world.resource_mut::<Assets<Font>>().add(font);
            world.resource_mut::<LabelFont>().handle = Some(font);
            handle
        };
        viewer.update();

        let expected = LabelRasterizer::new()
            .render("Thyroid Center", &LabelStyle::default())
            .unwrap();
        let world = world(&mut viewer);
        assert!(world.resource::<LabelFont>().applied);
        let image = world.resource::<Assets<Image>>().get(&handle).unwrap();
        assert_eq!(image.data.as_ref().unwrap(), &expected.pixels);
    }
}
