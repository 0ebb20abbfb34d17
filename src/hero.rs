use std::time::Instant;

use glam::Vec2;

use crate::{
    asset_loader::{AssetLoader, LoadOutcome, PendingAssets},
    backdrop::Backdrop,
    camera::Camera,
    config::HeroConfig,
    hover::{BatchContext, HoverController},
    material_manager::MaterialManager,
    scene_builder,
    scene_graph::{Scene, SceneRegistry, SlotState},
    tween::Tweener,
};

/// Everything the hero scene owns. The renderer only reads from it.
pub struct HeroState {
    pub config: HeroConfig,
    pub camera: Camera,
    pub scene: Scene,
    pub registry: SceneRegistry,
    pub materials: MaterialManager,
    pub tweener: Tweener,
    pub backdrop: Backdrop,
    pub hover: HoverController,
    pub start_time: Instant,

    viewport: (u32, u32),
    _loader: AssetLoader,
    pending: Option<PendingAssets>,
}

impl HeroState {
    pub fn new(config: HeroConfig) -> anyhow::Result<Self> {
        let (width, height) = (config.window.width, config.window.height);
        let camera = Camera::from_config(&config.camera, width, height);

        let mut scene = Scene::new();
        let mut registry = SceneRegistry::new();
        let mut materials = MaterialManager::new();
        let requests = scene_builder::build_static(&config, &mut scene, &mut registry, &mut materials);

        let loader = AssetLoader::new()?;
        let pending = loader.load_all(requests);
        log::info!("Loading {} assets", pending.total());

        let backdrop = Backdrop::new(
            config.backdrop.base_color,
            config.backdrop.class_colors(),
            config.backdrop.transition,
        );
        let hover = HoverController::from_config(&config.regions);

        Ok(Self {
            config,
            camera,
            scene,
            registry,
            materials,
            tweener: Tweener::new(),
            backdrop,
            hover,
            start_time: Instant::now(),
            viewport: (width, height),
            _loader: loader,
            pending: Some(pending),
        })
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn assets_settled(&self) -> bool {
        self.pending.is_none()
    }

    /// One frame: place the assets that finished loading, arm hover once all of
    /// them have, advance every animation and propagate transforms.
    pub fn update(&mut self, dt: f32) {
        self.scene.early_update();

        if let Some(pending) = self.pending.as_mut() {
            let outcomes = pending.try_take();
            let settled = pending.is_settled();

            if !outcomes.is_empty() {
                self.place(outcomes);
            }
            if settled {
                self.pending = None;
                self.settle();
            }
        }

        self.tweener.advance(dt, &mut self.scene);
        self.backdrop.update(dt);

        self.scene.late_update();
    }

    /// Blocks until the loader is done. Must not be called from async code.
    #[cfg(test)]
    pub fn wait_for_assets(&mut self) {
        if let Some(pending) = self.pending.take() {
            let outcomes = pending.wait();
            self.place(outcomes);
            self.settle();
        }
    }

    fn place(&mut self, outcomes: Vec<LoadOutcome>) {
        scene_builder::place_assets(
            &self.config,
            outcomes,
            &mut self.scene,
            &mut self.registry,
            &mut self.materials,
        );
    }

    fn settle(&mut self) {
        let failed = self
            .registry
            .iter()
            .filter(|(_, state)| *state == SlotState::Failed)
            .count();
        log::info!(
            "Assets settled, {failed} slots failed, {} still pending",
            self.registry.pending_count()
        );

        let mut ctx = BatchContext {
            registry: &self.registry,
            tweener: &mut self.tweener,
            backdrop: &mut self.backdrop,
        };
        self.hover.arm(&mut ctx);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.viewport = (width, height);
        self.camera.set_viewport(width, height);
    }

    /// `position` is in physical pixels.
    pub fn pointer_moved(&mut self, position: Vec2) {
        let (width, height) = self.viewport;
        let normalized = position / Vec2::new(width as f32, height as f32);

        let mut ctx = BatchContext {
            registry: &self.registry,
            tweener: &mut self.tweener,
            backdrop: &mut self.backdrop,
        };
        self.hover.pointer_moved(normalized, &mut ctx);
    }

    pub fn pointer_left(&mut self) {
        let mut ctx = BatchContext {
            registry: &self.registry,
            tweener: &mut self.tweener,
            backdrop: &mut self.backdrop,
        };
        self.hover.pointer_left_window(&mut ctx);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::{
        asset_loader::{
            load_blocking,
            tests::{scratch_dir, TRIANGLE_OBJ},
            LoadRequest,
        },
        scene_graph::Property,
    };

    const CONFIG: &str = r#"#![enable(implicit_some)]
        (
            window: (title: "Hero", width: 1000, height: 500),
            camera: (eye: (0.0, 2.0, 5.0), target: (0.0, 1.0, 0.0)),
            assets: [
                (name: "chair", path: "chair.obj"),
                (name: "headset", path: "headset.glb"),
            ],
            objects: [
                (slot: "table", source: Box(size: (8.0, 0.2, 1.0))),
                (slot: "chair2", source: Model(asset: "chair"), position: (-5.0, 0.5, 2.0), scale: (0.0, 0.0, 0.0)),
                (slot: "headset", source: Model(asset: "headset"), scale: (0.0, 0.0, 0.0)),
            ],
            regions: [
                (
                    name: "text-right",
                    bounds: (x: 0.5, y: 0.0, width: 0.5, height: 1.0),
                    enter: [
                        Tween((slot: "table", property: Scale, to: (x: 1.45))),
                        Tween((slot: "chair2", property: Position, to: (x: -2.6))),
                        Tween((slot: "headset", property: Scale, to: (x: 4.8, y: 4.8, z: 4.8))),
                    ],
                    leave: [
                        Tween((slot: "table", property: Scale, to: (x: 1.0))),
                        Tween((slot: "chair2", property: Position, to: (x: -5.0))),
                        Tween((slot: "headset", property: Scale, to: (x: 0.0, y: 0.0, z: 0.0))),
                    ],
                ),
            ],
        )
    "#;

    fn hero(name: &str) -> HeroState {
        let dir = scratch_dir(name);
        std::fs::write(dir.join("chair.obj"), TRIANGLE_OBJ).unwrap();

        let mut config = HeroConfig::from_ron_str(CONFIG).unwrap();
        config.base_dir = dir;
        HeroState::new(config).unwrap()
    }

    fn run(hero: &mut HeroState, seconds: f32) {
        for _ in 0..((seconds * 60.0).ceil() as usize + 1) {
            hero.update(1.0 / 60.0);
        }
    }

    #[test]
    fn resize_sets_the_camera_aspect_exactly() {
        let mut hero = hero("hero-resize");
        assert_eq!(hero.camera.aspect(), 2.0);

        hero.resize(640, 480);
        assert_eq!(hero.viewport(), (640, 480));
        assert_eq!(hero.camera.aspect(), 640.0 / 480.0);

        hero.resize(0, 480);
        assert_eq!(hero.viewport(), (640, 480));
    }

    #[test]
    fn hover_waits_for_every_asset() {
        let mut hero = hero("hero-arming");

        // Pointer already over the right panel while loading
        hero.pointer_moved(Vec2::new(900.0, 250.0));
        assert!(hero.tweener.is_empty());

        hero.wait_for_assets();
        assert!(hero.assets_settled());
        assert!(hero.hover.is_armed());
        assert!(!hero.tweener.is_empty());
    }

    #[test]
    fn stuck_load_only_holds_back_its_own_slots() {
        let mut hero = hero("hero-stuck");
        let path = hero.config.base_dir.join("chair.obj");

        let (sender, pending) = PendingAssets::channel(2);
        hero.pending = Some(pending);

        // The headset never reports back
        let chair = LoadOutcome {
            request: LoadRequest {
                asset: "chair".into(),
                path: path.clone(),
            },
            result: load_blocking(&path),
        };
        assert!(sender.send(chair).is_ok());

        hero.pointer_moved(Vec2::new(900.0, 250.0));
        run(&mut hero, 0.1);

        assert!(hero.registry.resolve("chair2").is_ok());
        assert_eq!(hero.registry.state("headset"), Some(SlotState::Pending));
        assert!(!hero.assets_settled());
        assert!(!hero.hover.is_armed());
        assert!(hero.tweener.is_empty());

        drop(sender);
        run(&mut hero, 0.5);

        assert!(hero.assets_settled());
        assert!(hero.hover.is_armed());
        assert_eq!(hero.registry.state("headset"), Some(SlotState::Pending));

        let chair2 = hero.registry.resolve("chair2").unwrap();
        assert!((hero.scene.property(chair2, Property::Position).unwrap().x + 2.6).abs() < 1e-5);
    }

    #[test]
    fn failed_asset_does_not_block_the_rest() {
        let mut hero = hero("hero-failure");
        hero.wait_for_assets();

        assert_eq!(hero.registry.state("headset"), Some(SlotState::Failed));
        assert!(hero.registry.resolve("chair2").is_ok());

        hero.pointer_moved(Vec2::new(900.0, 250.0));
        run(&mut hero, 0.5);

        let table = hero.registry.resolve("table").unwrap();
        let chair2 = hero.registry.resolve("chair2").unwrap();
        assert!((hero.scene.property(table, Property::Scale).unwrap().x - 1.45).abs() < 1e-5);
        assert!((hero.scene.property(chair2, Property::Position).unwrap().x + 2.6).abs() < 1e-5);

        hero.pointer_left();
        run(&mut hero, 0.5);
        assert_eq!(
            hero.scene.property(chair2, Property::Position),
            Some(Vec3::new(-5.0, 0.5, 2.0))
        );
    }
}
