use glam::Vec2;

use crate::{
    backdrop::Backdrop,
    config::{Action, Rect, RegionConfig},
    scene_graph::SceneRegistry,
    tween::{TweenKey, Tweener},
};

/// Everything a batch of actions may touch.
pub struct BatchContext<'a> {
    pub registry: &'a SceneRegistry,
    pub tweener: &'a mut Tweener,
    pub backdrop: &'a mut Backdrop,
}

pub struct HoverRegion {
    pub name: String,
    pub bounds: Rect,
    pub enter: Vec<Action>,
    pub leave: Vec<Action>,
    hovered: bool,
}

impl HoverRegion {
    pub fn is_hovered(&self) -> bool {
        self.hovered
    }
}

impl From<&RegionConfig> for HoverRegion {
    fn from(config: &RegionConfig) -> Self {
        Self {
            name: config.name.clone(),
            bounds: config.bounds,
            enter: config.enter.clone(),
            leave: config.leave.clone(),
            hovered: false,
        }
    }
}

/// Turns pointer movement over the window into enter and leave batches.
///
/// Regions are tracked independently, so overlapping rectangles can be hovered
/// together. Until `arm` is called the hover state is tracked but nothing fires.
pub struct HoverController {
    regions: Vec<HoverRegion>,
    armed: bool,
    pointer: Option<Vec2>,
}

impl HoverController {
    pub fn new(regions: Vec<HoverRegion>) -> Self {
        Self {
            regions,
            armed: false,
            pointer: None,
        }
    }

    pub fn from_config(regions: &[RegionConfig]) -> Self {
        Self::new(regions.iter().map(HoverRegion::from).collect())
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn pointer(&self) -> Option<Vec2> {
        self.pointer
    }

    pub fn regions(&self) -> &[HoverRegion] {
        &self.regions
    }

    /// Starts reacting to the pointer. Regions already under the pointer fire
    /// their enter batch right away.
    pub fn arm(&mut self, ctx: &mut BatchContext) {
        if self.armed {
            return;
        }

        self.armed = true;
        log::info!("Hover armed");

        for region in self.regions.iter().filter(|region| region.hovered) {
            run_batch(&region.name, &region.enter, ctx);
        }
    }

    /// `position` is normalized to the window, origin at the top left.
    pub fn pointer_moved(&mut self, position: Vec2, ctx: &mut BatchContext) {
        self.pointer = Some(position);

        let (entered, left): (Vec<_>, Vec<_>) = self
            .regions
            .iter()
            .filter(|region| region.bounds.contains(position) != region.hovered)
            .map(|region| region.name.clone())
            .partition(|name| !self.is_hovered(name));

        // Leaves first so class removal happens before the next region adds its own
        for name in left {
            self.pointer_leave(&name, ctx);
        }
        for name in entered {
            self.pointer_enter(&name, ctx);
        }
    }

    pub fn pointer_left_window(&mut self, ctx: &mut BatchContext) {
        self.pointer = None;

        let hovered = self
            .regions
            .iter()
            .filter(|region| region.hovered)
            .map(|region| region.name.clone())
            .collect::<Vec<_>>();

        for name in hovered {
            self.pointer_leave(&name, ctx);
        }
    }

    /// No-op if the region is already hovered or does not exist.
    pub fn pointer_enter(&mut self, name: &str, ctx: &mut BatchContext) {
        self.transition(name, true, ctx);
    }

    /// No-op if the region is not hovered or does not exist.
    pub fn pointer_leave(&mut self, name: &str, ctx: &mut BatchContext) {
        self.transition(name, false, ctx);
    }

    fn is_hovered(&self, name: &str) -> bool {
        self.regions
            .iter()
            .any(|region| region.name == name && region.hovered)
    }

    fn transition(&mut self, name: &str, hovered: bool, ctx: &mut BatchContext) {
        let Some(region) = self.regions.iter_mut().find(|region| region.name == name) else {
            return;
        };

        if region.hovered == hovered {
            return;
        }
        region.hovered = hovered;

        log::debug!("{} {}", if hovered { "enter" } else { "leave" }, region.name);

        if self.armed {
            let batch = if hovered { &region.enter } else { &region.leave };
            run_batch(&region.name, batch, ctx);
        }
    }
}

/// Runs every action in order. Tweens on unbound slots are skipped, the rest still run.
pub fn run_batch(region: &str, batch: &[Action], ctx: &mut BatchContext) {
    for action in batch {
        match action {
            Action::Tween(directive) => match ctx.registry.resolve(&directive.slot) {
                Ok(object) => {
                    for (axis, tween) in directive.tweens() {
                        let key = TweenKey {
                            object,
                            property: directive.property,
                            axis,
                        };
                        ctx.tweener.start(key, tween);
                    }
                }
                Err(err) => log::warn!("{region}: skipping tween, {err}"),
            },
            Action::AddClass(class) => {
                ctx.backdrop.add_class(class);
            }
            Action::RemoveClass(class) => {
                ctx.backdrop.remove_class(class);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::{
        config::{HeroConfig, ObjectSource},
        material_manager::MaterialManager,
        scene_builder,
        scene_graph::{Property, Scene, SlotState},
    };

    struct Fixture {
        scene: Scene,
        registry: SceneRegistry,
        tweener: Tweener,
        backdrop: Backdrop,
        hover: HoverController,
        config: HeroConfig,
    }

    impl Fixture {
        /// The shipped scene with every model swapped for a box, so that all slots bind.
        fn shipped() -> Self {
            let mut config =
                HeroConfig::from_ron_str(include_str!("../assets/hero_scene.ron")).unwrap();
            for object in &mut config.objects {
                if let ObjectSource::Model { .. } = object.source {
                    object.source = ObjectSource::Box { size: Vec3::ONE };
                }
            }

            let mut scene = Scene::new();
            let mut registry = SceneRegistry::new();
            let mut materials = MaterialManager::new();
            scene_builder::build_static(&config, &mut scene, &mut registry, &mut materials);

            let mut fixture = Self {
                scene,
                registry,
                tweener: Tweener::new(),
                backdrop: Backdrop::new(
                    config.backdrop.base_color,
                    config.backdrop.class_colors(),
                    config.backdrop.transition,
                ),
                hover: HoverController::from_config(&config.regions),
                config,
            };
            fixture.with_ctx(|hover, ctx| hover.arm(ctx));
            fixture
        }

        fn with_ctx(&mut self, f: impl FnOnce(&mut HoverController, &mut BatchContext)) {
            let mut ctx = BatchContext {
                registry: &self.registry,
                tweener: &mut self.tweener,
                backdrop: &mut self.backdrop,
            };
            f(&mut self.hover, &mut ctx);
        }

        fn enter(&mut self, region: &str) {
            self.with_ctx(|hover, ctx| hover.pointer_enter(region, ctx));
        }

        fn leave(&mut self, region: &str) {
            self.with_ctx(|hover, ctx| hover.pointer_leave(region, ctx));
        }

        fn run(&mut self, seconds: f32) {
            // One extra frame so float accumulation cannot stop just short of the end
            let steps = (seconds * 60.0).ceil() as usize + 1;
            for _ in 0..steps {
                self.tweener.advance(1.0 / 60.0, &mut self.scene);
                self.backdrop.update(1.0 / 60.0);
            }
        }

        fn get(&self, slot: &str, property: Property) -> Vec3 {
            let object = self.registry.resolve(slot).unwrap();
            self.scene.property(object, property).unwrap()
        }

        fn snapshot(&self) -> Vec<Vec3> {
            let properties = [Property::Position, Property::Rotation, Property::Scale, Property::Tint];
            self.config
                .objects
                .iter()
                .flat_map(|object| properties.map(|property| self.get(&object.slot, property)))
                .collect()
        }
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!((actual - expected).abs() < 1e-5, "{actual} != {expected}");
    }

    #[test]
    fn right_enter_expands_the_table_and_slides_chairs_in() {
        let mut fixture = Fixture::shipped();
        fixture.enter("text-right");
        fixture.run(0.5);

        assert_close(fixture.get("table", Property::Scale).x, 1.45);
        assert_close(fixture.get("chair2", Property::Position).x, -2.6);
        assert_close(fixture.get("chair3", Property::Position).x, 2.6);
        assert_close(fixture.get("chair2", Property::Scale).y, 0.1);
        assert!(fixture.backdrop.has_class("pacman-hover"));
        assert!(fixture.tweener.is_empty());
    }

    #[test]
    fn right_enter_then_leave_returns_to_idle() {
        let mut fixture = Fixture::shipped();
        fixture.enter("text-right");
        fixture.run(0.5);
        fixture.leave("text-right");
        fixture.run(0.5);

        assert_close(fixture.get("table", Property::Scale).x, 1.0);
        assert_close(fixture.get("chair2", Property::Position).x, -5.0);
        assert_close(fixture.get("chair3", Property::Position).x, 5.0);
        assert_eq!(fixture.get("chair2", Property::Scale), Vec3::ZERO);
        assert_eq!(fixture.get("chair3", Property::Scale), Vec3::ZERO);
        assert!(fixture.backdrop.classes().is_empty());
    }

    #[test]
    fn every_region_round_trips_to_its_starting_state() {
        for region in ["text-left", "text-right"] {
            let mut fixture = Fixture::shipped();
            let before = fixture.snapshot();

            fixture.enter(region);
            fixture.run(1.0);
            assert_ne!(fixture.snapshot(), before, "{region} did nothing");

            fixture.leave(region);
            fixture.run(1.0);

            for (after, before) in fixture.snapshot().into_iter().zip(before) {
                assert!((after - before).length() < 1e-5, "{region}: {after} != {before}");
            }
        }
    }

    #[test]
    fn double_enter_is_the_same_as_one() {
        let mut once = Fixture::shipped();
        once.enter("text-left");
        once.run(0.1);

        let mut twice = Fixture::shipped();
        twice.enter("text-left");
        twice.enter("text-left");
        twice.run(0.1);

        assert_eq!(once.tweener.len(), twice.tweener.len());
        assert_eq!(once.snapshot(), twice.snapshot());
    }

    #[test]
    fn leave_mid_flight_takes_over_the_same_fields() {
        let mut fixture = Fixture::shipped();
        fixture.enter("text-right");
        fixture.run(0.1);
        let in_flight = fixture.tweener.len();

        fixture.leave("text-right");
        assert_eq!(fixture.tweener.len(), in_flight);

        fixture.run(0.5);
        assert_close(fixture.get("table", Property::Scale).x, 1.0);
    }

    #[test]
    fn pointer_movement_drives_regions() {
        let mut fixture = Fixture::shipped();

        fixture.with_ctx(|hover, ctx| hover.pointer_moved(Vec2::new(0.9, 0.5), ctx));
        assert!(fixture.backdrop.has_class("pacman-hover"));

        fixture.with_ctx(|hover, ctx| hover.pointer_moved(Vec2::new(0.1, 0.5), ctx));
        assert!(!fixture.backdrop.has_class("pacman-hover"));
        assert!(fixture.backdrop.has_class("home-hover"));

        fixture.with_ctx(|hover, ctx| hover.pointer_left_window(ctx));
        assert!(fixture.backdrop.classes().is_empty());
        assert!(fixture.hover.regions().iter().all(|region| !region.is_hovered()));
    }

    #[test]
    fn disarmed_controller_tracks_but_does_not_fire() {
        let mut fixture = Fixture::shipped();
        fixture.hover = HoverController::from_config(&fixture.config.regions);

        fixture.with_ctx(|hover, ctx| hover.pointer_moved(Vec2::new(0.9, 0.5), ctx));
        assert!(fixture.tweener.is_empty());
        assert!(fixture.backdrop.classes().is_empty());

        fixture.with_ctx(|hover, ctx| hover.arm(ctx));
        assert!(fixture.hover.is_armed());
        assert!(fixture.backdrop.has_class("pacman-hover"));
        assert!(!fixture.tweener.is_empty());
    }

    #[test]
    fn unbound_slots_are_skipped() {
        let mut fixture = Fixture::shipped();
        fixture.registry.fail("chair2");
        assert_eq!(fixture.registry.state("chair2"), Some(SlotState::Failed));

        fixture.enter("text-right");
        fixture.run(0.5);

        assert_close(fixture.get("table", Property::Scale).x, 1.45);
        assert!(fixture.backdrop.has_class("pacman-hover"));
    }
}
