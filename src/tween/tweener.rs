use std::collections::HashMap;

use crate::scene_graph::{ObjectId, Property, Scene};
use crate::tween::{Axis, Easing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TweenKey {
    pub object: ObjectId,
    pub property: Property,
    pub axis: Axis,
}

#[derive(Debug, Clone)]
pub struct Tween {
    from: Option<f32>,
    to: f32,
    duration: f32,
    delay: f32,
    easing: Easing,
    elapsed: f32,
}

impl Tween {
    pub fn new(from: Option<f32>, to: f32, duration: f32, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration: duration.max(0.0),
            delay: 0.0,
            easing,
            elapsed: 0.0,
        }
    }

    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay.max(0.0);
        self
    }

    pub fn target(&self) -> f32 {
        self.to
    }

    /// Linear progress in `[0, 1]`, zero while delayed.
    pub fn progress(&self) -> f32 {
        let running = self.elapsed - self.delay;
        if running < 0.0 {
            0.0
        } else if self.duration <= 0.0 {
            1.0
        } else {
            (running / self.duration).min(1.0)
        }
    }

    fn started(&self) -> bool {
        self.elapsed >= self.delay
    }
}

/// Owns every in-flight tween, at most one per object field.
///
/// Starting a tween on a field that is already animating replaces the old tween,
/// so the newest trigger always wins and nothing queues up.
#[derive(Default)]
pub struct Tweener {
    active: HashMap<TweenKey, Tween>,
}

impl Tweener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if an in-flight tween on the same field was replaced.
    pub fn start(&mut self, key: TweenKey, tween: Tween) -> bool {
        self.active.insert(key, tween).is_some()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TweenKey, &Tween)> {
        self.active.iter()
    }

    /// Moves every tween forward by `dt` seconds and writes the values into `scene`.
    /// Finished tweens land exactly on their target and are dropped.
    pub fn advance(&mut self, dt: f32, scene: &mut Scene) {
        self.active.retain(|key, tween| {
            tween.elapsed += dt.max(0.0);

            if !tween.started() {
                return true;
            }

            let Some(mut current) = scene.property(key.object, key.property) else {
                return false;
            };

            let from = *tween.from.get_or_insert(key.axis.get(current));
            let progress = tween.progress();
            let value = if progress >= 1.0 {
                tween.to
            } else {
                from + (tween.to - from) * tween.easing.apply(progress)
            };

            key.axis.set(&mut current, value);
            scene.set_property(key.object, key.property, current);

            progress < 1.0
        });
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::scene_graph::Object3D;

    fn scene_with_table() -> (Scene, ObjectId) {
        let mut scene = Scene::new();
        let table = scene.add_object(Object3D::named("table"));
        (scene, table)
    }

    fn scale_x(object: ObjectId) -> TweenKey {
        TweenKey {
            object,
            property: Property::Scale,
            axis: Axis::X,
        }
    }

    #[test]
    fn tween_reaches_target_exactly() {
        let (mut scene, table) = scene_with_table();
        let mut tweener = Tweener::new();
        tweener.start(scale_x(table), Tween::new(None, 1.45, 0.5, Easing::Power2Out));

        for _ in 0..40 {
            tweener.advance(1.0 / 60.0, &mut scene);
        }

        assert_eq!(scene.property(table, Property::Scale), Some(Vec3::new(1.45, 1.0, 1.0)));
        assert!(tweener.is_empty());
    }

    #[test]
    fn start_value_is_captured_when_the_tween_starts() {
        let (mut scene, table) = scene_with_table();
        let mut tweener = Tweener::new();
        tweener.start(scale_x(table), Tween::new(None, 2.0, 1.0, Easing::Linear).with_delay(0.5));

        scene.set_property(table, Property::Scale, Vec3::splat(1.5));
        tweener.advance(0.25, &mut scene);
        assert_eq!(scene.property(table, Property::Scale).unwrap().x, 1.5);

        // 0.25s into the tween proper
        tweener.advance(0.5, &mut scene);
        let x = scene.property(table, Property::Scale).unwrap().x;
        assert!((x - 1.625).abs() < 1e-5, "x = {x}");
    }

    #[test]
    fn newest_trigger_wins() {
        let (mut scene, table) = scene_with_table();
        let mut tweener = Tweener::new();

        tweener.start(scale_x(table), Tween::new(None, 1.45, 0.5, Easing::Power2Out));
        tweener.advance(0.1, &mut scene);
        let midway = scene.property(table, Property::Scale).unwrap().x;
        assert!(midway > 1.0 && midway < 1.45);

        assert!(tweener.start(scale_x(table), Tween::new(None, 1.0, 0.5, Easing::Power2Out)));
        assert_eq!(tweener.len(), 1);

        tweener.advance(0.5, &mut scene);
        assert_eq!(scene.property(table, Property::Scale).unwrap().x, 1.0);
        assert!(tweener.is_empty());
    }

    #[test]
    fn zero_duration_snaps() {
        let (mut scene, table) = scene_with_table();
        let mut tweener = Tweener::new();
        tweener.start(scale_x(table), Tween::new(None, 0.0, 0.0, Easing::Linear));

        tweener.advance(0.0, &mut scene);

        assert_eq!(scene.property(table, Property::Scale).unwrap().x, 0.0);
        assert!(tweener.is_empty());
    }

    #[test]
    fn explicit_from_overrides_current_value() {
        let (mut scene, table) = scene_with_table();
        let mut tweener = Tweener::new();
        let key = TweenKey {
            object: table,
            property: Property::Position,
            axis: Axis::Y,
        };
        tweener.start(key, Tween::new(Some(-1.0), 1.0, 1.0, Easing::Linear));

        tweener.advance(0.5, &mut scene);

        assert!(scene.property(table, Property::Position).unwrap().y.abs() < 1e-6);
    }
}
