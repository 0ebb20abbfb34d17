pub mod easing;
pub mod tweener;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::scene_graph::Property;

pub use easing::Easing;
pub use tweener::{Tween, TweenKey, Tweener};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn get(self, vector: Vec3) -> f32 {
        match self {
            Axis::X => vector.x,
            Axis::Y => vector.y,
            Axis::Z => vector.z,
        }
    }

    pub fn set(self, vector: &mut Vec3, value: f32) {
        match self {
            Axis::X => vector.x = value,
            Axis::Y => vector.y = value,
            Axis::Z => vector.z = value,
        }
    }
}

/// Components of a 3-vector that a directive touches. Missing components are left alone.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Axes {
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
    #[serde(default)]
    pub z: Option<f32>,
}

impl Axes {
    pub fn get(&self, axis: Axis) -> Option<f32> {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Axis, f32)> + '_ {
        Axis::ALL
            .into_iter()
            .filter_map(|axis| self.get(axis).map(|value| (axis, value)))
    }
}

fn default_duration() -> f32 {
    0.5
}

/// One `gsap.to`-style animation of a single property on a registry slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweenDirective {
    pub slot: String,
    pub property: Property,
    pub to: Axes,
    /// Start values. Captured from the object when the tween starts if absent.
    #[serde(default)]
    pub from: Option<Axes>,
    #[serde(default = "default_duration")]
    pub duration: f32,
    #[serde(default)]
    pub ease: Easing,
    /// Seconds to wait after the trigger before the tween starts.
    #[serde(default)]
    pub delay: f32,
}

impl TweenDirective {
    /// One tween per touched axis.
    pub fn tweens(&self) -> impl Iterator<Item = (Axis, Tween)> + '_ {
        self.to.iter().map(|(axis, to)| {
            let from = self.from.as_ref().and_then(|from| from.get(axis));
            (
                axis,
                Tween::new(from, to, self.duration, self.ease).with_delay(self.delay),
            )
        })
    }
}
