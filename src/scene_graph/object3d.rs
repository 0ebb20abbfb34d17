use glam::Vec3;
use id_arena::Id;
use serde::{Deserialize, Serialize};

use crate::material_manager::MaterialId;
use crate::scene_graph::scene_model::SceneModelId;
use crate::scene_graph::transform::Transform;

pub type ObjectId = Id<Object3D>;

/// The animatable 3-vector fields of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    Position,
    Rotation,
    Scale,
    Tint,
}

pub struct Object3D {
    pub name: String,
    pub transform: Transform,
    pub model_id: Option<SceneModelId>,
    /// Replaces the materials of every primitive of the model when set.
    pub material_override: Option<MaterialId>,
    /// Multiplied into the material base color.
    pub tint: Vec3,
    pub parent_id: Option<ObjectId>,
    pub child_ids: Vec<ObjectId>,
}

impl Object3D {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn property(&self, property: Property) -> Vec3 {
        match property {
            Property::Position => self.transform.translation(),
            Property::Rotation => self.transform.rotation(),
            Property::Scale => self.transform.scale(),
            Property::Tint => self.tint,
        }
    }

    /// Returns true if the transform changed and the hierarchy needs invalidating.
    pub fn set_property(&mut self, property: Property, value: Vec3) -> bool {
        match property {
            Property::Position => self.transform.set_translation(value),
            Property::Rotation => self.transform.set_rotation(value),
            Property::Scale => self.transform.set_scale(value),
            Property::Tint => {
                self.tint = value;
                return false;
            }
        }
        true
    }
}

impl Default for Object3D {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: Transform::from_translation(Vec3::ZERO),
            model_id: None,
            material_override: None,
            tint: Vec3::ONE,
            parent_id: None,
            child_ids: Vec::new(),
        }
    }
}
