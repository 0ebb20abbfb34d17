use glam::{EulerRot, Mat4, Vec3};
use id_arena::Arena;
use std::collections::HashMap;

use crate::material_manager::{MaterialId, MaterialManager};
use crate::model::{Buffers, Model};
use crate::scene_graph::object3d::{Object3D, ObjectId, Property};
use crate::scene_graph::scene_model::{SceneModel, SceneModelId};
use crate::scene_graph::transform::Transform;

pub struct Scene {
    pub objects: Arena<Object3D>,
    pub models: Arena<SceneModel>,
    // Meshes are shared between every placement of the same asset
    gltf_mesh_to_model: HashMap<(String, usize), SceneModelId>,
    asset_to_model: HashMap<String, SceneModelId>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
            models: Arena::new(),
            gltf_mesh_to_model: HashMap::new(),
            asset_to_model: HashMap::new(),
        }
    }

    pub fn add_object(&mut self, object: Object3D) -> ObjectId {
        self.objects.alloc(object)
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id)
    }

    pub fn add_model(&mut self, model: Model) -> SceneModelId {
        self.models.alloc(SceneModel::new(model))
    }

    /// Returns the model registered for a single-mesh asset, creating it on first use.
    pub fn asset_model(
        &mut self,
        asset: &str,
        create: impl FnOnce() -> anyhow::Result<Model>,
    ) -> anyhow::Result<SceneModelId> {
        if let Some(model_id) = self.asset_to_model.get(asset) {
            return Ok(*model_id);
        }

        let model_id = self.add_model(create()?);
        self.asset_to_model.insert(asset.to_string(), model_id);
        Ok(model_id)
    }

    /// Spawns every root node of a glTF scene as children of `parent`.
    pub fn spawn_gltf_scene(
        &mut self,
        material_manager: &MaterialManager,
        file_name: &str,
        buffers: Buffers,
        scene: &gltf::Scene,
        parent: ObjectId,
    ) -> anyhow::Result<()> {
        for node in scene.nodes() {
            self.spawn_gltf_node(material_manager, file_name, buffers, &node, parent)?;
        }

        Ok(())
    }

    fn spawn_gltf_node(
        &mut self,
        material_manager: &MaterialManager,
        file_name: &str,
        buffers: Buffers,
        node: &gltf::Node,
        parent: ObjectId,
    ) -> anyhow::Result<ObjectId> {
        let node_name = node.name().unwrap_or("Unnamed").to_string();
        let mut object = Object3D::named(node_name.clone());
        let (translation, rotation, scale) = node.transform().decomposed();
        let (x, y, z) = glam::Quat::from_array(rotation).to_euler(EulerRot::XYZ);

        object.transform =
            Transform::new(Vec3::from(translation), Vec3::new(x, y, z), Vec3::from(scale));

        if let Some(mesh) = node.mesh() {
            let key = (file_name.to_string(), mesh.index());

            let model_id = match self.gltf_mesh_to_model.get(&key).copied() {
                Some(model_id) => model_id,
                None => {
                    let mesh_name = mesh
                        .name()
                        .map(String::from)
                        .unwrap_or_else(|| format!("{} (Mesh)", node_name));

                    let model =
                        Model::from_gltf(material_manager, file_name, mesh_name, mesh, buffers)?;
                    let model_id = self.add_model(model);
                    self.gltf_mesh_to_model.insert(key, model_id);

                    model_id
                }
            };

            object.model_id = Some(model_id);
        }

        let object_id = self.add_object(object);
        self.set_object_parent(object_id, Some(parent));

        for child in node.children() {
            self.spawn_gltf_node(material_manager, file_name, buffers, &child, object_id)?;
        }

        Ok(object_id)
    }

    /// Updates all object transforms in hierarchical order
    fn update_transforms(&self) {
        let root_objects = self
            .objects
            .iter()
            .filter(|(_, object)| object.parent_id.is_none())
            .map(|(id, _)| id);

        for root_id in root_objects {
            self.update_object_transform_recursive(root_id, Mat4::IDENTITY);
        }
    }

    fn update_object_transform_recursive(&self, object_id: ObjectId, parent_world_matrix: Mat4) {
        if let Some(object) = self.objects.get(object_id) {
            if object.transform.is_world_dirty() {
                let local_matrix = *object.transform.get_local_matrix();
                object
                    .transform
                    .set_world_matrix(parent_world_matrix * local_matrix);
            }

            let world_matrix = *object.transform.get_world_matrix();
            for &child_id in &object.child_ids {
                self.update_object_transform_recursive(child_id, world_matrix);
            }
        }
    }

    /// Invalidates world transforms for an object and all its descendants
    pub fn invalidate_object_hierarchy(&self, object_id: ObjectId) {
        if let Some(object) = self.objects.get(object_id) {
            object.transform.invalidate_world();

            for &child_id in &object.child_ids {
                self.invalidate_object_hierarchy(child_id);
            }
        }
    }

    /// Sets the parent of an object and updates child relationships
    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) {
        if let Some(old_parent_id) = self.objects.get(child_id).and_then(|child| child.parent_id) {
            if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                old_parent.child_ids.retain(|&id| id != child_id);
            }
        }

        let Some(child) = self.objects.get_mut(child_id) else {
            return;
        };
        child.parent_id = new_parent_id;

        if let Some(new_parent) = new_parent_id.and_then(|id| self.objects.get_mut(id)) {
            new_parent.child_ids.push(child_id);
        }

        self.invalidate_object_hierarchy(child_id);
    }

    pub fn property(&self, object_id: ObjectId, property: Property) -> Option<Vec3> {
        self.objects
            .get(object_id)
            .map(|object| object.property(property))
    }

    pub fn set_property(&mut self, object_id: ObjectId, property: Property, value: Vec3) {
        let invalidate = match self.objects.get_mut(object_id) {
            Some(object) => object.set_property(property, value),
            None => false,
        };

        if invalidate {
            self.invalidate_object_hierarchy(object_id);
        }
    }

    /// Forces one material onto every object below and including `object_id`.
    pub fn set_material_override(&mut self, object_id: ObjectId, material: MaterialId) {
        let child_ids = match self.objects.get_mut(object_id) {
            Some(object) => {
                object.material_override = Some(material);
                object.child_ids.clone()
            }
            None => return,
        };

        for child_id in child_ids {
            self.set_material_override(child_id, material);
        }
    }

    /// Visits every object carrying a model whose world transform is not collapsed,
    /// with the tint accumulated from its ancestors.
    pub fn visit_visible(&self, mut visit: impl FnMut(ObjectId, &Object3D, Vec3)) {
        let roots = self
            .objects
            .iter()
            .filter(|(_, object)| object.parent_id.is_none())
            .map(|(id, _)| id)
            .collect::<Vec<_>>();

        let mut stack = roots
            .into_iter()
            .map(|id| (id, Vec3::ONE))
            .collect::<Vec<_>>();

        while let Some((id, parent_tint)) = stack.pop() {
            let Some(object) = self.objects.get(id) else {
                continue;
            };

            let tint = parent_tint * object.tint;
            if object.model_id.is_some() && !object.transform.is_collapsed() {
                visit(id, object, tint);
            }

            stack.extend(object.child_ids.iter().map(|&child| (child, tint)));
        }
    }

    pub fn early_update(&mut self) {
        for (_, object) in self.objects.iter() {
            object.transform.reset_flags();
        }
    }

    pub fn late_update(&mut self) {
        self.update_transforms();
    }

    /// Objects whose transform changed since the last `early_update`.
    pub fn changed_count(&self) -> usize {
        self.objects
            .iter()
            .filter(|(_, object)| object.transform.has_changed())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset_pipeline::geometry::box_model;

    #[test]
    fn child_world_matrix_follows_parent_scale() {
        let mut scene = Scene::new();
        let mut root = Object3D::named("chair");
        root.transform = Transform::new(Vec3::new(-2.6, 0.5, 2.0), Vec3::ZERO, Vec3::splat(0.1));
        let root = scene.add_object(root);

        let mut seat = Object3D::named("seat");
        seat.transform = Transform::from_translation(Vec3::new(0.0, 10.0, 0.0));
        let seat = scene.add_object(seat);
        scene.set_object_parent(seat, Some(root));

        scene.late_update();

        let world = *scene.get_object(seat).unwrap().transform.get_world_matrix();
        let origin = world.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(-2.6, 1.5, 2.0)).length() < 1e-5);
    }

    #[test]
    fn zero_scale_hides_the_whole_hierarchy() {
        let mut scene = Scene::new();
        let model_id = scene.add_model(box_model("slab", Vec3::ONE));

        let root = scene.add_object(Object3D::named("pc"));
        let mut mesh = Object3D::named("pc mesh");
        mesh.model_id = Some(model_id);
        let mesh = scene.add_object(mesh);
        scene.set_object_parent(mesh, Some(root));

        scene.set_property(root, Property::Scale, Vec3::ZERO);
        scene.late_update();

        let mut visible = 0;
        scene.visit_visible(|_, _, _| visible += 1);
        assert_eq!(visible, 0);

        scene.set_property(root, Property::Scale, Vec3::splat(2.0));
        scene.late_update();

        let mut visible = 0;
        scene.visit_visible(|_, _, _| visible += 1);
        assert_eq!(visible, 1);
    }

    #[test]
    fn tint_is_inherited() {
        let mut scene = Scene::new();
        let model_id = scene.add_model(box_model("slab", Vec3::ONE));

        let root = scene.add_object(Object3D::named("group"));
        let mut mesh = Object3D::named("mesh");
        mesh.model_id = Some(model_id);
        mesh.tint = Vec3::new(1.0, 0.5, 1.0);
        let mesh = scene.add_object(mesh);
        scene.set_object_parent(mesh, Some(root));
        scene.set_property(root, Property::Tint, Vec3::new(0.5, 1.0, 1.0));
        scene.late_update();

        let mut tints = Vec::new();
        scene.visit_visible(|_, _, tint| tints.push(tint));
        assert_eq!(tints, vec![Vec3::new(0.5, 0.5, 1.0)]);
    }

    #[test]
    fn material_override_reaches_descendants() {
        let mut scene = Scene::new();
        let materials = MaterialManager::new();
        let root = scene.add_object(Object3D::named("chair"));
        let child = scene.add_object(Object3D::named("leg"));
        scene.set_object_parent(child, Some(root));

        scene.set_material_override(root, materials.default_material());

        assert_eq!(
            scene.get_object(child).unwrap().material_override,
            Some(materials.default_material())
        );
    }

    #[test]
    fn asset_models_are_shared() {
        let mut scene = Scene::new();
        let first = scene
            .asset_model("chair", || Ok(box_model("chair", Vec3::ONE)))
            .unwrap();
        let second = scene
            .asset_model("chair", || panic!("chair model rebuilt"))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(scene.models.len(), 1);
    }
}
