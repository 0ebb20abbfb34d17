use std::collections::HashMap;

use anyhow::{anyhow, Context};
use glam::Vec3;

use crate::{
    asset_loader::{LoadOutcome, LoadRequest, LoadedAsset},
    asset_pipeline::{
        geometry::{box_model, cylinder_model},
        materials::{PbrMaterialData, TextureKind},
    },
    config::{HeroConfig, ObjectConfig, ObjectSource},
    material_manager::{MaterialId, MaterialManager},
    model::Model,
    scene_graph::{Object3D, ObjectId, Property, Scene, SceneRegistry, Transform},
};

/// Registers configured materials, declares every slot and places the procedural
/// objects. Returns the load requests for everything that comes from disk.
pub fn build_static(
    config: &HeroConfig,
    scene: &mut Scene,
    registry: &mut SceneRegistry,
    materials: &mut MaterialManager,
) -> Vec<LoadRequest> {
    for material in &config.materials {
        materials.add_named_material(PbrMaterialData::new(
            material.name.clone(),
            material.color,
            material.metalness,
            material.roughness,
        ));
    }

    for object in &config.objects {
        registry.declare(object.slot.clone());

        let model = match &object.source {
            ObjectSource::Box { size } => box_model(&object.slot, *size),
            ObjectSource::Cylinder {
                radius_top,
                radius_bottom,
                height,
                radial_segments,
            } => cylinder_model(
                &object.slot,
                *radius_top,
                *radius_bottom,
                *height,
                *radial_segments,
            ),
            ObjectSource::Model { .. } => continue,
        };

        let mut root = placement_root(object);
        root.model_id = Some(scene.add_model(model));
        root.material_override = material_of(object, materials);

        let id = scene.add_object(root);
        registry.bind(object.slot.clone(), id);
    }

    config
        .assets
        .iter()
        .map(|asset| LoadRequest {
            asset: asset.name.clone(),
            path: config.asset_path(asset),
        })
        .collect()
}

/// Places whatever the given outcomes make available. Called again for every batch
/// of finished loads. Slots whose asset failed, or could not be placed, end up
/// `Failed`. Slots of assets still loading stay `Pending`.
pub fn place_assets(
    config: &HeroConfig,
    outcomes: Vec<LoadOutcome>,
    scene: &mut Scene,
    registry: &mut SceneRegistry,
    materials: &mut MaterialManager,
) {
    for outcome in outcomes {
        let asset = outcome.request.asset.as_str();

        match &outcome.result {
            Ok(loaded) => {
                attach_textures(config, asset, loaded, materials);
                place_objects(config, asset, loaded, scene, registry, materials);
            }
            // Already logged by the loader
            Err(_) => {
                for object in objects_using(config, asset) {
                    log::error!("Could not place `{}`: asset `{asset}` is unavailable", object.slot);
                    registry.fail(object.slot.clone());
                }
            }
        }
    }
}

fn objects_using<'a>(config: &'a HeroConfig, asset: &'a str) -> impl Iterator<Item = &'a ObjectConfig> {
    config.objects.iter().filter(move |object| {
        matches!(&object.source, ObjectSource::Model { asset: source } if source == asset)
    })
}

fn place_objects(
    config: &HeroConfig,
    asset: &str,
    loaded: &LoadedAsset,
    scene: &mut Scene,
    registry: &mut SceneRegistry,
    materials: &mut MaterialManager,
) {
    let mut obj_materials = HashMap::new();

    for object in objects_using(config, asset) {
        match place_model(object, asset, loaded, scene, materials, &mut obj_materials) {
            Ok(id) => {
                log::info!("Placed `{}` from `{asset}`", object.slot);
                registry.bind(object.slot.clone(), id);
            }
            Err(err) => {
                log::error!("Could not place `{}`: {err:#}", object.slot);
                registry.fail(object.slot.clone());
            }
        }
    }
}

fn attach_textures(
    config: &HeroConfig,
    asset: &str,
    loaded: &LoadedAsset,
    materials: &mut MaterialManager,
) {
    for material in &config.materials {
        let Some(id) = materials.get_by_name(&material.name) else {
            continue;
        };

        let maps = [
            (TextureKind::Diffuse, &material.diffuse),
            (TextureKind::Normal, &material.normal),
            (TextureKind::Roughness, &material.roughness_map),
        ];

        for (kind, map) in maps {
            if map.as_deref() != Some(asset) {
                continue;
            }

            match loaded {
                LoadedAsset::Texture(texture) => {
                    materials.attach_texture(id, kind, texture.clone())
                }
                other => log::warn!(
                    "{}: `{asset}` is a {} asset, not a texture",
                    material.name,
                    other.kind()
                ),
            }
        }
    }
}

fn place_model(
    object: &ObjectConfig,
    asset: &str,
    loaded: &LoadedAsset,
    scene: &mut Scene,
    materials: &mut MaterialManager,
    obj_materials: &mut HashMap<String, Vec<MaterialId>>,
) -> anyhow::Result<ObjectId> {
    let mut root = placement_root(object);

    match loaded {
        LoadedAsset::Gltf {
            document,
            buffers,
            images,
        } => {
            let gltf_scene = document
                .default_scene()
                .or_else(|| document.scenes().next())
                .context("No scenes in glTF")?;

            materials.load_all_materials_from_gltf(asset, document, images);

            let root_id = scene.add_object(root);
            if let Err(err) =
                scene.spawn_gltf_scene(materials, asset, buffers, &gltf_scene, root_id)
            {
                // Hide whatever got spawned before the failure
                scene.set_property(root_id, Property::Scale, Vec3::ZERO);
                return Err(err);
            }

            apply_material(object, root_id, scene, materials);
            Ok(root_id)
        }
        LoadedAsset::Obj {
            models,
            materials: mtl,
        } => {
            let material_ids = obj_materials
                .entry(asset.to_string())
                .or_insert_with(|| materials.load_all_materials_from_obj(mtl));

            let model_id = scene.asset_model(asset, || Model::from_obj(asset, models, &material_ids[..]))?;
            root.model_id = Some(model_id);

            let root_id = scene.add_object(root);
            apply_material(object, root_id, scene, materials);
            Ok(root_id)
        }
        LoadedAsset::Texture(_) => Err(anyhow!("`{asset}` is a texture, not a model")),
    }
}

fn placement_root(object: &ObjectConfig) -> Object3D {
    let mut root = Object3D::named(object.slot.clone());
    root.transform = Transform::new(object.position, object.rotation, object.scale);
    root
}

fn material_of(object: &ObjectConfig, materials: &MaterialManager) -> Option<MaterialId> {
    object
        .material
        .as_deref()
        .and_then(|name| materials.get_by_name(name))
}

fn apply_material(
    object: &ObjectConfig,
    root_id: ObjectId,
    scene: &mut Scene,
    materials: &MaterialManager,
) {
    if let Some(material) = material_of(object, materials) {
        scene.set_material_override(root_id, material);
    }
}
