use std::collections::HashMap;

use glam::Vec3;
use id_arena::{Arena, Id};

use crate::asset_pipeline::materials::{PbrMaterialData, TextureData, TextureKind};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GltfMaterialKey {
    pub file_name: String,
    pub material_index: usize,
}

pub struct MaterialManager {
    materials: Arena<PbrMaterialData>,
    materials_by_gltf: HashMap<GltfMaterialKey, MaterialId>,
    materials_by_name: HashMap<String, MaterialId>,
    default_material: MaterialId,
}

pub type MaterialId = Id<PbrMaterialData>;

impl MaterialManager {
    pub fn new() -> Self {
        let mut materials = Arena::new();
        let default_material = materials.alloc(PbrMaterialData::new("Default", Vec3::splat(0.8), 0.0, 0.8));

        Self {
            materials,
            materials_by_gltf: HashMap::new(),
            materials_by_name: HashMap::new(),
            default_material,
        }
    }

    pub fn default_material(&self) -> MaterialId {
        self.default_material
    }

    pub fn add_material(&mut self, material_data: PbrMaterialData) -> MaterialId {
        self.materials.alloc(material_data)
    }

    /// Registers a material that scene configuration refers to by name.
    pub fn add_named_material(&mut self, material_data: PbrMaterialData) -> MaterialId {
        let name = material_data.name.clone();
        let id = self.add_material(material_data);
        self.materials_by_name.insert(name, id);
        id
    }

    pub fn get(&self, id: MaterialId) -> Option<&PbrMaterialData> {
        self.materials.get(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<MaterialId> {
        self.materials_by_name.get(name).copied()
    }

    pub fn get_gltf_material(&self, file_name: &str, material_index: usize) -> Option<MaterialId> {
        let key = GltfMaterialKey {
            file_name: file_name.to_string(),
            material_index,
        };
        self.materials_by_gltf.get(&key).copied()
    }

    pub fn attach_texture(&mut self, id: MaterialId, kind: TextureKind, texture: TextureData) {
        if let Some(material) = self.materials.get_mut(id) {
            material.set_texture(kind, texture);
        }
    }

    pub fn load_all_materials_from_gltf(
        &mut self,
        file_name: &str,
        document: &gltf::Document,
        images: &[gltf::image::Data],
    ) {
        for material in document.materials() {
            let Some(material_index) = material.index() else {
                continue;
            };

            let key = GltfMaterialKey {
                file_name: file_name.to_string(),
                material_index,
            };

            if self.materials_by_gltf.contains_key(&key) {
                continue;
            }

            let material_name = material
                .name()
                .map(String::from)
                .unwrap_or_else(|| format!("{file_name} #{material_index}"));

            let pbr = material.pbr_metallic_roughness();
            let [r, g, b, _] = pbr.base_color_factor();

            let mut material_data = PbrMaterialData::new(
                material_name,
                Vec3::new(r, g, b),
                pbr.metallic_factor(),
                pbr.roughness_factor(),
            );

            let image_of = |texture: gltf::Texture| {
                images
                    .get(texture.source().index())
                    .and_then(|data| convert_image_data_to_rgba(data, file_name))
            };

            material_data.diffuse = pbr.base_color_texture().and_then(|info| image_of(info.texture()));
            material_data.normal = material.normal_texture().and_then(|info| image_of(info.texture()));
            material_data.roughness = pbr
                .metallic_roughness_texture()
                .and_then(|info| image_of(info.texture()));

            let id = self.add_material(material_data);
            self.materials_by_gltf.insert(key, id);
        }
    }

    /// Returns one material id per entry of `materials`, in order.
    pub fn load_all_materials_from_obj(&mut self, materials: &[tobj::Material]) -> Vec<MaterialId> {
        materials
            .iter()
            .enumerate()
            .map(|(i, mtl)| {
                let name = if mtl.name.is_empty() {
                    format!("material_{}", i)
                } else {
                    mtl.name.clone()
                };
                let diffuse = mtl.diffuse.unwrap_or([0.8, 0.8, 0.8]);
                let roughness = 1.0 - (mtl.shininess.unwrap_or(32.0) / 128.0).clamp(0.0, 1.0);

                self.add_material(PbrMaterialData::new(name, Vec3::from(diffuse), 0.0, roughness))
            })
            .collect()
    }

    pub fn materials(&self) -> impl Iterator<Item = (MaterialId, &PbrMaterialData)> {
        self.materials.iter()
    }

    pub fn draw_ui(&self, ui: &imgui::Ui) {
        ui.window("Materials").build(|| {
            for (id, material) in self.materials.iter() {
                ui.text(format!(
                    "{}: {} (rev {}, textures: {}{}{})",
                    id.index(),
                    material.name,
                    material.revision,
                    if material.diffuse.is_some() { "D" } else { "-" },
                    if material.normal.is_some() { "N" } else { "-" },
                    if material.roughness.is_some() { "R" } else { "-" },
                ));
            }
        });
    }
}

fn convert_image_data_to_rgba(data: &gltf::image::Data, file_name: &str) -> Option<TextureData> {
    let pixels = match data.format {
        gltf::image::Format::R8G8B8A8 => data.pixels.clone(),
        gltf::image::Format::R8G8B8 => {
            let mut rgba = Vec::with_capacity(data.pixels.len() / 3 * 4);
            for pixel in data.pixels.chunks(3) {
                rgba.extend_from_slice(pixel);
                rgba.push(255);
            }
            rgba
        }
        other => {
            log::warn!("{file_name}: skipping texture with unsupported format {other:?}");
            return None;
        }
    };

    Some(TextureData {
        width: data.width,
        height: data.height,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_materials_are_found_by_name() {
        let mut manager = MaterialManager::new();
        let id = manager.add_named_material(PbrMaterialData::new("table", Vec3::splat(0.47), 0.5, 0.7));

        assert_eq!(manager.get_by_name("table"), Some(id));
        assert_eq!(manager.get_by_name("chair"), None);
        assert_ne!(manager.default_material(), id);
    }

    #[test]
    fn attaching_a_texture_bumps_the_revision() {
        let mut manager = MaterialManager::new();
        let id = manager.add_named_material(PbrMaterialData::new("table", Vec3::ONE, 0.5, 0.7));
        let before = manager.get(id).unwrap().revision;

        manager.attach_texture(
            id,
            TextureKind::Diffuse,
            TextureData {
                width: 1,
                height: 1,
                pixels: vec![255; 4],
            },
        );

        let material = manager.get(id).unwrap();
        assert!(material.diffuse.is_some());
        assert_eq!(material.revision, before + 1);
    }

    #[test]
    fn obj_materials_keep_their_order() {
        let mut manager = MaterialManager::new();
        let materials = vec![
            tobj::Material {
                name: "leather".to_string(),
                diffuse: Some([0.1, 0.1, 0.1]),
                ..Default::default()
            },
            tobj::Material::default(),
        ];

        let ids = manager.load_all_materials_from_obj(&materials);

        assert_eq!(ids.len(), 2);
        assert_eq!(manager.get(ids[0]).unwrap().name, "leather");
        assert_eq!(manager.get(ids[1]).unwrap().name, "material_1");
    }
}
