use std::mem::offset_of;

use anyhow::{bail, Context};
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4, Vec4Swizzles};
use gltf::buffer;
use itertools::izip;

use crate::material_manager::{MaterialId, MaterialManager};

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
    pub tangent: Vec3,
}

pub struct ModelPrimitive {
    pub index: usize,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub material: Option<MaterialId>,
}

impl ModelPrimitive {
    pub fn vertex_by_triangle_index(&self, face: usize, vert: usize) -> &Vertex {
        &self.vertices[self.indices[face * 3 + vert] as usize]
    }

    pub fn vertex_by_triangle_index_mut(&mut self, face: usize, vert: usize) -> &mut Vertex {
        let index = self.indices[face * 3 + vert] as usize;
        &mut self.vertices[index]
    }

    /// Smooth vertex normals accumulated from face normals.
    pub fn compute_normals(&mut self) {
        for vertex in &mut self.vertices {
            vertex.normal = Vec3::ZERO;
        }

        for triangle in self.indices.chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
            let face_normal = (self.vertices[b].position - self.vertices[a].position)
                .cross(self.vertices[c].position - self.vertices[a].position);

            for i in [a, b, c] {
                self.vertices[i].normal += face_normal;
            }
        }

        for vertex in &mut self.vertices {
            vertex.normal = vertex.normal.normalize_or(Vec3::Y);
        }
    }
}

pub struct Model {
    pub name: String,
    pub primitives: Vec<ModelPrimitive>,
}

pub type Buffers<'a> = &'a [buffer::Data];

impl Model {
    pub fn from_gltf(
        material_manager: &MaterialManager,
        file_name: &str,
        name: impl Into<String>,
        mesh: gltf::Mesh,
        buffers: Buffers,
    ) -> anyhow::Result<Model> {
        let mut model = Model {
            name: name.into(),
            primitives: Vec::new(),
        };

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                bail!("Unsupported primitive mode: {:?}", primitive.mode());
            }

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions = reader
                .read_positions()
                .context("Primitive has no positions")?
                .map(Vec3::from)
                .collect::<Vec<_>>();

            let normals = match reader.read_normals() {
                Some(normals) => normals.map(Vec3::from).collect(),
                None => vec![Vec3::ZERO; positions.len()],
            };

            let tex_coords = match reader.read_tex_coords(0) {
                Some(tex_coords) => tex_coords.into_f32().map(Vec2::from).collect(),
                None => vec![Vec2::ZERO; positions.len()],
            };

            let tangents = reader
                .read_tangents()
                .map(|tangents| tangents.map(|t| Vec4::from(t).xyz()).collect::<Vec<_>>());
            let has_tangents = tangents.is_some();
            let tangents = tangents.unwrap_or_else(|| vec![Vec3::ZERO; positions.len()]);

            let vertices = izip!(positions, normals, tex_coords, tangents)
                .map(|(position, normal, tex_coords, tangent)| Vertex {
                    position,
                    normal,
                    tex_coords,
                    tangent,
                })
                .collect::<Vec<Vertex>>();

            let indices = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect::<Vec<u32>>(),
                None => (0..vertices.len() as u32).collect(),
            };

            let material = primitive
                .material()
                .index()
                .and_then(|index| material_manager.get_gltf_material(file_name, index));

            let mut model_primitive = ModelPrimitive {
                index: primitive.index(),
                vertices,
                indices,
                material,
            };

            if reader.read_normals().is_none() {
                model_primitive.compute_normals();
            }

            if !has_tangents {
                if let Err(err) = model_primitive.generate_tangents() {
                    log::warn!("{} (primitive {}): {}", model.name, primitive.index(), err);
                }
            }

            model.primitives.push(model_primitive);
        }

        if model.primitives.is_empty() {
            bail!("Mesh without primitives: {}", model.name);
        }

        Ok(model)
    }

    /// Builds one model out of every mesh in an OBJ file. `materials` maps tobj
    /// material indices to registered materials.
    pub fn from_obj(
        name: impl Into<String>,
        obj_models: &[tobj::Model],
        materials: &[MaterialId],
    ) -> anyhow::Result<Model> {
        let mut model = Model {
            name: name.into(),
            primitives: Vec::new(),
        };

        for (index, obj_model) in obj_models.iter().enumerate() {
            let mesh = &obj_model.mesh;
            let vertex_count = mesh.positions.len() / 3;
            let has_normals = mesh.normals.len() == mesh.positions.len();
            let has_tex_coords = mesh.texcoords.len() / 2 == vertex_count;

            let vertices = (0..vertex_count)
                .map(|i| Vertex {
                    position: Vec3::from_slice(&mesh.positions[i * 3..i * 3 + 3]),
                    normal: if has_normals {
                        Vec3::from_slice(&mesh.normals[i * 3..i * 3 + 3])
                    } else {
                        Vec3::ZERO
                    },
                    tex_coords: if has_tex_coords {
                        Vec2::from_slice(&mesh.texcoords[i * 2..i * 2 + 2])
                    } else {
                        Vec2::ZERO
                    },
                    tangent: Vec3::ZERO,
                })
                .collect();

            let mut primitive = ModelPrimitive {
                index,
                vertices,
                indices: mesh.indices.clone(),
                material: mesh
                    .material_id
                    .and_then(|material_index| materials.get(material_index).copied()),
            };

            if primitive.indices.is_empty() {
                continue;
            }

            if !has_normals {
                primitive.compute_normals();
            }

            if let Err(err) = primitive.generate_tangents() {
                log::warn!("{} ({}): {}", model.name, obj_model.name, err);
            }

            model.primitives.push(primitive);
        }

        if model.primitives.is_empty() {
            bail!("OBJ without geometry: {}", model.name);
        }

        Ok(model)
    }
}

pub const RENDER_MODEL_VBL: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, position) as wgpu::BufferAddress,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, normal) as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, tex_coords) as wgpu::BufferAddress,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x2,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, tangent) as wgpu::BufferAddress,
            shader_location: 3,
            format: wgpu::VertexFormat::Float32x3,
        },
    ],
};
