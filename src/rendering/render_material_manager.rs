use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use wgpu::{util::DeviceExt, TexelCopyBufferLayout, TexelCopyTextureInfo, TextureDescriptor};

use crate::{
    asset_pipeline::materials::{PbrMaterialData, TextureData, TextureKind},
    material_manager::{MaterialId, MaterialManager},
};

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    pub metalness: f32,
    pub roughness: f32,
    _padding: [f32; 2],
}

impl From<&PbrMaterialData> for MaterialUniform {
    fn from(material: &PbrMaterialData) -> Self {
        Self {
            base_color: material.base_color.extend(1.0).to_array(),
            metalness: material.metalness,
            roughness: material.roughness_factor,
            _padding: [0.0; 2],
        }
    }
}

struct GpuMaterial {
    revision: u32,
    bind_group: wgpu::BindGroup,
}

/// Keeps one bind group per material, rebuilt whenever the material's revision changes.
pub struct RenderMaterialManager {
    device: wgpu::Device,
    queue: wgpu::Queue,

    sampler: wgpu::Sampler,
    default_diffuse: wgpu::TextureView,
    default_normal: wgpu::TextureView,
    default_roughness: wgpu::TextureView,

    bind_group_layout: wgpu::BindGroupLayout,
    materials: HashMap<MaterialId, GpuMaterial>,
}

impl RenderMaterialManager {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let default_diffuse = Self::create_default_texture(device, queue, TextureKind::Diffuse);
        let default_normal = Self::create_default_texture(device, queue, TextureKind::Normal);
        let default_roughness = Self::create_default_texture(device, queue, TextureKind::Roughness);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(1),
                texture_entry(2),
                texture_entry(3),
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        Self {
            device: device.clone(),
            queue: queue.clone(),
            sampler,
            default_diffuse,
            default_normal,
            default_roughness,
            bind_group_layout,
            materials: HashMap::new(),
        }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn bind_group(&self, id: MaterialId) -> Option<&wgpu::BindGroup> {
        self.materials.get(&id).map(|material| &material.bind_group)
    }

    /// Uploads new materials and rebuilds the ones whose textures changed.
    pub fn sync(&mut self, material_manager: &MaterialManager) {
        for (id, material) in material_manager.materials() {
            let up_to_date = self
                .materials
                .get(&id)
                .is_some_and(|gpu| gpu.revision == material.revision);

            if up_to_date {
                continue;
            }

            let bind_group = self.create_bind_group(material);
            log::debug!("Uploaded material {} (rev {})", material.name, material.revision);

            self.materials.insert(
                id,
                GpuMaterial {
                    revision: material.revision,
                    bind_group,
                },
            );
        }
    }

    fn create_bind_group(&self, material: &PbrMaterialData) -> wgpu::BindGroup {
        let uniform = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} uniform", material.name)),
                contents: bytemuck::cast_slice(&[MaterialUniform::from(material)]),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let diffuse = self.texture_view(&material.name, TextureKind::Diffuse, material.diffuse.as_ref());
        let normal = self.texture_view(&material.name, TextureKind::Normal, material.normal.as_ref());
        let roughness =
            self.texture_view(&material.name, TextureKind::Roughness, material.roughness.as_ref());

        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} bind group", material.name)),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&diffuse),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&normal),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&roughness),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    fn texture_view(
        &self,
        name: &str,
        kind: TextureKind,
        data: Option<&TextureData>,
    ) -> wgpu::TextureView {
        let default = match kind {
            TextureKind::Diffuse => &self.default_diffuse,
            TextureKind::Normal => &self.default_normal,
            TextureKind::Roughness => &self.default_roughness,
        };

        let Some(data) = data else {
            return default.clone();
        };

        if data.pixels.len() != data.width as usize * data.height as usize * 4 {
            log::warn!("{name}: {kind:?} texture has the wrong size, using the default");
            return default.clone();
        }

        let label = format!("{name} ({kind:?})");
        let texture = self.device.create_texture_with_data(
            &self.queue,
            &TextureDescriptor {
                label: Some(&label),
                size: wgpu::Extent3d {
                    width: data.width,
                    height: data.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: texture_format(kind),
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &data.pixels,
        );

        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_default_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        kind: TextureKind,
    ) -> wgpu::TextureView {
        let label = format!("Default Texture ({:?})", kind);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(kind),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        // Neutral values: the material factors apply unchanged
        let placeholder_data: [u8; 4] = match kind {
            TextureKind::Diffuse => [255, 255, 255, 255],
            TextureKind::Normal => [128, 128, 255, 255],
            TextureKind::Roughness => [255, 255, 255, 255],
        };

        queue.write_texture(
            TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &placeholder_data,
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }
}

fn texture_format(kind: TextureKind) -> wgpu::TextureFormat {
    match kind {
        TextureKind::Diffuse => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureKind::Normal | TextureKind::Roughness => wgpu::TextureFormat::Rgba8Unorm,
    }
}
