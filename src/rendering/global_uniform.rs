use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::config::LightingConfig;

/// Per-frame values shared by every pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct GlobalUniformState {
    /// Unit vector pointing towards the light.
    pub light_direction: Vec4,
    /// Colour premultiplied by intensity.
    pub light_color: Vec4,
    pub ambient: Vec4,
    pub backdrop: Vec4,
    pub resolution: [f32; 2],
    pub now: f32,
    _padding: f32,
}

impl GlobalUniformState {
    pub fn new(
        lighting: &LightingConfig,
        backdrop: Vec3,
        resolution: PhysicalSize<u32>,
        now: f32,
    ) -> Self {
        let light = &lighting.directional;

        Self {
            light_direction: light.position.normalize_or(Vec3::Y).extend(0.0),
            light_color: (light.color * light.intensity).extend(1.0),
            ambient: lighting.ambient.extend(1.0),
            backdrop: backdrop.extend(1.0),
            resolution: [resolution.width as f32, resolution.height as f32],
            now,
            _padding: 0.0,
        }
    }
}

pub struct GlobalUniform {
    pub buffer: wgpu::Buffer,
}

impl GlobalUniform {
    pub fn new(device: &wgpu::Device, initial_state: GlobalUniformState) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Global uniform buffer"),
            contents: bytemuck::cast_slice(&[initial_state]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self { buffer }
    }

    pub fn update(&self, queue: &wgpu::Queue, state: GlobalUniformState) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[state]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_the_shader_struct() {
        assert_eq!(std::mem::size_of::<GlobalUniformState>(), 80);
    }

    #[test]
    fn light_points_from_the_origin_towards_its_position() {
        let state = GlobalUniformState::new(
            &LightingConfig::default(),
            Vec3::ZERO,
            PhysicalSize::new(1280, 720),
            0.0,
        );

        let direction = state.light_direction.truncate();
        assert!((direction - Vec3::splat(1.0 / 3f32.sqrt())).length() < 1e-6);
        assert_eq!(state.resolution, [1280.0, 720.0]);
    }
}
