use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: Mat4,
    pub normal: Mat4,
    pub tint: Vec4,
}

impl ObjectUniform {
    pub fn new(model: Mat4, normal: Mat4, tint: Vec3) -> Self {
        Self {
            model,
            normal,
            tint: tint.extend(1.0),
        }
    }
}

const UNIFORM_SIZE: u64 = std::mem::size_of::<ObjectUniform>() as u64;

/// One uniform slot per drawn object, addressed with dynamic offsets.
pub struct ObjectBuffer {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    bind_group_layout: wgpu::BindGroupLayout,
    stride: u64,
    capacity: usize,
    staging: Vec<u8>,
}

impl ObjectBuffer {
    const INITIAL_CAPACITY: usize = 64;

    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = stride_for(alignment);
        let (buffer, bind_group) =
            Self::allocate(device, &bind_group_layout, stride, Self::INITIAL_CAPACITY);

        Self {
            buffer,
            bind_group,
            bind_group_layout,
            stride,
            capacity: Self::INITIAL_CAPACITY,
            staging: Vec::new(),
        }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Object uniform buffer"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(UNIFORM_SIZE),
                }),
            }],
        });

        (buffer, bind_group)
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn offset(&self, index: usize) -> u32 {
        (index as u64 * self.stride) as u32
    }

    /// Writes `objects` to slots `0..objects.len()`, growing the buffer if needed.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, objects: &[ObjectUniform]) {
        if objects.is_empty() {
            return;
        }

        if objects.len() > self.capacity {
            let capacity = objects.len().next_power_of_two();
            log::debug!("Growing object buffer to {capacity} slots");

            let (buffer, bind_group) =
                Self::allocate(device, &self.bind_group_layout, self.stride, capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }

        self.staging.clear();
        self.staging.resize(objects.len() * self.stride as usize, 0);

        for (slot, object) in self.staging.chunks_mut(self.stride as usize).zip(objects) {
            slot[..UNIFORM_SIZE as usize].copy_from_slice(bytemuck::bytes_of(object));
        }

        queue.write_buffer(&self.buffer, 0, &self.staging);
    }
}

fn stride_for(alignment: u64) -> u64 {
    UNIFORM_SIZE.div_ceil(alignment.max(1)) * alignment.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_respects_offset_alignment() {
        assert_eq!(UNIFORM_SIZE, 144);
        assert_eq!(stride_for(256), 256);
        assert_eq!(stride_for(64), 192);
        assert_eq!(stride_for(16), 144);
    }
}
