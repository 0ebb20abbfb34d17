use crate::rendering::global_uniform::GlobalUniform;

/// Resources every pass binds at group 0: the camera and the global uniform.
pub struct RenderCommon {
    pub surface_format: wgpu::TextureFormat,
    pub camera_uniform_buffer: wgpu::Buffer,
    pub global_uniform: GlobalUniform,
    pub frame_bind_group_layout: wgpu::BindGroupLayout,
    pub frame_bind_group: wgpu::BindGroup,
}

impl RenderCommon {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        camera_uniform_buffer: wgpu::Buffer,
        global_uniform: GlobalUniform,
    ) -> Self {
        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let frame_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Frame bind group layout"),
                entries: &[uniform_entry(0), uniform_entry(1)],
            });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame bind group"),
            layout: &frame_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: global_uniform.buffer.as_entire_binding(),
                },
            ],
        });

        Self {
            surface_format,
            camera_uniform_buffer,
            global_uniform,
            frame_bind_group_layout,
            frame_bind_group,
        }
    }
}
