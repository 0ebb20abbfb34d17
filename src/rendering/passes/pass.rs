use std::sync::Arc;

use wgpu::RenderPass;

use crate::rendering::{
    render_common::RenderCommon,
    shader_loader::{PipelineCache, PipelineCacheBuilder},
};

/// Layouts and shared resources available while passes create their pipelines.
pub struct PassCreationContext<'a> {
    pub common: Arc<RenderCommon>,
    pub object_bind_group_layout: &'a wgpu::BindGroupLayout,
    pub material_bind_group_layout: &'a wgpu::BindGroupLayout,
}

pub trait Pass {
    type TextureViews;

    fn create(
        device: &wgpu::Device,
        context: &PassCreationContext,
        cache_builder: &mut PipelineCacheBuilder,
    ) -> anyhow::Result<Self>
    where
        Self: Sized;

    fn render<'a, F>(
        &self,
        texture_views: &Self::TextureViews,
        encoder: &mut wgpu::CommandEncoder,
        pipeline_cache: &PipelineCache,
        render_callback: F,
    ) where
        F: FnOnce(&mut RenderPass) + 'a;
}
