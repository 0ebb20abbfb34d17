use std::sync::Arc;

use anyhow::Context;
use id_arena::Arena;
use wgpu::CommandEncoderDescriptor;
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    camera::CameraUniform,
    hero::HeroState,
    material_manager::MaterialId,
    rendering::{
        global_uniform::{GlobalUniform, GlobalUniformState},
        imgui_renderer::ImguiRendererState,
        object_buffer::{ObjectBuffer, ObjectUniform},
        passes::{
            background_pass::{BackgroundPass, BackgroundPassTextureViews},
            mesh_pass::{MeshPass, MeshPassTextureViews},
            pass::{Pass, PassCreationContext},
        },
        render_common::RenderCommon,
        render_material_manager::RenderMaterialManager,
        render_model::{RenderModel, RenderModelId},
        shader_loader::{PipelineCacheBuilder, ShaderLoader},
        texture::DepthTexture,
    },
};

struct DrawItem {
    render_model: RenderModelId,
    material_override: Option<MaterialId>,
}

pub struct Renderer {
    pub window: Arc<Window>,
    pub size: PhysicalSize<u32>,

    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,

    common: Arc<RenderCommon>,
    camera_uniform: CameraUniform,
    depth_texture: DepthTexture,
    render_models: Arena<RenderModel>,
    materials: RenderMaterialManager,
    objects: ObjectBuffer,

    shader_loader: ShaderLoader,
    background_pass: BackgroundPass,
    mesh_pass: MeshPass,
    imgui: Option<ImguiRendererState>,

    draws: Vec<DrawItem>,
    object_uniforms: Vec<ObjectUniform>,
}

impl Renderer {
    pub async fn new(
        window: Arc<Window>,
        hero: &HeroState,
        imgui_context: Option<&mut imgui::Context>,
    ) -> anyhow::Result<Renderer> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No compatible GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .context("Surface reports no formats")?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let mut camera_uniform = CameraUniform::default();
        camera_uniform.update(&hero.camera);
        let camera_uniform_buffer = camera_uniform.create_buffer(&device);

        let global_uniform = GlobalUniform::new(
            &device,
            GlobalUniformState::new(&hero.config.lighting, hero.backdrop.color(), size, 0.0),
        );

        let common = Arc::new(RenderCommon::new(
            &device,
            surface_format,
            camera_uniform_buffer,
            global_uniform,
        ));

        let depth_texture = DepthTexture::new(&device, size, "Depth Texture");
        let materials = RenderMaterialManager::new(&device, &queue);
        let objects = ObjectBuffer::new(&device);

        let pass_context = PassCreationContext {
            common: common.clone(),
            object_bind_group_layout: objects.bind_group_layout(),
            material_bind_group_layout: materials.bind_group_layout(),
        };

        let mut cache_builder = PipelineCacheBuilder::new();
        let background_pass = BackgroundPass::create(&device, &pass_context, &mut cache_builder)?;
        let mesh_pass = MeshPass::create(&device, &pass_context, &mut cache_builder)?;

        let renderer_config = &hero.config.renderer;
        let shader_loader = ShaderLoader::new(
            device.clone(),
            cache_builder,
            &hero.config.base_dir.join(&renderer_config.shader_dir),
            renderer_config.watch_shaders,
        )?;

        let imgui = imgui_context
            .map(|context| ImguiRendererState::new(&device, &queue, surface_format, context));

        log::info!(
            "Renderer ready: {}x{} {:?} on {}",
            size.width,
            size.height,
            surface_format,
            adapter.get_info().name
        );

        Ok(Self {
            window,
            size,
            surface,
            surface_config,
            device,
            queue,
            common,
            camera_uniform,
            depth_texture,
            render_models: Arena::new(),
            materials,
            objects,
            shader_loader,
            background_pass,
            mesh_pass,
            imgui,
            draws: Vec::new(),
            object_uniforms: Vec::new(),
        })
    }

    /// Uploads every scene model that does not have a GPU copy yet.
    fn upload_models(&mut self, hero: &mut HeroState) {
        for (_id, scene_model) in hero.scene.models.iter_mut() {
            if scene_model.render_model.is_some() {
                continue;
            }

            let render_model = RenderModel::from_model(&self.device, &scene_model.model);
            scene_model.render_model = Some(self.render_models.alloc(render_model));
            log::info!(
                "Uploaded model {} with {} primitives",
                scene_model.model.name,
                scene_model.model.primitives.len()
            );
        }
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.surface_config.width = new_size.width;
            self.surface_config.height = new_size.height;
            self.surface.configure(&self.device, &self.surface_config);
            self.depth_texture.resize(&self.device, new_size);
        }
    }

    fn gather_draws(&mut self, hero: &HeroState) {
        self.draws.clear();
        self.object_uniforms.clear();

        let scene = &hero.scene;
        scene.visit_visible(|_, object, tint| {
            let Some(render_model) = object
                .model_id
                .and_then(|model_id| scene.models.get(model_id))
                .and_then(|scene_model| scene_model.render_model)
            else {
                return;
            };

            self.object_uniforms.push(ObjectUniform::new(
                *object.transform.get_world_matrix(),
                *object.transform.get_normal_matrix(),
                tint,
            ));
            self.draws.push(DrawItem {
                render_model,
                material_override: object.material_override,
            });
        });
    }

    pub fn render(
        &mut self,
        hero: &mut HeroState,
        imgui_context: Option<&mut imgui::Context>,
    ) -> Result<(), wgpu::SurfaceError> {
        self.shader_loader.load_pending_shaders();

        self.upload_models(hero);
        self.materials.sync(&hero.materials);

        self.camera_uniform.update(&hero.camera);
        self.camera_uniform
            .update_buffer(&self.queue, &self.common.camera_uniform_buffer);
        self.common.global_uniform.update(
            &self.queue,
            GlobalUniformState::new(
                &hero.config.lighting,
                hero.backdrop.color(),
                self.size,
                hero.start_time.elapsed().as_secs_f32(),
            ),
        );

        self.gather_draws(hero);
        self.objects
            .upload(&self.device, &self.queue, &self.object_uniforms);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let pipeline_cache = &self.shader_loader.cache;

        self.background_pass.render(
            &BackgroundPassTextureViews {
                color: view.clone(),
            },
            &mut encoder,
            pipeline_cache,
            |_| {},
        );

        let default_material = hero.materials.default_material();
        let draws = &self.draws;
        let render_models = &self.render_models;
        let objects = &self.objects;
        let materials = &self.materials;

        self.mesh_pass.render(
            &MeshPassTextureViews {
                color: view.clone(),
                depth: self.depth_texture.view().clone(),
            },
            &mut encoder,
            pipeline_cache,
            |render_pass| {
                for (index, draw) in draws.iter().enumerate() {
                    let Some(render_model) = render_models.get(draw.render_model) else {
                        continue;
                    };

                    render_pass.set_bind_group(1, objects.bind_group(), &[objects.offset(index)]);

                    for primitive in &render_model.primitives {
                        let material = draw
                            .material_override
                            .or(primitive.material)
                            .unwrap_or(default_material);
                        let Some(bind_group) = materials
                            .bind_group(material)
                            .or_else(|| materials.bind_group(default_material))
                        else {
                            continue;
                        };

                        render_pass.set_bind_group(2, bind_group, &[]);
                        render_pass.set_vertex_buffer(0, primitive.vertex_buffer.slice(..));
                        render_pass.set_index_buffer(
                            primitive.index_buffer.slice(..),
                            wgpu::IndexFormat::Uint32,
                        );
                        render_pass.draw_indexed(0..primitive.num_indices, 0, 0..1);
                    }
                }
            },
        );

        if let (Some(imgui), Some(context)) = (self.imgui.as_mut(), imgui_context) {
            imgui.render(&view, context, &self.device, &self.queue, &mut encoder);
        }

        self.queue.submit([encoder.finish()]);
        output.present();

        Ok(())
    }
}
