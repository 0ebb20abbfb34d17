use std::{sync::Arc, time::Instant};

use anyhow::Context;
use glam::Vec2;
use imgui::{FontConfig, FontSource};
use imgui_winit_support::WinitPlatform;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{Event, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::{config::HeroConfig, debug_ui, hero::HeroState, rendering::renderer::Renderer};

/// Longest step fed to the animations after a stall.
const MAX_FRAME_TIME: f32 = 0.1;

struct ImguiState {
    context: imgui::Context,
    platform: WinitPlatform,
}

struct App {
    renderer: Option<Renderer>,
    hero: HeroState,
    imgui: Option<ImguiState>,
    last_frame: Instant,
    startup_error: Option<anyhow::Error>,
}

impl App {
    fn new(hero: HeroState) -> Self {
        Self {
            renderer: None,
            hero,
            imgui: None,
            last_frame: Instant::now(),
            startup_error: None,
        }
    }

    fn setup_imgui(&mut self, window: &Window) {
        let mut context = imgui::Context::create();
        let mut platform = WinitPlatform::new(&mut context);
        platform.attach_window(
            context.io_mut(),
            window,
            imgui_winit_support::HiDpiMode::Default,
        );

        let font_size = 14.0;
        context.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                oversample_h: 1,
                pixel_snap_h: true,
                size_pixels: font_size,
                ..Default::default()
            }),
        }]);

        // Disable INI support because it's broken in the published version of imgui
        context.set_ini_filename(None);

        self.imgui = Some(ImguiState { context, platform });
    }

    fn create_renderer(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_config = &self.hero.config.window;
        let window_attributes = Window::default_attributes()
            .with_title(window_config.title.clone())
            .with_inner_size(LogicalSize::new(window_config.width, window_config.height));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create window")?,
        );

        if self.hero.config.renderer.debug_overlay {
            self.setup_imgui(&window);
        }

        let size = window.inner_size();
        self.hero.resize(size.width, size.height);

        let renderer = pollster::block_on(Renderer::new(
            window,
            &self.hero,
            self.imgui.as_mut().map(|imgui| &mut imgui.context),
        ))?;
        renderer.window.request_redraw();
        self.renderer = Some(renderer);

        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        let now = Instant::now();
        let delta_time = now - self.last_frame;
        self.last_frame = now;

        self.hero
            .update(delta_time.as_secs_f32().min(MAX_FRAME_TIME));

        if let Some(imgui) = self.imgui.as_mut() {
            imgui.context.io_mut().update_delta_time(delta_time);

            if let Err(err) = imgui
                .platform
                .prepare_frame(imgui.context.io_mut(), &renderer.window)
            {
                log::warn!("Failed to prepare Imgui frame: {err}");
            }

            let ui = imgui.context.new_frame();
            debug_ui::draw(&self.hero, ui);
            imgui.platform.prepare_render(ui, &renderer.window);
        }

        let imgui_context = self.imgui.as_mut().map(|imgui| &mut imgui.context);
        match renderer.render(&mut self.hero, imgui_context) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                renderer.resize(renderer.size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of memory");
                event_loop.exit();
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timeout");
            }
            Err(other) => {
                log::error!("Unexpected error: {:?}", other);
            }
        }

        renderer.window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        if let Err(err) = self.create_renderer(event_loop) {
            self.startup_error = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        match &event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(*new_size);
                }
                self.hero.resize(new_size.width, new_size.height);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.hero
                    .pointer_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => {
                self.hero.pointer_left();
            }
            _ => (),
        }

        if let (Some(imgui), Some(renderer)) = (self.imgui.as_mut(), self.renderer.as_ref()) {
            imgui.platform.handle_event::<()>(
                imgui.context.io_mut(),
                renderer.window.as_ref(),
                &Event::WindowEvent { window_id, event },
            );
        }
    }
}

pub async fn run(config: HeroConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let hero = HeroState::new(config).context("Failed to create hero state")?;
    let mut app = App::new(hero);
    event_loop.run_app(&mut app)?;

    match app.startup_error.take() {
        Some(err) => Err(err.context("Failed to start renderer")),
        None => Ok(()),
    }
}
