pub mod global_uniform;
pub mod imgui_renderer;
pub mod object_buffer;
pub mod passes;
pub mod render_common;
pub mod render_material_manager;
pub mod render_model;
pub mod renderer;
pub mod shader_loader;
pub mod texture;
