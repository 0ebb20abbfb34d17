use glam::Vec3;

/// Tightly packed RGBA8 pixels.
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl From<image::RgbaImage> for TextureData {
    fn from(image: image::RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            pixels: image.into_raw(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Diffuse,
    Normal,
    Roughness,
}

#[derive(Debug, Clone)]
pub struct PbrMaterialData {
    pub name: String,
    pub base_color: Vec3,
    pub metalness: f32,
    pub roughness_factor: f32,
    pub diffuse: Option<TextureData>,
    pub normal: Option<TextureData>,
    // Roughness is read from the green channel, the same as glTF metallicRoughness.
    pub roughness: Option<TextureData>,
    /// Bumped whenever a texture changes so the GPU side knows to rebuild.
    pub revision: u32,
}

impl PbrMaterialData {
    pub fn new(name: impl Into<String>, base_color: Vec3, metalness: f32, roughness_factor: f32) -> Self {
        Self {
            name: name.into(),
            base_color,
            metalness,
            roughness_factor,
            diffuse: None,
            normal: None,
            roughness: None,
            revision: 0,
        }
    }

    pub fn set_texture(&mut self, kind: TextureKind, texture: TextureData) {
        let slot = match kind {
            TextureKind::Diffuse => &mut self.diffuse,
            TextureKind::Normal => &mut self.normal,
            TextureKind::Roughness => &mut self.roughness,
        };
        *slot = Some(texture);
        self.revision += 1;
    }
}
