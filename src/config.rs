//! Declarative description of the hero scene, loaded from a RON file.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::{Path, PathBuf},
};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    scene_graph::Property,
    tween::{Axis, TweenDirective},
};

pub const DEFAULT_CONFIG_PATH: &str = "assets/hero_scene.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("slot `{0}` is declared more than once")]
    DuplicateSlot(String),
    #[error("asset `{0}` is declared more than once")]
    DuplicateAsset(String),
    #[error("`{owner}` references unknown asset `{asset}`")]
    UnknownAsset { owner: String, asset: String },
    #[error("`{owner}` references unknown material `{material}`")]
    UnknownMaterial { owner: String, material: String },
    #[error("region `{region}` animates unknown slot `{slot}`")]
    UnknownSlot { region: String, slot: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeroConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    pub camera: CameraConfig,
    #[serde(default)]
    pub lighting: LightingConfig,
    #[serde(default)]
    pub backdrop: BackdropConfig,
    #[serde(default)]
    pub materials: Vec<MaterialConfig>,
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
    pub objects: Vec<ObjectConfig>,
    #[serde(default)]
    pub regions: Vec<RegionConfig>,

    /// Directory that asset paths are relative to.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Hero".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    #[serde(default)]
    pub watch_shaders: bool,
    #[serde(default)]
    pub debug_overlay: bool,
    /// Relative to the config file.
    #[serde(default = "default_shader_dir")]
    pub shader_dir: PathBuf,
}

fn default_shader_dir() -> PathBuf {
    PathBuf::from("shaders")
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            watch_shaders: false,
            debug_overlay: false,
            shader_dir: default_shader_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub eye: Vec3,
    pub target: Vec3,
    #[serde(default = "default_fov")]
    pub fov_y_degrees: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
}

fn default_fov() -> f32 {
    75.0
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    1000.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionalLightConfig {
    pub color: Vec3,
    pub intensity: f32,
    /// The light shines from here towards the origin.
    pub position: Vec3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightingConfig {
    pub directional: DirectionalLightConfig,
    pub ambient: Vec3,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            directional: DirectionalLightConfig {
                color: Vec3::ONE,
                intensity: 1.0,
                position: Vec3::splat(5.0),
            },
            ambient: Vec3::splat(0x44 as f32 / 255.0),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackdropConfig {
    pub base_color: Vec3,
    #[serde(default)]
    pub transition: f32,
    #[serde(default)]
    pub classes: BTreeMap<String, Vec3>,
}

impl BackdropConfig {
    pub fn class_colors(&self) -> HashMap<String, Vec3> {
        self.classes
            .iter()
            .map(|(class, color)| (class.clone(), *color))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialConfig {
    pub name: String,
    pub color: Vec3,
    #[serde(default)]
    pub metalness: f32,
    #[serde(default = "default_roughness")]
    pub roughness: f32,
    /// Texture asset names.
    #[serde(default)]
    pub diffuse: Option<String>,
    #[serde(default)]
    pub normal: Option<String>,
    #[serde(default)]
    pub roughness_map: Option<String>,
}

fn default_roughness() -> f32 {
    1.0
}

impl MaterialConfig {
    pub fn textures(&self) -> impl Iterator<Item = &str> {
        [&self.diffuse, &self.normal, &self.roughness_map]
            .into_iter()
            .filter_map(|texture| texture.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ObjectSource {
    Box {
        size: Vec3,
    },
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        radial_segments: u32,
    },
    Model {
        asset: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectConfig {
    pub slot: String,
    pub source: ObjectSource,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub position: Vec3,
    /// Euler angles in radians, XYZ order.
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

impl ObjectConfig {
    /// The idle value of a field before any animation touches it.
    pub fn rest_value(&self, property: Property) -> Vec3 {
        match property {
            Property::Position => self.position,
            Property::Rotation => self.rotation,
            Property::Scale => self.scale,
            Property::Tint => Vec3::ONE,
        }
    }
}

/// Rectangle in normalized window coordinates, origin at the top left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Tween(TweenDirective),
    AddClass(String),
    RemoveClass(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    pub bounds: Rect,
    pub enter: Vec<Action>,
    pub leave: Vec<Action>,
}

/// A field that a region's enter batch moves and its leave batch does not bring back.
#[derive(Debug, Clone, PartialEq)]
pub struct RestDrift {
    pub region: String,
    pub slot: String,
    pub property: Property,
    pub axis: Axis,
    pub rest: f32,
    pub after_leave: f32,
}

impl HeroConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_ron_str(&source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        Ok(config)
    }

    pub fn from_ron_str(source: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(source)
    }

    pub fn asset_path(&self, asset: &AssetConfig) -> PathBuf {
        self.base_dir.join(&asset.path)
    }

    pub fn object(&self, slot: &str) -> Option<&ObjectConfig> {
        self.objects.iter().find(|object| object.slot == slot)
    }

    /// Checks that every name used in the file refers to something declared.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut assets = HashSet::new();
        for asset in &self.assets {
            if !assets.insert(asset.name.as_str()) {
                return Err(ConfigError::DuplicateAsset(asset.name.clone()));
            }
        }

        let materials: HashSet<&str> = self.materials.iter().map(|m| m.name.as_str()).collect();

        for material in &self.materials {
            for texture in material.textures() {
                if !assets.contains(texture) {
                    return Err(ConfigError::UnknownAsset {
                        owner: material.name.clone(),
                        asset: texture.to_string(),
                    });
                }
            }
        }

        let mut slots = HashSet::new();
        for object in &self.objects {
            if !slots.insert(object.slot.as_str()) {
                return Err(ConfigError::DuplicateSlot(object.slot.clone()));
            }

            if let ObjectSource::Model { asset } = &object.source {
                if !assets.contains(asset.as_str()) {
                    return Err(ConfigError::UnknownAsset {
                        owner: object.slot.clone(),
                        asset: asset.clone(),
                    });
                }
            }

            if let Some(material) = &object.material {
                if !materials.contains(material.as_str()) {
                    return Err(ConfigError::UnknownMaterial {
                        owner: object.slot.clone(),
                        material: material.clone(),
                    });
                }
            }
        }

        for region in &self.regions {
            for action in region.enter.iter().chain(&region.leave) {
                if let Action::Tween(directive) = action {
                    if !slots.contains(directive.slot.as_str()) {
                        return Err(ConfigError::UnknownSlot {
                            region: region.name.clone(),
                            slot: directive.slot.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Fields that do not return to their initial value after a region's enter
    /// batch followed by its leave batch. Repeated hovering drifts these.
    pub fn rest_drift(&self) -> Vec<RestDrift> {
        let mut drift = Vec::new();

        for region in &self.regions {
            let mut finals: BTreeMap<(String, usize, usize), (Property, Axis, f32)> = BTreeMap::new();

            for action in region.enter.iter().chain(&region.leave) {
                let Action::Tween(directive) = action else {
                    continue;
                };

                for (axis, value) in directive.to.iter() {
                    let key = (
                        directive.slot.clone(),
                        directive.property as usize,
                        axis as usize,
                    );
                    finals.insert(key, (directive.property, axis, value));
                }
            }

            for ((slot, _, _), (property, axis, after_leave)) in finals {
                let Some(object) = self.object(&slot) else {
                    continue;
                };

                let rest = axis.get(object.rest_value(property));
                if (rest - after_leave).abs() > 1e-6 {
                    drift.push(RestDrift {
                        region: region.name.clone(),
                        slot,
                        property,
                        axis,
                        rest,
                        after_leave,
                    });
                }
            }
        }

        drift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIPPED: &str = include_str!("../assets/hero_scene.ron");

    fn shipped() -> HeroConfig {
        HeroConfig::from_ron_str(SHIPPED).expect("shipped config parses")
    }

    const MINIMAL: &str = r#"#![enable(implicit_some)]
        (
            camera: (eye: (0.0, 2.0, 5.0), target: (0.0, 1.0, 0.0)),
            assets: [(name: "chair", path: "models/chair.obj")],
            objects: [
                (slot: "table", source: Box(size: (8.0, 0.2, 1.0))),
                (slot: "chair2", source: Model(asset: "chair"), position: (-5.0, 0.5, 2.0), scale: (0.0, 0.0, 0.0)),
            ],
            regions: [
                (
                    name: "text-right",
                    bounds: (x: 0.5, y: 0.0, width: 0.5, height: 1.0),
                    enter: [
                        Tween((slot: "table", property: Scale, to: (x: 1.45))),
                        Tween((slot: "chair2", property: Position, to: (x: -2.6))),
                        AddClass("pacman-hover"),
                    ],
                    leave: [
                        Tween((slot: "table", property: Scale, to: (x: 1.0))),
                        RemoveClass("pacman-hover"),
                    ],
                ),
            ],
        )
    "#;

    #[test]
    fn shipped_config_is_valid_and_drift_free() {
        let config = shipped();
        config.validate().unwrap();
        assert_eq!(config.rest_drift(), Vec::new());
        assert_eq!(config.regions.len(), 2);
    }

    #[test]
    fn defaults_are_filled_in() {
        let config = HeroConfig::from_ron_str(MINIMAL).unwrap();

        assert_eq!(config.camera.fov_y_degrees, 75.0);
        assert_eq!(config.camera.far, 1000.0);
        assert_eq!(config.objects[0].scale, Vec3::ONE);

        let Action::Tween(directive) = &config.regions[0].enter[0] else {
            panic!("expected a tween");
        };
        assert_eq!(directive.duration, 0.5);
        assert_eq!(directive.to, crate::tween::Axes { x: Some(1.45), ..Default::default() });
    }

    #[test]
    fn leave_batch_that_forgets_a_field_is_reported() {
        let config = HeroConfig::from_ron_str(MINIMAL).unwrap();
        let drift = config.rest_drift();

        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].slot, "chair2");
        assert_eq!(drift[0].property, Property::Position);
        assert_eq!(drift[0].rest, -5.0);
        assert_eq!(drift[0].after_leave, -2.6);
    }

    #[test]
    fn dangling_references_are_rejected() {
        let mut config = HeroConfig::from_ron_str(MINIMAL).unwrap();
        config.assets.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownAsset { asset, .. }) if asset == "chair"
        ));

        let mut config = HeroConfig::from_ron_str(MINIMAL).unwrap();
        config.objects[0].material = Some("marble".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::UnknownMaterial { .. })));

        let mut config = HeroConfig::from_ron_str(MINIMAL).unwrap();
        config.objects.pop();
        assert!(matches!(config.validate(), Err(ConfigError::UnknownSlot { .. })));

        let mut config = HeroConfig::from_ron_str(MINIMAL).unwrap();
        let table = config.objects[0].clone();
        config.objects.push(table);
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateSlot(slot)) if slot == "table"));
    }

    #[test]
    fn rect_contains_is_half_open() {
        let rect = Rect {
            x: 0.5,
            y: 0.0,
            width: 0.5,
            height: 1.0,
        };
        assert!(rect.contains(Vec2::new(0.5, 0.0)));
        assert!(rect.contains(Vec2::new(0.99, 0.99)));
        assert!(!rect.contains(Vec2::new(1.0, 0.5)));
        assert!(!rect.contains(Vec2::new(0.49, 0.5)));
    }

    #[test]
    fn asset_paths_are_relative_to_the_config_file() {
        let dir = std::env::temp_dir().join(format!("hero-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scene.ron");
        std::fs::write(&path, MINIMAL).unwrap();

        let config = HeroConfig::load(&path).unwrap();
        assert_eq!(config.asset_path(&config.assets[0]), dir.join("models/chair.obj"));

        assert!(matches!(
            HeroConfig::load(dir.join("missing.ron")),
            Err(ConfigError::Io { .. })
        ));
    }
}
