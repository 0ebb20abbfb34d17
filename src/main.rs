use anyhow::{Context, Result};

mod asset_loader;
mod asset_pipeline;
mod backdrop;
mod camera;
mod config;
mod debug_ui;
mod hero;
mod hover;
mod material_manager;
mod model;
mod rendering;
mod scene_builder;
mod scene_graph;
mod tween;
mod window;

use config::{HeroConfig, DEFAULT_CONFIG_PATH};

fn main() -> Result<()> {
    pretty_env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = HeroConfig::load(&path).with_context(|| format!("Failed to load {path}"))?;
    config.validate().context("Invalid scene config")?;

    for drift in config.rest_drift() {
        log::warn!(
            "{}: {} {:?}.{:?} rests at {} but is left at {} after leaving",
            drift.region,
            drift.slot,
            drift.property,
            drift.axis,
            drift.rest,
            drift.after_leave
        );
    }

    pollster::block_on(window::run(config))?;

    Ok(())
}
