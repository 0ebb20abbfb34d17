use std::path::{Path, PathBuf};

use anyhow::Context;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::asset_pipeline::materials::TextureData;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub asset: String,
    pub path: PathBuf,
}

pub enum LoadedAsset {
    Gltf {
        document: gltf::Document,
        buffers: Vec<gltf::buffer::Data>,
        images: Vec<gltf::image::Data>,
    },
    Obj {
        models: Vec<tobj::Model>,
        materials: Vec<tobj::Material>,
    },
    Texture(TextureData),
}

impl LoadedAsset {
    pub fn kind(&self) -> &'static str {
        match self {
            LoadedAsset::Gltf { .. } => "glTF",
            LoadedAsset::Obj { .. } => "OBJ",
            LoadedAsset::Texture(_) => "texture",
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to import glTF {}: {source}", path.display())]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("failed to load OBJ {}: {source}", path.display())]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
    #[error("failed to decode image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("unsupported asset format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("loader task for {} did not complete: {source}", path.display())]
    Task {
        path: PathBuf,
        #[source]
        source: tokio::task::JoinError,
    },
}

pub struct LoadOutcome {
    pub request: LoadRequest,
    pub result: Result<LoadedAsset, LoadError>,
}

/// Decodes one file. The format is picked from the extension.
pub fn load_blocking(path: &Path) -> Result<LoadedAsset, LoadError> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("gltf" | "glb") => {
            let (document, buffers, images) =
                gltf::import(path).map_err(|source| LoadError::Gltf {
                    path: path.to_path_buf(),
                    source,
                })?;

            Ok(LoadedAsset::Gltf {
                document,
                buffers,
                images,
            })
        }
        Some("obj") => {
            let (models, materials) = tobj::load_obj(
                path,
                &tobj::LoadOptions {
                    triangulate: true,
                    single_index: true,
                    ..Default::default()
                },
            )
            .map_err(|source| LoadError::Obj {
                path: path.to_path_buf(),
                source,
            })?;

            let materials = materials.unwrap_or_else(|err| {
                log::warn!("{}: no usable MTL ({err}), using default materials", path.display());
                Vec::new()
            });

            Ok(LoadedAsset::Obj { models, materials })
        }
        Some("png" | "jpg" | "jpeg") => {
            let image = image::open(path).map_err(|source| LoadError::Image {
                path: path.to_path_buf(),
                source,
            })?;

            Ok(LoadedAsset::Texture(image.to_rgba8().into()))
        }
        _ => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Loads one file on the blocking pool. Every call is independent: nothing is cached or retried.
pub async fn load(path: PathBuf) -> Result<LoadedAsset, LoadError> {
    let task_path = path.clone();

    tokio::task::spawn_blocking(move || load_blocking(&task_path))
        .await
        .map_err(|source| LoadError::Task { path, source })?
}

pub struct AssetLoader {
    runtime: Option<tokio::runtime::Runtime>,
}

impl AssetLoader {
    pub fn new() -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("asset-loader")
            .build()
            .context("Failed to start asset loader runtime")?;

        Ok(Self {
            runtime: Some(runtime),
        })
    }

    /// Starts every request at once. Each outcome is delivered as soon as its own
    /// load finishes, in completion order.
    pub fn load_all(&self, requests: Vec<LoadRequest>) -> PendingAssets {
        let (sender, pending) = PendingAssets::channel(requests.len());

        let Some(runtime) = self.runtime.as_ref() else {
            return pending;
        };

        for request in requests {
            let sender = sender.clone();

            runtime.spawn(async move {
                let result = load(request.path.clone()).await;

                match &result {
                    Ok(asset) => log::info!("Loaded {} `{}`", asset.kind(), request.asset),
                    Err(err) => log::error!("Error loading `{}`: {err}", request.asset),
                }

                // The receiver is gone if the app shut down first
                let _ = sender.send(LoadOutcome { request, result });
            });
        }

        pending
    }
}

impl Drop for AssetLoader {
    fn drop(&mut self) {
        // A load stuck on a blocking read must not hold up shutdown
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

pub struct PendingAssets {
    receiver: mpsc::UnboundedReceiver<LoadOutcome>,
    total: usize,
    received: usize,
    closed: bool,
}

impl PendingAssets {
    pub(crate) fn channel(total: usize) -> (mpsc::UnboundedSender<LoadOutcome>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();

        let pending = Self {
            receiver,
            total,
            received: 0,
            closed: false,
        };

        (sender, pending)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// True once every request has reported back, or the loader went away.
    pub fn is_settled(&self) -> bool {
        self.closed || self.received >= self.total
    }

    /// Drains the outcomes that arrived since the last call.
    pub fn try_take(&mut self) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();

        while !self.is_settled() {
            match self.receiver.try_recv() {
                Ok(outcome) => {
                    self.received += 1;
                    outcomes.push(outcome);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.closed = true,
            }
        }

        outcomes
    }

    /// Blocks the calling thread until everything has settled. Must not be called from async code.
    #[cfg(test)]
    pub fn wait(mut self) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();

        while !self.is_settled() {
            match self.receiver.blocking_recv() {
                Some(outcome) => {
                    self.received += 1;
                    outcomes.push(outcome);
                }
                None => self.closed = true,
            }
        }

        outcomes
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TRIANGLE_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    pub(crate) fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hero-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn result_of<'a>(outcomes: &'a [LoadOutcome], asset: &str) -> &'a Result<LoadedAsset, LoadError> {
        &outcomes
            .iter()
            .find(|outcome| outcome.request.asset == asset)
            .unwrap()
            .result
    }

    #[test]
    fn one_failure_does_not_block_the_others() {
        let dir = scratch_dir("loader");
        std::fs::write(dir.join("chair.obj"), TRIANGLE_OBJ).unwrap();
        std::fs::write(dir.join("notes.txt"), "not a model").unwrap();

        let loader = AssetLoader::new().unwrap();
        let pending = loader.load_all(vec![
            LoadRequest {
                asset: "headset".into(),
                path: dir.join("headset.glb"),
            },
            LoadRequest {
                asset: "chair".into(),
                path: dir.join("chair.obj"),
            },
            LoadRequest {
                asset: "notes".into(),
                path: dir.join("notes.txt"),
            },
        ]);
        assert_eq!(pending.total(), 3);

        let outcomes = pending.wait();
        assert_eq!(outcomes.len(), 3);

        assert!(matches!(result_of(&outcomes, "headset"), Err(LoadError::Gltf { .. })));

        match result_of(&outcomes, "chair") {
            Ok(LoadedAsset::Obj { models, .. }) => assert_eq!(models[0].mesh.indices.len(), 3),
            _ => panic!("chair should have loaded"),
        }

        assert!(matches!(result_of(&outcomes, "notes"), Err(LoadError::UnsupportedFormat(_))));
    }

    #[test]
    fn outcomes_arrive_as_each_load_finishes() {
        let dir = scratch_dir("loader-incremental");
        std::fs::write(dir.join("chair.obj"), TRIANGLE_OBJ).unwrap();

        let (sender, mut pending) = PendingAssets::channel(2);
        assert!(pending.try_take().is_empty());
        assert!(!pending.is_settled());

        let path = dir.join("chair.obj");
        let chair = LoadOutcome {
            request: LoadRequest {
                asset: "chair".into(),
                path: path.clone(),
            },
            result: load_blocking(&path),
        };
        assert!(sender.send(chair).is_ok());

        let outcomes = pending.try_take();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].result.is_ok());
        assert!(!pending.is_settled());

        // Second request never reports back
        assert!(pending.try_take().is_empty());
        assert!(!pending.is_settled());

        drop(sender);
        assert!(pending.try_take().is_empty());
        assert!(pending.is_settled());
    }

    #[test]
    fn polling_collects_every_outcome() {
        let dir = scratch_dir("loader-poll");
        std::fs::write(dir.join("chair.obj"), TRIANGLE_OBJ).unwrap();

        let loader = AssetLoader::new().unwrap();
        let request = LoadRequest {
            asset: "chair".into(),
            path: dir.join("chair.obj"),
        };
        let mut pending = loader.load_all(vec![request.clone(), request]);

        let mut outcomes = Vec::new();
        for _ in 0..500 {
            outcomes.extend(pending.try_take());
            if pending.is_settled() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        assert!(pending.is_settled());
        assert_eq!(outcomes.len(), 2);
    }

    #[test]
    fn same_file_loads_independently() {
        let dir = scratch_dir("loader-twice");
        std::fs::write(dir.join("chair.obj"), TRIANGLE_OBJ).unwrap();

        let loader = AssetLoader::new().unwrap();
        let request = LoadRequest {
            asset: "chair".into(),
            path: dir.join("chair.obj"),
        };
        let outcomes = loader.load_all(vec![request.clone(), request]).wait();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|outcome| outcome.result.is_ok()));
    }

    #[test]
    fn textures_decode_to_rgba() {
        let dir = scratch_dir("loader-texture");
        let path = dir.join("wood.png");
        image::RgbImage::from_pixel(2, 2, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        match load_blocking(&path) {
            Ok(LoadedAsset::Texture(texture)) => {
                assert_eq!((texture.width, texture.height), (2, 2));
                assert_eq!(&texture.pixels[..4], &[10, 20, 30, 255]);
            }
            _ => panic!("expected a texture"),
        }
    }

    #[test]
    fn empty_batch_settles_immediately() {
        let loader = AssetLoader::new().unwrap();
        assert!(loader.load_all(Vec::new()).wait().is_empty());
    }
}
