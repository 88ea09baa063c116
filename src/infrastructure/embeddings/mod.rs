pub mod bm25;
pub mod simple_engine;
pub mod tokenizer;

#[cfg(feature = "fastembed-engine")]
pub mod fastembed_engine;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

pub use bm25::{Bm25Encoder, Bm25Params};
#[cfg(feature = "fastembed-engine")]
pub use fastembed_engine::FastEmbedEngine;
pub use simple_engine::SimpleEmbedEngine;
pub use tokenizer::TokenizerOptions;

use crate::application::services::DenseEncoder;
use crate::domain::{Device, SetupError};
use crate::settings::DenseBackend;

/// Instantiate the configured dense backend on `device`.
pub fn build_dense_encoder(
    backend: &DenseBackend,
    device: Device,
    cache_dir: Option<&Path>,
) -> Result<Arc<dyn DenseEncoder>, SetupError> {
    match backend {
        DenseBackend::Simple { model, dimensions } => {
            let _ = cache_dir;
            if device == Device::Cuda {
                debug!(
                    target: "pinecone_bootstrap::models",
                    model = %model,
                    "hash encoder always runs on the CPU"
                );
            }
            let engine = SimpleEmbedEngine::try_new(model.clone(), *dimensions)?;
            Ok(Arc::new(engine))
        }
        #[cfg(feature = "fastembed-engine")]
        DenseBackend::FastEmbed { model } => {
            let cache_dir = resolve_model_cache(cache_dir)?;
            let engine = FastEmbedEngine::try_new(model, device, cache_dir)?;
            Ok(Arc::new(engine))
        }
        #[cfg(not(feature = "fastembed-engine"))]
        DenseBackend::FastEmbed { model } => Err(SetupError::model_load(format!(
            "dense model `{model}` needs the `fastembed-engine` feature, which this build does not include"
        ))),
    }
}

/// Directory where pretrained weights are downloaded.
pub fn resolve_model_cache(configured: Option<&Path>) -> Result<PathBuf, SetupError> {
    let dir = match configured {
        Some(dir) => dir.to_path_buf(),
        None => directories::ProjectDirs::from("io", "pinecone", "pinecone-bootstrap")
            .ok_or_else(|| SetupError::model_load("unable to determine OS cache dir"))?
            .cache_dir()
            .join("models"),
    };
    std::fs::create_dir_all(&dir).map_err(|err| {
        SetupError::model_load(format!(
            "failed to create model cache {}: {err}",
            dir.display()
        ))
    })?;
    Ok(dir)
}
