use std::path::{Path, PathBuf};
use std::str::FromStr;

use fastembed::{
    EmbeddingModel, ImageEmbedding, ImageEmbeddingModel, ImageInitOptions, TextEmbedding,
    TextInitOptions,
};
use ort::execution_providers::{CUDAExecutionProvider, ExecutionProviderDispatch};
use parking_lot::Mutex;

use crate::{
    application::services::DenseEncoder,
    domain::{Device, SetupError},
};

/// Names under which the CLIP ViT-B/32 pair is published.
const CLIP_ALIASES: &[&str] = &[
    "sentence-transformers/clip-vit-b-32",
    "clip-vit-b-32",
    "qdrant/clip-vit-b-32-text",
    "qdrant/clip-vit-b-32-vision",
];

/// Dense encoder backed by `fastembed`.
///
/// CLIP models load both the text tower and the vision tower so that text
/// and images land in the same vector space. Other fastembed text models are
/// accepted too, but cannot embed images.
pub struct FastEmbedEngine {
    model_label: String,
    dimensions: usize,
    device: Device,
    text: Mutex<TextEmbedding>,
    image: Option<Mutex<ImageEmbedding>>,
}

impl FastEmbedEngine {
    /// Load `model_name` (for example `sentence-transformers/clip-ViT-B-32`) onto `device`.
    pub fn try_new(
        model_name: impl AsRef<str>,
        device: Device,
        cache_dir: PathBuf,
    ) -> Result<Self, SetupError> {
        let label = model_name.as_ref().trim();
        if label.is_empty() {
            return Err(SetupError::model_load("fastembed model name cannot be empty"));
        }

        let (text_model, image_model) = resolve_model(label)?;

        let model_info = TextEmbedding::get_model_info(&text_model).map_err(|err| {
            SetupError::model_load(format!(
                "unable to read metadata for fastembed model `{label}`: {err}"
            ))
        })?;
        let dimensions = model_info.dim;

        let text_options = TextInitOptions::new(text_model)
            .with_cache_dir(cache_dir.clone())
            .with_show_download_progress(false)
            .with_execution_providers(execution_providers(device));
        let text = TextEmbedding::try_new(text_options).map_err(|err| {
            SetupError::model_load(format!(
                "failed to initialise fastembed model `{label}`: {err}"
            ))
        })?;

        let image = match image_model {
            Some(image_model) => {
                let image_options = ImageInitOptions::new(image_model)
                    .with_cache_dir(cache_dir)
                    .with_show_download_progress(false)
                    .with_execution_providers(execution_providers(device));
                let embedding = ImageEmbedding::try_new(image_options).map_err(|err| {
                    SetupError::model_load(format!(
                        "failed to initialise vision tower for `{label}`: {err}"
                    ))
                })?;
                Some(Mutex::new(embedding))
            }
            None => None,
        };

        Ok(Self {
            model_label: label.to_string(),
            dimensions,
            device,
            text: Mutex::new(text),
            image,
        })
    }

    fn check_dimensions(&self, vector: Vec<f32>) -> Result<Vec<f32>, SetupError> {
        if vector.len() != self.dimensions {
            return Err(SetupError::encoding(format!(
                "unexpected embedding dimension (expected {}, got {})",
                self.dimensions,
                vector.len()
            )));
        }
        Ok(vector)
    }
}

/// Providers registered for `device`. A CUDA provider that fails to register
/// fails session creation, so the encoder never reports CUDA while running on
/// the CPU.
fn execution_providers(device: Device) -> Vec<ExecutionProviderDispatch> {
    match device {
        Device::Cpu => Vec::new(),
        Device::Cuda => vec![CUDAExecutionProvider::default()
            .build()
            .error_on_failure()],
    }
}

fn resolve_model(label: &str) -> Result<(EmbeddingModel, Option<ImageEmbeddingModel>), SetupError> {
    let lowered = label.to_ascii_lowercase();
    if CLIP_ALIASES.contains(&lowered.as_str()) {
        return Ok((EmbeddingModel::ClipVitB32, Some(ImageEmbeddingModel::ClipVitB32)));
    }

    let text_model = EmbeddingModel::from_str(label).map_err(|err| {
        SetupError::model_load(format!("failed to parse fastembed model `{label}`: {err}"))
    })?;
    Ok((text_model, None))
}

impl DenseEncoder for FastEmbedEngine {
    fn model_name(&self) -> &str {
        &self.model_label
    }

    fn dims(&self) -> usize {
        self.dimensions
    }

    fn device(&self) -> Device {
        self.device
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>, SetupError> {
        if text.trim().is_empty() {
            return Err(SetupError::encoding("text payload cannot be empty"));
        }

        let mut embedder = self.text.lock();
        let embeddings = embedder
            .embed(vec![text], None)
            .map_err(|err| SetupError::encoding(format!("fastembed inference failed: {err}")))?;
        let vector = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| SetupError::encoding("fastembed returned no embedding"))?;

        self.check_dimensions(vector)
    }

    fn embed_image(&self, path: &Path) -> Result<Vec<f32>, SetupError> {
        let image = self.image.as_ref().ok_or_else(|| {
            SetupError::encoding(format!(
                "`{}` has no vision tower; cannot embed {}",
                self.model_label,
                path.display()
            ))
        })?;
        if !path.is_file() {
            return Err(SetupError::encoding(format!(
                "image {} does not exist",
                path.display()
            )));
        }

        let mut embedder = image.lock();
        let embeddings = embedder.embed(vec![path], None).map_err(|err| {
            SetupError::encoding(format!("fastembed image inference failed: {err}"))
        })?;
        let vector = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| SetupError::encoding("fastembed returned no embedding"))?;

        self.check_dimensions(vector)
    }
}
