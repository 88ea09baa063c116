use std::hash::{Hash, Hasher};
use std::path::Path;

use ahash::AHasher;

use crate::{
    application::services::DenseEncoder,
    domain::{Device, SetupError},
};

const MIN_DIMENSIONS: usize = 8;
const MAX_DIMENSIONS: usize = 4096;

/// A lightweight, deterministic encoder that hashes tokens into a fixed-size vector.
/// This is not meant for production-grade semantic search, but it keeps the
/// pipeline usable without downloading weights or shipping the ONNX runtime.
pub struct SimpleEmbedEngine {
    model_name: String,
    dimensions: usize,
}

impl SimpleEmbedEngine {
    pub fn try_new(model_name: impl Into<String>, dimensions: usize) -> Result<Self, SetupError> {
        if !(MIN_DIMENSIONS..=MAX_DIMENSIONS).contains(&dimensions) {
            return Err(SetupError::model_load(format!(
                "embedding dimensions must be between {MIN_DIMENSIONS} and {MAX_DIMENSIONS}, got {dimensions}"
            )));
        }
        Ok(Self {
            model_name: model_name.into(),
            dimensions,
        })
    }

    fn tokenize<'a>(&self, text: &'a str) -> impl Iterator<Item = &'a str> {
        text.split(|c: char| c.is_ascii_whitespace() || c.is_ascii_punctuation())
            .filter(move |token| !token.is_empty())
    }

    fn hash_token(&self, token: &str) -> usize {
        let mut hasher = AHasher::default();
        token.to_lowercase().hash(&mut hasher);
        hasher.finish() as usize
    }

    fn embed_internal(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in self.tokenize(text) {
            let idx = self.hash_token(token) % self.dimensions;
            vector[idx] += 1.0;
        }

        // L2 normalize to keep cosine scores in [-1, 1]
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }
}

impl DenseEncoder for SimpleEmbedEngine {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dimensions
    }

    fn device(&self) -> Device {
        Device::Cpu
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>, SetupError> {
        if text.trim().is_empty() {
            return Err(SetupError::encoding("text payload cannot be empty"));
        }
        Ok(self.embed_internal(text))
    }

    fn embed_image(&self, path: &Path) -> Result<Vec<f32>, SetupError> {
        Err(SetupError::encoding(format!(
            "`{}` is text-only; cannot embed image {}",
            self.model_name,
            path.display()
        )))
    }
}
