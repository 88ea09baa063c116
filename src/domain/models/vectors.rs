use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::SetupError;

/// Compute device an encoder runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Cuda,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Cuda => f.write_str("cuda"),
        }
    }
}

/// Weighted-term vector: parallel arrays of term indices and weights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Result<Self, SetupError> {
        if indices.len() != values.len() {
            return Err(SetupError::encoding(format!(
                "sparse vector has {} indices but {} values",
                indices.len(),
                values.len()
            )));
        }
        Ok(Self { indices, values })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Weight stored for `index`, if present.
    pub fn get(&self, index: u32) -> Option<f32> {
        self.indices
            .iter()
            .position(|i| *i == index)
            .map(|pos| self.values[pos])
    }

    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            indices: self.indices.clone(),
            values: self.values.iter().map(|v| v * factor).collect(),
        }
    }
}

/// A record to upsert into an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse_values: Option<SparseVector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl VectorRecord {
    pub fn dense(id: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            values,
            sparse_values: None,
            metadata: None,
        }
    }

    pub fn with_sparse(mut self, sparse: SparseVector) -> Self {
        self.sparse_values = Some(sparse);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Similarity query against an index, optionally hybrid (dense + sparse).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub top_k: usize,
    pub vector: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse_vector: Option<SparseVector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub include_metadata: bool,
}

impl QueryRequest {
    pub fn dense(vector: Vec<f32>, top_k: usize) -> Self {
        Self {
            top_k,
            vector,
            sparse_vector: None,
            namespace: None,
            include_metadata: true,
        }
    }

    /// Convex combination of dense and sparse scores: `alpha` weights the
    /// dense side, `1 - alpha` the sparse side.
    pub fn hybrid(
        dense: &[f32],
        sparse: &SparseVector,
        alpha: f32,
        top_k: usize,
    ) -> Result<Self, SetupError> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(SetupError::encoding(format!(
                "alpha must be between 0 and 1, got {alpha}"
            )));
        }
        let mut request = Self::dense(dense.iter().map(|v| v * alpha).collect(), top_k);
        request.sparse_vector = Some(sparse.scaled(1.0 - alpha));
        Ok(request)
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStats {
    #[serde(default)]
    pub vector_count: u64,
}

/// Snapshot returned by describe-index-stats.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    #[serde(default)]
    pub dimension: Option<u32>,
    #[serde(default)]
    pub index_fullness: f32,
    #[serde(default)]
    pub total_vector_count: u64,
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespaceStats>,
}
