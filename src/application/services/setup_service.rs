use std::path::Path;
use std::sync::Arc;

use crate::domain::{
    Device, IndexDescription, IndexList, IndexSpec, IndexStats, QueryMatch, QueryRequest,
    SetupError, SparseVector, VectorRecord,
};

/// Result of a create-index request.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created(IndexDescription),
    /// Another caller created the index between our list and create calls.
    AlreadyExists,
}

/// Contract for the remote index-management API.
pub trait ControlPlane: Send + Sync {
    fn list_indexes(&self) -> Result<IndexList, SetupError>;

    fn list_index_names(&self) -> Result<Vec<String>, SetupError> {
        Ok(self.list_indexes()?.names())
    }

    fn create_index(&self, spec: &IndexSpec) -> Result<CreateOutcome, SetupError>;

    fn describe_index(&self, name: &str) -> Result<IndexDescription, SetupError>;

    /// Bind a data-plane handle to a described index.
    fn open_index(&self, description: &IndexDescription)
        -> Result<Arc<dyn VectorIndex>, SetupError>;
}

/// Handle to a single remote index.
pub trait VectorIndex: Send + Sync {
    fn name(&self) -> &str;

    fn host(&self) -> &str;

    fn describe_stats(&self) -> Result<IndexStats, SetupError>;

    /// Returns the number of records the service acknowledged.
    fn upsert(&self, records: &[VectorRecord], namespace: Option<&str>)
        -> Result<usize, SetupError>;

    fn query(&self, request: &QueryRequest) -> Result<Vec<QueryMatch>, SetupError>;
}

/// Abstraction over dense encoders (fastembed CLIP, offline hash, ...).
pub trait DenseEncoder: Send + Sync {
    fn model_name(&self) -> &str;

    fn dims(&self) -> usize;

    fn device(&self) -> Device;

    fn embed_text(&self, text: &str) -> Result<Vec<f32>, SetupError>;

    fn embed_image(&self, path: &Path) -> Result<Vec<f32>, SetupError>;
}

/// Abstraction over lexical encoders producing weighted-term vectors.
pub trait SparseEncoder: Send + Sync {
    fn encode_documents(&self, texts: &[&str]) -> Result<Vec<SparseVector>, SetupError>;

    fn encode_queries(&self, texts: &[&str]) -> Result<Vec<SparseVector>, SetupError>;

    fn is_fitted(&self) -> bool;
}

/// Hardware capability detection, kept behind a trait so tests can fake it.
pub trait DeviceProbe: Send + Sync {
    fn cuda_available(&self) -> bool;
}
