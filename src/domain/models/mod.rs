mod index;
mod vectors;

pub use index::{
    validate_index_name, DeploymentSpec, IndexDescription, IndexList, IndexSpec, IndexStatus,
    Metric, PodSpec, ServerlessSpec, DEFAULT_CLOUD, DEFAULT_DIMENSION, DEFAULT_INDEX_NAME,
    DEFAULT_REGION,
};
pub use vectors::{
    Device, IndexStats, NamespaceStats, QueryMatch, QueryRequest, SparseVector, VectorRecord,
};
