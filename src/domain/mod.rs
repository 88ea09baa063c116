//! Domain layer: index descriptors, vector payloads and the shared error type.

pub mod errors;
pub mod models;

pub use errors::{SetupError, SetupStage};
pub use models::{
    DeploymentSpec, Device, IndexDescription, IndexList, IndexSpec, IndexStats, IndexStatus,
    Metric, PodSpec, QueryMatch, QueryRequest, ServerlessSpec, SparseVector, VectorRecord,
};
