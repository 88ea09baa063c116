//! Infrastructure layer wiring concrete adapters (HTTP clients, encoders, device probe).

pub mod device;
pub mod embeddings;
pub mod http_client;

pub use device::SystemDeviceProbe;
#[cfg(feature = "fastembed-engine")]
pub use embeddings::FastEmbedEngine;
pub use embeddings::{build_dense_encoder, Bm25Encoder, SimpleEmbedEngine};
pub use http_client::{PineconeClient, RemoteIndex};
