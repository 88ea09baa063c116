//! Composition root: connects to Pinecone, loads the encoders and provisions
//! the index, in that order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::application::services::{
    ensure_index, select_device, ControlPlane, DenseEncoder, DeviceProbe, SparseEncoder,
    VectorIndex,
};
use crate::application::SetupReport;
use crate::domain::{Device, IndexDescription, SetupError};
use crate::infrastructure::{build_dense_encoder, Bm25Encoder, PineconeClient, SystemDeviceProbe};
use crate::settings::{ModelConfig, PineconeConfig, SetupConfig};

/// Dense and sparse encoders ready for use.
pub struct LoadedModels {
    pub dense: Arc<dyn DenseEncoder>,
    pub sparse: Bm25Encoder,
    pub device: Device,
}

/// Select the device, then load the dense encoder and the BM25 encoder.
///
/// The BM25 encoder comes back untrained unless `bm25_params` names a dump.
pub fn load_models(
    config: &ModelConfig,
    probe: &dyn DeviceProbe,
) -> Result<LoadedModels, SetupError> {
    try_load_models(config, probe).map_err(|err| {
        error!(
            target: "pinecone_bootstrap::models",
            error = %err,
            "error getting CLIP and BM25 model"
        );
        err
    })
}

fn try_load_models(
    config: &ModelConfig,
    probe: &dyn DeviceProbe,
) -> Result<LoadedModels, SetupError> {
    let device = select_device(config.device, probe)?;
    let dense = build_dense_encoder(&config.dense, device, config.cache_dir.as_deref())?;
    info!(
        target: "pinecone_bootstrap::models",
        model = dense.model_name(),
        dimensions = dense.dims(),
        device = %dense.device(),
        "dense encoder loaded"
    );

    let sparse = match &config.bm25_params {
        Some(path) => {
            let encoder = Bm25Encoder::load(path)?;
            info!(
                target: "pinecone_bootstrap::models",
                path = %path.display(),
                "bm25 encoder loaded from params"
            );
            encoder
        }
        None => Bm25Encoder::new()?,
    };

    Ok(LoadedModels {
        dense,
        sparse,
        device,
    })
}

/// Everything a successful setup run produced.
pub struct SetupOutcome {
    pub index: Arc<dyn VectorIndex>,
    pub dense: Arc<dyn DenseEncoder>,
    pub sparse: Bm25Encoder,
    pub description: IndexDescription,
    pub index_created: bool,
    pub device: Device,
    pub elapsed: Duration,
    pub completed_at: DateTime<Utc>,
}

impl SetupOutcome {
    /// The `(index, dense, sparse)` triple.
    pub fn into_parts(self) -> (Arc<dyn VectorIndex>, Arc<dyn DenseEncoder>, Bm25Encoder) {
        (self.index, self.dense, self.sparse)
    }

    pub fn report(&self) -> SetupReport {
        SetupReport {
            index: self.description.name.clone(),
            host: self.index.host().to_string(),
            index_created: self.index_created,
            index_ready: self.description.is_ready(),
            dimension: self.description.dimension,
            metric: self.description.metric,
            deployment: self.description.spec.as_ref().map(ToString::to_string),
            dense_model: self.dense.model_name().to_string(),
            dense_dimensions: self.dense.dims(),
            device: self.device,
            sparse_fitted: self.sparse.is_fitted(),
            elapsed_secs: self.elapsed.as_secs_f64(),
            completed_at: self.completed_at,
        }
    }
}

pub struct SetupCoordinator {
    config: SetupConfig,
    probe: Arc<dyn DeviceProbe>,
}

impl SetupCoordinator {
    pub fn new(config: SetupConfig, probe: Arc<dyn DeviceProbe>) -> Self {
        Self { config, probe }
    }

    pub fn config(&self) -> &SetupConfig {
        &self.config
    }

    /// Run the setup against the real Pinecone service.
    pub fn run(&self) -> Result<SetupOutcome, SetupError> {
        self.run_with(|pinecone| {
            let client = PineconeClient::connect(pinecone)?;
            Ok(Arc::new(client) as Arc<dyn ControlPlane>)
        })
    }

    /// Run the setup with a caller-supplied control-plane connector.
    /// The first failing step aborts the run.
    pub fn run_with<F>(&self, connect: F) -> Result<SetupOutcome, SetupError>
    where
        F: FnOnce(&PineconeConfig) -> Result<Arc<dyn ControlPlane>, SetupError>,
    {
        let started = Instant::now();

        info!(target: "pinecone_bootstrap::setup", "initializing pinecone client");
        let control = connect(&self.config.pinecone)?;

        info!(target: "pinecone_bootstrap::setup", "loading dense and sparse encoders");
        let models = load_models(&self.config.models, self.probe.as_ref())?;
        let index_dimension = self.config.index.dimension as usize;
        if models.dense.dims() != index_dimension {
            warn!(
                target: "pinecone_bootstrap::setup",
                model = models.dense.model_name(),
                encoder_dimensions = models.dense.dims(),
                index_dimension,
                "dense encoder dimension differs from the index dimension"
            );
        }

        info!(
            target: "pinecone_bootstrap::setup",
            index = %self.config.index.name,
            "ensuring index"
        );
        let provisioned = ensure_index(
            control.as_ref(),
            &self.config.index,
            &self.config.readiness,
        )?;

        let elapsed = started.elapsed();
        info!(
            target: "pinecone_bootstrap::setup",
            index = %provisioned.description.name,
            created = provisioned.created,
            elapsed_secs = elapsed.as_secs_f64(),
            "pinecone setup finished"
        );

        Ok(SetupOutcome {
            index: provisioned.handle,
            dense: models.dense,
            sparse: models.sparse,
            description: provisioned.description,
            index_created: provisioned.created,
            device: models.device,
            elapsed,
            completed_at: Utc::now(),
        })
    }
}

/// Run the full setup with the system device probe.
pub fn setup_pinecone(config: SetupConfig) -> Result<SetupOutcome, SetupError> {
    SetupCoordinator::new(config, Arc::new(SystemDeviceProbe::new())).run()
}
