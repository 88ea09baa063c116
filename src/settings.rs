use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{DeploymentSpec, IndexSpec, Metric, PodSpec, ServerlessSpec, SetupError};

pub const ENV_API_KEY: &str = "PINECONE_API_KEY";
pub const ENV_ENVIRONMENT: &str = "PINECONE_ENVIRONMENT";
pub const ENV_CONTROLLER_HOST: &str = "PINECONE_CONTROLLER_HOST";
pub const ENV_INDEX_NAME: &str = "PINECONE_INDEX_NAME";
pub const ENV_DIMENSION: &str = "PINECONE_DIMENSION";
pub const ENV_METRIC: &str = "PINECONE_METRIC";
pub const ENV_CLOUD: &str = "PINECONE_CLOUD";
pub const ENV_REGION: &str = "PINECONE_REGION";
pub const ENV_POD_TYPE: &str = "PINECONE_POD_TYPE";
pub const ENV_DENSE_MODEL: &str = "PINECONE_DENSE_MODEL";
pub const ENV_BM25_PARAMS: &str = "PINECONE_BM25_PARAMS";
pub const ENV_DEVICE: &str = "PINECONE_SETUP_DEVICE";
pub const ENV_MODEL_CACHE: &str = "PINECONE_MODEL_CACHE";
pub const ENV_READY_TIMEOUT: &str = "PINECONE_READY_TIMEOUT_SECS";
pub const ENV_CONFIG_FILE: &str = "PINECONE_SETUP_CONFIG";

pub const DEFAULT_CONTROLLER_HOST: &str = "https://api.pinecone.io";
pub const DEFAULT_API_VERSION: &str = "2024-07";

/// Connection settings for the Pinecone control plane.
#[derive(Clone)]
pub struct PineconeConfig {
    pub api_key: Option<String>,
    pub environment: Option<String>,
    pub controller_host: String,
    pub api_version: String,
    /// Issue one list-indexes call on connect so bad credentials fail early.
    pub verify_on_connect: bool,
    pub request_timeout: Duration,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            environment: None,
            controller_host: DEFAULT_CONTROLLER_HOST.into(),
            api_version: DEFAULT_API_VERSION.into(),
            verify_on_connect: true,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl PineconeConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    pub fn with_controller_host(mut self, host: impl Into<String>) -> Self {
        self.controller_host = host.into();
        self
    }
}

impl fmt::Debug for PineconeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PineconeConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("environment", &self.environment)
            .field("controller_host", &self.controller_host)
            .field("api_version", &self.api_version)
            .field("verify_on_connect", &self.verify_on_connect)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Dense encoder backends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum DenseBackend {
    /// Deterministic hash encoder, text only. Offline stand-in for tests;
    /// it never loads pretrained weights.
    Simple {
        #[serde(default = "default_simple_model")]
        model: String,
        #[serde(default = "default_simple_dim")]
        dimensions: usize,
    },
    /// Pretrained CLIP-style encoder served by fastembed. Loading fails when
    /// the `fastembed-engine` feature is not compiled in.
    FastEmbed {
        #[serde(default = "default_fastembed_model")]
        model: String,
    },
}

impl DenseBackend {
    pub fn id(&self) -> &'static str {
        match self {
            DenseBackend::Simple { .. } => "simple",
            DenseBackend::FastEmbed { .. } => "fastembed",
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            DenseBackend::Simple { model, .. } => model,
            DenseBackend::FastEmbed { model } => model,
        }
    }

    /// A named model always means a pretrained one.
    fn with_model(self, model: String) -> Self {
        DenseBackend::FastEmbed { model }
    }
}

impl Default for DenseBackend {
    fn default() -> Self {
        DenseBackend::FastEmbed {
            model: default_fastembed_model(),
        }
    }
}

/// How the model loader picks a compute device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// Use CUDA when the probe finds hardware, CPU otherwise.
    #[default]
    Auto,
    Cpu,
    Cuda,
}

impl FromStr for DevicePreference {
    type Err = SetupError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            "cuda" | "gpu" => Ok(DevicePreference::Cuda),
            other => Err(SetupError::config(format!(
                "unknown device `{other}` (expected auto, cpu or cuda)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelConfig {
    pub dense: DenseBackend,
    pub device: DevicePreference,
    /// Download cache for pretrained weights; `None` uses the OS cache dir.
    pub cache_dir: Option<PathBuf>,
    /// Previously dumped BM25 parameters to start from.
    pub bm25_params: Option<PathBuf>,
}

/// How long to wait for a freshly created index to report ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Complete configuration handed to the setup coordinator.
#[derive(Debug, Clone, Default)]
pub struct SetupConfig {
    pub pinecone: PineconeConfig,
    pub index: IndexSpec,
    pub models: ModelConfig,
    pub readiness: ReadinessPolicy,
}

/// Non-secret settings that may be kept in a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigOverrides {
    #[serde(default)]
    pub index: Option<IndexSpec>,
    #[serde(default)]
    pub dense: Option<DenseBackend>,
    #[serde(default)]
    pub device: Option<DevicePreference>,
    #[serde(default)]
    pub controller_host: Option<String>,
    #[serde(default)]
    pub ready_timeout_secs: Option<u64>,
}

impl ConfigOverrides {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|err| {
            SetupError::config(format!("failed to read config file {}: {err}", path.display()))
        })?;
        serde_json::from_slice(&bytes).map_err(|err| {
            SetupError::config(format!("invalid config file {}: {err}", path.display()))
        })
    }
}

impl SetupConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, SetupError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Values from an
    /// optional JSON file (`PINECONE_SETUP_CONFIG`) are applied first, then
    /// individual variables override them.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SetupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = SetupConfig::default();

        if let Some(path) = get(ENV_CONFIG_FILE) {
            config.apply_overrides(ConfigOverrides::load(path)?);
        }

        config.pinecone.api_key = get(ENV_API_KEY);
        config.pinecone.environment = get(ENV_ENVIRONMENT);
        if let Some(host) = get(ENV_CONTROLLER_HOST) {
            config.pinecone.controller_host = host;
        }

        if let Some(name) = get(ENV_INDEX_NAME) {
            config.index.name = name;
        }
        if let Some(raw) = get(ENV_DIMENSION) {
            config.index.dimension = raw.parse().map_err(|err| {
                SetupError::config(format!("invalid {ENV_DIMENSION} `{raw}`: {err}"))
            })?;
        }
        if let Some(raw) = get(ENV_METRIC) {
            config.index.metric = raw.parse::<Metric>()?;
        }

        if let Some(pod_type) = get(ENV_POD_TYPE) {
            let environment = config.pinecone.environment.clone().unwrap_or_default();
            config.index.spec = DeploymentSpec::Pod(PodSpec::new(environment, pod_type));
        } else if get(ENV_CLOUD).is_some() || get(ENV_REGION).is_some() {
            let mut serverless = match &config.index.spec {
                DeploymentSpec::Serverless(spec) => spec.clone(),
                DeploymentSpec::Pod(_) => ServerlessSpec::default(),
            };
            if let Some(cloud) = get(ENV_CLOUD) {
                serverless.cloud = cloud;
            }
            if let Some(region) = get(ENV_REGION) {
                serverless.region = region;
            }
            config.index.spec = DeploymentSpec::Serverless(serverless);
        }

        if let Some(model) = get(ENV_DENSE_MODEL) {
            config.models.dense = config.models.dense.clone().with_model(model);
        }
        if let Some(raw) = get(ENV_DEVICE) {
            config.models.device = raw.parse()?;
        }
        config.models.cache_dir = get(ENV_MODEL_CACHE).map(PathBuf::from);
        config.models.bm25_params = get(ENV_BM25_PARAMS).map(PathBuf::from);

        if let Some(raw) = get(ENV_READY_TIMEOUT) {
            let secs: u64 = raw.parse().map_err(|err| {
                SetupError::config(format!("invalid {ENV_READY_TIMEOUT} `{raw}`: {err}"))
            })?;
            config.readiness.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(index) = overrides.index {
            self.index = index;
        }
        if let Some(dense) = overrides.dense {
            self.models.dense = dense;
        }
        if let Some(device) = overrides.device {
            self.models.device = device;
        }
        if let Some(host) = overrides.controller_host {
            self.pinecone.controller_host = host;
        }
        if let Some(secs) = overrides.ready_timeout_secs {
            self.readiness.timeout = Duration::from_secs(secs);
        }
    }
}

const fn default_simple_dim() -> usize {
    512
}

fn default_simple_model() -> String {
    "pinecone-bootstrap/simple-hash".to_string()
}

fn default_fastembed_model() -> String {
    "sentence-transformers/clip-ViT-B-32".to_string()
}
