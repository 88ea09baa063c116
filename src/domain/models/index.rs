use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::SetupError;

/// Dimension used by the hybrid search index unless configured otherwise.
pub const DEFAULT_DIMENSION: u32 = 1024;

/// Index name used when nothing else is configured.
pub const DEFAULT_INDEX_NAME: &str = "final-database";

pub const DEFAULT_CLOUD: &str = "aws";
pub const DEFAULT_REGION: &str = "us-east-1";

/// Service-side limits on index names and dimensions.
const MAX_INDEX_NAME_LEN: usize = 45;
const MAX_DIMENSION: u32 = 20_000;

/// Distance metric used by a remote index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    Dotproduct,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::Euclidean => "euclidean",
            Metric::Dotproduct => "dotproduct",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = SetupError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Metric::Cosine),
            "euclidean" => Ok(Metric::Euclidean),
            "dotproduct" | "dot_product" | "dot-product" => Ok(Metric::Dotproduct),
            other => Err(SetupError::config(format!(
                "unknown metric `{other}` (expected cosine, euclidean or dotproduct)"
            ))),
        }
    }
}

/// Auto-scaling deployment pinned to a cloud provider and region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerlessSpec {
    pub cloud: String,
    pub region: String,
}

impl Default for ServerlessSpec {
    fn default() -> Self {
        Self {
            cloud: DEFAULT_CLOUD.into(),
            region: DEFAULT_REGION.into(),
        }
    }
}

/// Fixed-capacity deployment in a legacy pod environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSpec {
    pub environment: String,
    #[serde(default = "default_pod_type")]
    pub pod_type: String,
    #[serde(default = "default_pod_count")]
    pub pods: u32,
    #[serde(default = "default_pod_count")]
    pub replicas: u32,
    #[serde(default = "default_pod_count")]
    pub shards: u32,
}

impl PodSpec {
    pub fn new(environment: impl Into<String>, pod_type: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            pod_type: pod_type.into(),
            pods: 1,
            replicas: 1,
            shards: 1,
        }
    }
}

/// Where and how the index is deployed. Serialises as `{"serverless": {..}}`
/// or `{"pod": {..}}`, matching the control-plane wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentSpec {
    Serverless(ServerlessSpec),
    Pod(PodSpec),
}

impl Default for DeploymentSpec {
    fn default() -> Self {
        DeploymentSpec::Serverless(ServerlessSpec::default())
    }
}

impl fmt::Display for DeploymentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentSpec::Serverless(spec) => {
                write!(f, "serverless ({}/{})", spec.cloud, spec.region)
            }
            DeploymentSpec::Pod(spec) => {
                write!(f, "pod ({} x{} in {})", spec.pod_type, spec.pods, spec.environment)
            }
        }
    }
}

/// Requested shape of a remote index. Serialises directly into the body of
/// a create-index request. Missing fields take the default layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: u32,
    pub metric: Metric,
    pub spec: DeploymentSpec,
}

impl Default for IndexSpec {
    fn default() -> Self {
        Self::serverless(DEFAULT_INDEX_NAME)
    }
}

impl IndexSpec {
    /// The fixed layout used for the hybrid CLIP + BM25 index.
    pub fn serverless(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimension: DEFAULT_DIMENSION,
            metric: Metric::Cosine,
            spec: DeploymentSpec::default(),
        }
    }

    pub fn with_dimension(mut self, dimension: u32) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_deployment(mut self, spec: DeploymentSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Reject specs the control plane would refuse anyway.
    pub fn validate(&self) -> Result<(), SetupError> {
        validate_index_name(&self.name)?;

        if self.dimension == 0 || self.dimension > MAX_DIMENSION {
            return Err(SetupError::provisioning(format!(
                "dimension must be between 1 and {MAX_DIMENSION}, got {}",
                self.dimension
            )));
        }

        match &self.spec {
            DeploymentSpec::Serverless(spec) => {
                if spec.cloud.trim().is_empty() || spec.region.trim().is_empty() {
                    return Err(SetupError::provisioning(
                        "serverless deployments need both a cloud and a region",
                    ));
                }
            }
            DeploymentSpec::Pod(spec) => {
                if spec.environment.trim().is_empty() {
                    return Err(SetupError::provisioning(
                        "pod deployments need PINECONE_ENVIRONMENT to be set",
                    ));
                }
                if spec.pods == 0 {
                    return Err(SetupError::provisioning("pod count must be at least 1"));
                }
            }
        }

        Ok(())
    }
}

pub fn validate_index_name(name: &str) -> Result<(), SetupError> {
    if name.is_empty() || name.len() > MAX_INDEX_NAME_LEN {
        return Err(SetupError::provisioning(format!(
            "index name must be 1-{MAX_INDEX_NAME_LEN} characters, got `{name}`"
        )));
    }

    let allowed = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let bounded = !name.starts_with('-') && !name.ends_with('-');

    if !allowed || !bounded {
        return Err(SetupError::provisioning(format!(
            "index name `{name}` must use lowercase alphanumerics and '-', and start and end with an alphanumeric"
        )));
    }

    Ok(())
}

/// Readiness as reported by the control plane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub state: String,
}

/// An index as described by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    #[serde(default)]
    pub dimension: Option<u32>,
    #[serde(default)]
    pub metric: Metric,
    /// Data-plane host, without scheme for real deployments.
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub spec: Option<DeploymentSpec>,
    #[serde(default)]
    pub status: IndexStatus,
}

impl IndexDescription {
    pub fn is_ready(&self) -> bool {
        self.status.ready
    }

    /// Fields of the requested spec this index disagrees with.
    pub fn mismatches(&self, requested: &IndexSpec) -> Vec<String> {
        let mut diffs = Vec::new();
        if let Some(dimension) = self.dimension {
            if dimension != requested.dimension {
                diffs.push(format!(
                    "dimension {} (requested {})",
                    dimension, requested.dimension
                ));
            }
        }
        if self.metric != requested.metric {
            diffs.push(format!(
                "metric {} (requested {})",
                self.metric, requested.metric
            ));
        }
        diffs
    }
}

/// Body of a list-indexes response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexList {
    #[serde(default)]
    pub indexes: Vec<IndexDescription>,
}

impl IndexList {
    pub fn names(&self) -> Vec<String> {
        self.indexes.iter().map(|index| index.name.clone()).collect()
    }
}

fn default_pod_type() -> String {
    "p1.x1".to_string()
}

const fn default_pod_count() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_spec_matches_hybrid_layout() {
        let spec = IndexSpec::default();
        assert_eq!(spec.name, "final-database");
        assert_eq!(spec.dimension, 1024);
        assert_eq!(spec.metric, Metric::Cosine);
        assert_eq!(
            spec.spec,
            DeploymentSpec::Serverless(ServerlessSpec {
                cloud: "aws".into(),
                region: "us-east-1".into(),
            })
        );
    }

    #[test]
    fn spec_serialises_to_create_body() {
        let body = serde_json::to_value(IndexSpec::serverless("docs")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "name": "docs",
                "dimension": 1024,
                "metric": "cosine",
                "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } }
            })
        );
    }

    #[test]
    fn pod_spec_serialises_with_environment() {
        let spec = IndexSpec::serverless("docs")
            .with_deployment(DeploymentSpec::Pod(PodSpec::new("us-east1-gcp", "s1.x1")));
        let body = serde_json::to_value(spec).unwrap();
        assert_eq!(body["spec"]["pod"]["environment"], "us-east1-gcp");
        assert_eq!(body["spec"]["pod"]["pod_type"], "s1.x1");
        assert_eq!(body["spec"]["pod"]["pods"], 1);
    }

    #[test]
    fn index_names_are_validated() {
        assert!(validate_index_name("final-database").is_ok());
        assert!(validate_index_name("a1").is_ok());
        assert!(validate_index_name("").is_err());
        assert!(validate_index_name("Final").is_err());
        assert!(validate_index_name("-leading").is_err());
        assert!(validate_index_name("trailing-").is_err());
        assert!(validate_index_name("under_score").is_err());
        assert!(validate_index_name(&"x".repeat(46)).is_err());
    }

    #[test]
    fn validate_rejects_zero_dimension_and_empty_pod_environment() {
        let zero = IndexSpec::default().with_dimension(0);
        assert!(matches!(zero.validate(), Err(SetupError::Provisioning(_))));

        let pod = IndexSpec::default().with_deployment(DeploymentSpec::Pod(PodSpec::new("", "p1.x1")));
        assert!(matches!(pod.validate(), Err(SetupError::Provisioning(_))));
    }

    #[test]
    fn metric_parses_common_spellings() {
        assert_eq!("Cosine".parse::<Metric>().unwrap(), Metric::Cosine);
        assert_eq!("dot-product".parse::<Metric>().unwrap(), Metric::Dotproduct);
        assert!(matches!(
            "manhattan".parse::<Metric>(),
            Err(SetupError::Config(_))
        ));
    }

    #[test]
    fn description_parses_control_plane_payload() {
        let payload = serde_json::json!({
            "name": "final-database",
            "dimension": 1024,
            "metric": "cosine",
            "host": "final-database-abc123.svc.aped-4627-b74a.pinecone.io",
            "deletion_protection": "disabled",
            "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } },
            "status": { "ready": true, "state": "Ready" }
        });
        let description: IndexDescription = serde_json::from_value(payload).unwrap();
        assert!(description.is_ready());
        assert_eq!(description.dimension, Some(1024));
        assert!(description.mismatches(&IndexSpec::default()).is_empty());

        let other = IndexSpec::default()
            .with_dimension(512)
            .with_metric(Metric::Dotproduct);
        assert_eq!(description.mismatches(&other).len(), 2);
    }
}
