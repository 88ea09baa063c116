//! Control-plane client: credentials, index listing and creation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use super::{base_url, handle_http_error, read_json, HttpFailure, RemoteIndex};
use super::{API_KEY_HEADER, API_VERSION_HEADER};
use crate::application::services::{ControlPlane, CreateOutcome, VectorIndex};
use crate::domain::{IndexDescription, IndexList, IndexSpec, SetupError};
use crate::settings::{PineconeConfig, ENV_API_KEY};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Credential-bound connection to the Pinecone control plane.
pub struct PineconeClient {
    base_url: String,
    api_key: String,
    api_version: String,
    environment: Option<String>,
    agent: ureq::Agent,
}

impl PineconeClient {
    /// Build a client from `config`.
    ///
    /// A missing API key fails before any request is made. With
    /// `verify_on_connect` set, one list-indexes call checks that the
    /// service accepts the key.
    pub fn connect(config: &PineconeConfig) -> Result<Self, SetupError> {
        Self::try_connect(config).map_err(|err| {
            error!(
                target: "pinecone_bootstrap::client",
                error = %err,
                "error initializing pinecone"
            );
            err
        })
    }

    fn try_connect(config: &PineconeConfig) -> Result<Self, SetupError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| SetupError::connection(format!("{ENV_API_KEY} is not set")))?;

        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout(config.request_timeout)
            .build();

        let client = Self {
            base_url: base_url(&config.controller_host),
            api_key: api_key.to_string(),
            api_version: config.api_version.clone(),
            environment: config.environment.clone(),
            agent,
        };

        if config.verify_on_connect {
            client.fetch_indexes().map_err(|failure| {
                if failure.is_auth() {
                    SetupError::connection(format!("credentials rejected: {failure}"))
                } else {
                    SetupError::connection(format!("control plane unreachable: {failure}"))
                }
            })?;
        }

        info!(
            target: "pinecone_bootstrap::client",
            host = %client.base_url,
            environment = client.environment.as_deref().unwrap_or("-"),
            "pinecone client initialised"
        );
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        request
            .set(API_KEY_HEADER, &self.api_key)
            .set(API_VERSION_HEADER, &self.api_version)
    }

    fn fetch_indexes(&self) -> Result<IndexList, HttpFailure> {
        let response = self
            .authorize(self.agent.get(&self.url("indexes")))
            .call()
            .map_err(handle_http_error)?;
        read_json(response, "list indexes")
    }
}

impl ControlPlane for PineconeClient {
    fn list_indexes(&self) -> Result<IndexList, SetupError> {
        self.fetch_indexes()
            .map_err(|failure| SetupError::provisioning(format!("failed to list indexes: {failure}")))
    }

    fn create_index(&self, spec: &IndexSpec) -> Result<CreateOutcome, SetupError> {
        let result = self
            .authorize(self.agent.post(&self.url("indexes")))
            .send_json(spec);

        match result {
            Ok(response) => {
                let description: IndexDescription = read_json(response, "create index")
                    .map_err(|failure| SetupError::provisioning(failure.to_string()))?;
                debug!(
                    target: "pinecone_bootstrap::client",
                    index = %description.name,
                    state = %description.status.state,
                    "create request accepted"
                );
                Ok(CreateOutcome::Created(description))
            }
            Err(err) => {
                let failure = handle_http_error(err);
                if failure.is_status(409) {
                    return Ok(CreateOutcome::AlreadyExists);
                }
                Err(SetupError::provisioning(format!(
                    "failed to create index `{}`: {failure}",
                    spec.name
                )))
            }
        }
    }

    fn describe_index(&self, name: &str) -> Result<IndexDescription, SetupError> {
        let path = format!("indexes/{}", urlencoding::encode(name));
        let response = self
            .authorize(self.agent.get(&self.url(&path)))
            .call()
            .map_err(|err| {
                SetupError::provisioning(format!(
                    "failed to describe index `{name}`: {}",
                    handle_http_error(err)
                ))
            })?;
        read_json(response, "describe index")
            .map_err(|failure| SetupError::provisioning(failure.to_string()))
    }

    fn open_index(
        &self,
        description: &IndexDescription,
    ) -> Result<Arc<dyn VectorIndex>, SetupError> {
        if description.host.trim().is_empty() {
            return Err(SetupError::provisioning(format!(
                "index `{}` has no data-plane host yet",
                description.name
            )));
        }
        Ok(Arc::new(RemoteIndex::new(
            &description.name,
            &description.host,
            description.metric,
            &self.api_key,
            &self.api_version,
            self.agent.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config(server: &MockServer) -> PineconeConfig {
        PineconeConfig::with_api_key("pc-test").with_controller_host(server.uri())
    }

    fn index_body(name: &str, ready: bool) -> serde_json::Value {
        json!({
            "name": name,
            "dimension": 1024,
            "metric": "cosine",
            "host": format!("{name}-abc123.svc.aped-4627-b74a.pinecone.io"),
            "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } },
            "status": { "ready": ready, "state": if ready { "Ready" } else { "Initializing" } }
        })
    }

    async fn mount_list(server: &MockServer, names: &[&str]) {
        let indexes: Vec<_> = names.iter().map(|n| index_body(n, true)).collect();
        Mock::given(method("GET"))
            .and(path("/indexes"))
            .and(header(API_KEY_HEADER, "pc-test"))
            .and(header(API_VERSION_HEADER, "2024-07"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "indexes": indexes })))
            .mount(server)
            .await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_api_key_fails_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = PineconeConfig::default().with_controller_host(server.uri());
        let result = tokio::task::spawn_blocking(move || PineconeClient::connect(&config))
            .await
            .unwrap();

        assert!(matches!(result, Err(SetupError::Connection(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rejected_key_is_a_connection_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "code": "UNAUTHENTICATED", "message": "Invalid API Key" },
                "status": 401
            })))
            .mount(&server)
            .await;

        let config = config(&server);
        let err = tokio::task::spawn_blocking(move || PineconeClient::connect(&config))
            .await
            .unwrap()
            .err()
            .unwrap();

        assert!(matches!(err, SetupError::Connection(_)));
        assert!(err.to_string().contains("Invalid API Key"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lists_index_names() {
        let server = MockServer::start().await;
        mount_list(&server, &["final-database", "images"]).await;

        let config = config(&server);
        let names = tokio::task::spawn_blocking(move || {
            PineconeClient::connect(&config)?.list_index_names()
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(names, vec!["final-database", "images"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_sends_fixed_layout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes"))
            .and(body_json(json!({
                "name": "final-database",
                "dimension": 1024,
                "metric": "cosine",
                "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(index_body("final-database", false)))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = config(&server);
        config.verify_on_connect = false;
        let outcome = tokio::task::spawn_blocking(move || {
            PineconeClient::connect(&config)?.create_index(&IndexSpec::serverless("final-database"))
        })
        .await
        .unwrap()
        .unwrap();

        match outcome {
            CreateOutcome::Created(description) => assert!(!description.is_ready()),
            other => panic!("expected a created index, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn conflict_on_create_means_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": { "code": "ALREADY_EXISTS", "message": "Resource final-database already exists" },
                "status": 409
            })))
            .mount(&server)
            .await;

        let mut config = config(&server);
        config.verify_on_connect = false;
        let outcome = tokio::task::spawn_blocking(move || {
            PineconeClient::connect(&config)?.create_index(&IndexSpec::serverless("final-database"))
        })
        .await
        .unwrap()
        .unwrap();

        assert!(matches!(outcome, CreateOutcome::AlreadyExists));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn quota_rejection_is_a_provisioning_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": "FORBIDDEN", "message": "Request failed. You've reached the max serverless indexes allowed" },
                "status": 403
            })))
            .mount(&server)
            .await;

        let mut config = config(&server);
        config.verify_on_connect = false;
        let err = tokio::task::spawn_blocking(move || {
            PineconeClient::connect(&config)?.create_index(&IndexSpec::serverless("final-database"))
        })
        .await
        .unwrap()
        .unwrap_err();

        assert!(matches!(err, SetupError::Provisioning(_)));
        assert!(err.to_string().contains("HTTP 403 - FORBIDDEN"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn describe_returns_host_for_handle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/final-database"))
            .respond_with(ResponseTemplate::new(200).set_body_json(index_body("final-database", true)))
            .mount(&server)
            .await;

        let mut config = config(&server);
        config.verify_on_connect = false;
        let host = tokio::task::spawn_blocking(move || {
            let client = PineconeClient::connect(&config)?;
            let description = client.describe_index("final-database")?;
            let handle = client.open_index(&description)?;
            Ok::<_, SetupError>(handle.host().to_string())
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(host, "final-database-abc123.svc.aped-4627-b74a.pinecone.io");
    }
}
