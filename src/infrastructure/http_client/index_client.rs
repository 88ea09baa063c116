//! Data-plane handle for a single index.

use serde::Deserialize;
use tracing::debug;

use super::{base_url, handle_http_error, read_json, API_KEY_HEADER, API_VERSION_HEADER};
use crate::application::services::VectorIndex;
use crate::domain::{IndexStats, Metric, QueryMatch, QueryRequest, SetupError, VectorRecord};

/// Upserts are split into requests of at most this many records.
const UPSERT_BATCH_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

/// Index handle that sends data-plane requests to the index host.
pub struct RemoteIndex {
    name: String,
    host: String,
    metric: Metric,
    base_url: String,
    api_key: String,
    api_version: String,
    agent: ureq::Agent,
}

impl RemoteIndex {
    pub fn new(
        name: &str,
        host: &str,
        metric: Metric,
        api_key: &str,
        api_version: &str,
        agent: ureq::Agent,
    ) -> Self {
        Self {
            name: name.to_string(),
            host: host.to_string(),
            metric,
            base_url: base_url(host),
            api_key: api_key.to_string(),
            api_version: api_version.to_string(),
            agent,
        }
    }

    /// Sparse values are only accepted by dotproduct indexes.
    fn ensure_sparse_supported(&self, operation: &str) -> Result<(), SetupError> {
        if self.metric == Metric::Dotproduct {
            return Ok(());
        }
        Err(SetupError::remote(format!(
            "{operation} with sparse values needs a dotproduct index, but `{}` uses {}",
            self.name, self.metric
        )))
    }

    fn post(&self, path: &str) -> ureq::Request {
        self.agent
            .post(&format!("{}/{}", self.base_url, path))
            .set(API_KEY_HEADER, &self.api_key)
            .set(API_VERSION_HEADER, &self.api_version)
    }

    fn send<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, SetupError> {
        let response = self.post(path).send_json(body).map_err(|err| {
            SetupError::remote(format!(
                "{} on index `{}` failed: {}",
                path,
                self.name,
                handle_http_error(err)
            ))
        })?;
        read_json(response, path).map_err(|failure| SetupError::remote(failure.to_string()))
    }
}

impl VectorIndex for RemoteIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn describe_stats(&self) -> Result<IndexStats, SetupError> {
        self.send("describe_index_stats", serde_json::json!({}))
    }

    fn upsert(
        &self,
        records: &[VectorRecord],
        namespace: Option<&str>,
    ) -> Result<usize, SetupError> {
        if records.iter().any(|record| record.sparse_values.is_some()) {
            self.ensure_sparse_supported("upsert")?;
        }

        let mut upserted = 0;
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let mut body = serde_json::json!({ "vectors": batch });
            if let Some(namespace) = namespace {
                body["namespace"] = serde_json::Value::from(namespace);
            }
            let response: UpsertResponse = self.send("vectors/upsert", body)?;
            upserted += response.upserted_count;
        }

        debug!(
            target: "pinecone_bootstrap::index",
            index = %self.name,
            upserted,
            "upsert finished"
        );
        Ok(upserted)
    }

    fn query(&self, request: &QueryRequest) -> Result<Vec<QueryMatch>, SetupError> {
        if request.top_k == 0 {
            return Err(SetupError::remote("top_k must be at least 1"));
        }
        if request.sparse_vector.is_some() {
            self.ensure_sparse_supported("query")?;
        }
        let body = serde_json::to_value(request)
            .map_err(|err| SetupError::remote(format!("failed to encode query: {err}")))?;
        let response: QueryResponse = self.send("query", body)?;
        Ok(response.matches)
    }
}
