//! HTTP clients for the Pinecone REST API.
//!
//! `PineconeClient` talks to the control plane (list/create/describe
//! indexes); `RemoteIndex` talks to a single index's data-plane host.

mod index_client;
mod pinecone_client;

pub use index_client::RemoteIndex;
pub use pinecone_client::PineconeClient;

use std::fmt;

use serde::Deserialize;

pub const API_KEY_HEADER: &str = "Api-Key";
pub const API_VERSION_HEADER: &str = "X-Pinecone-API-Version";

/// Error body returned by the service.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Flattened view of a failed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl HttpFailure {
    pub fn is_status(&self, status: u16) -> bool {
        self.status == Some(status)
    }

    pub fn is_auth(&self) -> bool {
        self.is_status(401) || (self.is_status(403) && self.code.as_deref() != Some("FORBIDDEN"))
    }

    fn decode(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, &self.code) {
            (Some(status), Some(code)) => write!(f, "HTTP {} - {}: {}", status, code, self.message),
            (Some(status), None) => write!(f, "HTTP {}: {}", status, self.message),
            (None, _) => f.write_str(&self.message),
        }
    }
}

/// Convert a `ureq` error into an [`HttpFailure`], reading the service's
/// error body when there is one.
pub fn handle_http_error(error: ureq::Error) -> HttpFailure {
    match error {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(parsed) => HttpFailure {
                    status: Some(code),
                    code: (!parsed.error.code.is_empty()).then_some(parsed.error.code),
                    message: parsed.error.message,
                },
                Err(_) => HttpFailure {
                    status: Some(code),
                    code: None,
                    message: if body.trim().is_empty() {
                        "no response body".to_string()
                    } else {
                        body.trim().to_string()
                    },
                },
            }
        }
        ureq::Error::Transport(transport) => {
            HttpFailure::decode(format!("Transport error: {}", transport))
        }
    }
}

/// Parse a JSON response body, turning decode failures into an [`HttpFailure`].
pub fn read_json<T: serde::de::DeserializeOwned>(
    response: ureq::Response,
    what: &str,
) -> Result<T, HttpFailure> {
    response
        .into_json::<T>()
        .map_err(|err| HttpFailure::decode(format!("failed to parse {what} response: {err}")))
}

/// Normalise a host into a base URL: add `https://` when no scheme is
/// given and drop trailing slashes.
pub fn base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
