use serde::Serialize;
use thiserror::Error;

/// Setup stage that produced a failure, so callers can branch on the cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SetupStage {
    Configuration,
    Connection,
    Provisioning,
    ModelLoad,
    Encoding,
    DataPlane,
}

impl SetupStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetupStage::Configuration => "configuration",
            SetupStage::Connection => "connection",
            SetupStage::Provisioning => "provisioning",
            SetupStage::ModelLoad => "model-load",
            SetupStage::Encoding => "encoding",
            SetupStage::DataPlane => "data-plane",
        }
    }
}

/// Errors shared across the setup pipeline.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A configuration value was present but malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Credentials were missing or the control plane rejected them.
    #[error("connection error: {0}")]
    Connection(String),

    /// Index listing, creation or lookup failed.
    #[error("provisioning error: {0}")]
    Provisioning(String),

    /// A model could not be resolved, fetched or instantiated.
    #[error("model load error: {0}")]
    ModelLoad(String),

    /// An encoder refused or failed to produce a vector.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A data-plane call on an index handle failed.
    #[error("remote index error: {0}")]
    Remote(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SetupError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn provisioning(msg: impl Into<String>) -> Self {
        Self::Provisioning(msg.into())
    }

    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    pub fn stage(&self) -> SetupStage {
        match self {
            SetupError::Config(_) | SetupError::Io(_) => SetupStage::Configuration,
            SetupError::Connection(_) => SetupStage::Connection,
            SetupError::Provisioning(_) => SetupStage::Provisioning,
            SetupError::ModelLoad(_) => SetupStage::ModelLoad,
            SetupError::Encoding(_) => SetupStage::Encoding,
            SetupError::Remote(_) => SetupStage::DataPlane,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_follows_variant() {
        assert_eq!(
            SetupError::connection("no key").stage(),
            SetupStage::Connection
        );
        assert_eq!(
            SetupError::provisioning("quota").stage(),
            SetupStage::Provisioning
        );
        assert_eq!(
            SetupError::model_load("missing").stage(),
            SetupStage::ModelLoad
        );
    }

    #[test]
    fn display_keeps_underlying_message() {
        let err = SetupError::provisioning("HTTP 403 - FORBIDDEN: quota exceeded");
        assert_eq!(
            err.to_string(),
            "provisioning error: HTTP 403 - FORBIDDEN: quota exceeded"
        );
    }
}
