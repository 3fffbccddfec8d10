//! Error types for signalfire-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::DeploymentId;

/// Errors raised by configuration loading and collation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure while reading configuration.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The configuration parsed but is not usable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A collation rule pattern does not compile or has no capture group.
    #[error("invalid collation rule `{pattern}`: {reason}")]
    InvalidRule { pattern: String, reason: String },

    /// The deployment index points at a group that does not exist. This is a
    /// bug, never a runtime condition.
    #[error("internal consistency fault: deployment {deployment_id} maps to missing group `{group}`")]
    Inconsistent {
        deployment_id: DeploymentId,
        group: String,
    },
}

/// Failure of one call to a director.
#[derive(Debug, Error)]
pub enum DirectorError {
    /// The director could not be reached.
    #[error("transport error talking to {url}: {message}")]
    Transport { url: String, message: String },

    /// Credentials were rejected or a token could not be obtained.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The director answered with a non-success status.
    #[error("{url} returned HTTP {code}")]
    Status { url: String, code: u16 },

    /// The response body could not be decoded.
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// The target configuration could not produce a usable client.
    #[error("invalid director target: {0}")]
    InvalidTarget(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
