//! Error kinds for the deployment run.
//!
//! Pre-flight failures (credentials, local sources) have their own types; every
//! remote stage failure is a [`DeployError::Deployment`] distinguished by its
//! [`Stage`] and optionally carrying the [`ApiFailure`] that caused it.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::ApiFailure;

/// The credential configuration value could not be turned into a service account key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Credential error: {0}")]
pub struct CredentialError(pub String);

/// The local source root is missing, not a directory, or unreadable.
#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("Source directory not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Source path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Obtaining an access token for the service account failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid service account key: {0}")]
    InvalidKey(String),

    #[error("Token request failed: {0}")]
    Transport(String),

    #[error("Token request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// The remote stage a [`DeployError::Deployment`] happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ContentUpdate,
    VersionCreation,
    DeploymentUpdate,
    FunctionExecution,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ContentUpdate => "content update",
            Stage::VersionCreation => "version creation",
            Stage::DeploymentUpdate => "deployment update",
            Stage::FunctionExecution => "function execution",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum DeployError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{message}")]
    Deployment {
        stage: Stage,
        message: String,
        #[source]
        cause: Option<ApiFailure>,
    },
}

impl DeployError {
    /// The stage of a remote failure, `None` for pre-flight and auth errors.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            DeployError::Deployment { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The remote failure attached to this error, if any.
    pub fn api_failure(&self) -> Option<&ApiFailure> {
        match self {
            DeployError::Deployment { cause, .. } => cause.as_ref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
