//! # contract: interface to the remote script-hosting service
//!
//! Two traits separate the pipeline from transport details:
//!
//! - [`Authorizer`] exchanges service account credentials for a short-lived bearer token.
//! - [`ScriptApi`] exposes the four project operations the pipeline needs.
//!
//! Both are annotated for `mockall`, so the pipeline can be driven by deterministic mocks
//! in tests. The binary crate provides the HTTP implementations.
//!
//! Request and response types mirror the Apps Script REST payloads (camelCase on the wire).

use std::fmt;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::credentials::ServiceAccountKey;
use crate::diagnostics::{ApiFailure, RemoteStatus};
use crate::error::AuthError;

/// OAuth scopes requested for a deployment run.
pub const SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/script.projects",
    "https://www.googleapis.com/auth/script.deployments",
    "https://www.googleapis.com/auth/script.scriptapp",
];

/// Kind of a project file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    /// Server-side code (`.gs`, `.js`).
    ServerJs,
    /// Markup (`.html`).
    Html,
    /// The project manifest, `appsscript.json`.
    Json,
}

impl FileType {
    /// Wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::ServerJs => "SERVER_JS",
            FileType::Html => "HTML",
            FileType::Json => "JSON",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single file of the project content payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptFile {
    /// Slash-delimited logical path without extension.
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub source: String,
}

/// Bearer token returned by an [`Authorizer`].
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: Option<u64>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_in: None,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// An immutable project version, as returned by version creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    #[serde(default)]
    pub version_number: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
}

/// Target of a deployment pointer update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    pub version_number: i64,
    pub manifest_file_name: String,
    pub description: String,
}

/// A request to run a function of the deployed project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub function: String,
    pub parameters: Vec<Value>,
}

/// Result of a run: either `response` (result payload) or `error` (script failure).
///
/// A script failure arrives inside a successful transport response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    #[serde(default)]
    pub done: Option<bool>,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub error: Option<RemoteStatus>,
}

/// Obtains a bearer token for the given credentials and scopes.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(
        &self,
        credentials: &ServiceAccountKey,
        scopes: Vec<String>,
    ) -> Result<AccessToken, AuthError>;
}

/// The four remote project operations used by a deployment run.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ScriptApi: Send + Sync {
    /// Replace the whole project content with `files`. Remote files not listed are removed.
    async fn update_content(
        &self,
        token: &AccessToken,
        script_id: &str,
        files: &[ScriptFile],
    ) -> Result<(), ApiFailure>;

    /// Snapshot the current content as a new immutable version.
    async fn create_version(
        &self,
        token: &AccessToken,
        script_id: &str,
        description: &str,
    ) -> Result<Version, ApiFailure>;

    /// Repoint an existing deployment.
    async fn update_deployment(
        &self,
        token: &AccessToken,
        script_id: &str,
        deployment_id: &str,
        config: &DeploymentConfig,
    ) -> Result<(), ApiFailure>;

    /// Run a function of the project remotely.
    async fn run_function(
        &self,
        token: &AccessToken,
        script_id: &str,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResponse, ApiFailure>;
}
