#![doc = "Apps Script REST client: bridges the core `ScriptApi` trait to the remote service."]
//
//! # Apps Script client (CLI <-> Core)
//!
//! [`ScriptsClient`] implements [`ScriptApi`] against the Apps Script REST API
//! (`https://script.googleapis.com/v1`). Every call carries the bearer token produced by
//! the authorizer.
//!
//! Non-success responses are decoded into an [`ApiFailure`] holding the HTTP code and,
//! when the body is a Google error envelope, the structured status. Transport errors
//! become an [`ApiFailure`] with only a message. Nothing is retried.

use appsscript_deploy_core::contract::{
    AccessToken, DeploymentConfig, ExecutionRequest, ExecutionResponse, ScriptApi, ScriptFile,
    Version,
};
use appsscript_deploy_core::diagnostics::ApiFailure;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_BASE_URL: &str = "https://script.googleapis.com";

#[derive(Serialize)]
struct ContentBody<'a> {
    files: &'a [ScriptFile],
}

#[derive(Serialize)]
struct VersionBody<'a> {
    description: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentBody<'a> {
    deployment_config: &'a DeploymentConfig,
}

pub struct ScriptsClient {
    http: reqwest::Client,
    base_url: String,
}

impl ScriptsClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    /// Points the client at another API root, e.g. a local test server.
    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        token: &AccessToken,
    ) -> Result<T, ApiFailure> {
        let response = request
            .bearer_auth(&token.token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "Request to Apps Script API failed");
                ApiFailure::transport(e.to_string())
            })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiFailure::transport(e.to_string()))?;

        if !status.is_success() {
            let failure = ApiFailure::from_response(status.as_u16(), &body);
            tracing::error!(status = status.as_u16(), error = %failure, "Apps Script API returned an error");
            return Err(failure);
        }

        // An empty success body carries no fields; every response type defaults them.
        let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| {
            tracing::error!(error = ?e, "Unexpected Apps Script API response");
            ApiFailure {
                message: format!("invalid response body: {e}"),
                http_code: Some(status.as_u16()),
                remote: None,
            }
        })
    }
}

#[async_trait]
impl ScriptApi for ScriptsClient {
    async fn update_content(
        &self,
        token: &AccessToken,
        script_id: &str,
        files: &[ScriptFile],
    ) -> Result<(), ApiFailure> {
        tracing::info!(script_id, files = files.len(), "Replacing project content");
        let request = self
            .http
            .put(self.url(&format!("projects/{script_id}/content")))
            .json(&ContentBody { files });
        self.send::<Value>(request, token).await?;
        Ok(())
    }

    async fn create_version(
        &self,
        token: &AccessToken,
        script_id: &str,
        description: &str,
    ) -> Result<Version, ApiFailure> {
        tracing::info!(script_id, description, "Creating project version");
        let request = self
            .http
            .post(self.url(&format!("projects/{script_id}/versions")))
            .json(&VersionBody { description });
        self.send(request, token).await
    }

    async fn update_deployment(
        &self,
        token: &AccessToken,
        script_id: &str,
        deployment_id: &str,
        config: &DeploymentConfig,
    ) -> Result<(), ApiFailure> {
        tracing::info!(
            script_id,
            deployment_id,
            version = config.version_number,
            "Updating deployment"
        );
        let request = self
            .http
            .put(self.url(&format!("projects/{script_id}/deployments/{deployment_id}")))
            .json(&DeploymentBody {
                deployment_config: config,
            });
        self.send::<Value>(request, token).await?;
        Ok(())
    }

    async fn run_function(
        &self,
        token: &AccessToken,
        script_id: &str,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResponse, ApiFailure> {
        tracing::info!(script_id, function = %request.function, "Running function");
        let http_request = self
            .http
            .post(self.url(&format!("scripts/{script_id}:run")))
            .json(request);
        self.send(http_request, token).await
    }
}
