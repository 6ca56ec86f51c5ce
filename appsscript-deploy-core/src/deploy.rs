//! High-level pipeline: authenticate → upload content → create version → repoint deployment → run.
//!
//! Stages run strictly in order and each stage's success is required for the next. The
//! deployment update only happens when a deployment id is configured and a version number
//! came back; the remote run only happens when a function name is configured.
//!
//! # Error Handling
//! Every remote failure is wrapped into a [`DeployError::Deployment`] tagged with its
//! [`Stage`] and the original [`ApiFailure`]. Nothing is retried and nothing is rolled back:
//! a failure at stage N leaves the effects of stages before it in place.
//!
//! # Navigation
//! - Main entrypoint: [`Deployer::run`]
//! - Supporting types: [`DeploymentReport`], [`parse_parameters`].

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::collect::MANIFEST_NAME;
use crate::config::DeployConfig;
use crate::contract::{
    AccessToken, Authorizer, DeploymentConfig, ExecutionRequest, ScriptApi, ScriptFile, SCOPES,
};
use crate::diagnostics::{self, ApiFailure};
use crate::error::{DeployError, Stage};

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeploymentReport {
    pub files_uploaded: usize,
    pub version_number: Option<i64>,
    /// Set when a deployment was repointed to the new version.
    pub deployment_id: Option<String>,
    /// Set when the remote function ran without an embedded error.
    pub function_run: Option<String>,
    /// Result payload of the remote function, verbatim.
    pub function_response: Option<Value>,
}

/// Runs the deployment stages against a [`ScriptApi`].
pub struct Deployer<'a, A, S> {
    config: &'a DeployConfig,
    authorizer: &'a A,
    api: &'a S,
}

impl<'a, A, S> Deployer<'a, A, S>
where
    A: Authorizer,
    S: ScriptApi,
{
    pub fn new(config: &'a DeployConfig, authorizer: &'a A, api: &'a S) -> Self {
        Self {
            config,
            authorizer,
            api,
        }
    }

    /// Publishes `files` as the complete project content and runs the remaining stages.
    pub async fn run(&self, files: &[ScriptFile]) -> Result<DeploymentReport, DeployError> {
        let script_id = self.config.script_id.as_str();
        info!(script_id, files = files.len(), "[DEPLOY] Starting deployment pipeline");

        let scopes = SCOPES.iter().map(|s| s.to_string()).collect();
        let token = self
            .authorizer
            .authorize(&self.config.credentials, scopes)
            .await
            .map_err(|e| {
                error!(error = %e, "[DEPLOY][ERROR] Authorization failed");
                e
            })?;
        info!("[DEPLOY] Authorized service account");

        let mut report = DeploymentReport::default();

        self.api
            .update_content(&token, script_id, files)
            .await
            .map_err(|e| stage_failure(Stage::ContentUpdate, "Failed to update the project content.", e))?;
        report.files_uploaded = files.len();
        info!(count = files.len(), "[DEPLOY] Project content updated");

        let version = self
            .api
            .create_version(&token, script_id, &automated_description())
            .await
            .map_err(|e| stage_failure(Stage::VersionCreation, "Failed to create a new project version.", e))?;
        report.version_number = version.version_number;
        match version.version_number {
            Some(number) => info!(version = number, "[DEPLOY] Created version"),
            None => warn!("[DEPLOY] Created version but did not receive a version number"),
        }

        if let (Some(deployment_id), Some(version_number)) =
            (self.config.deployment_id.as_deref(), version.version_number)
        {
            self.update_deployment(&token, deployment_id, version_number)
                .await?;
            report.deployment_id = Some(deployment_id.to_string());
        }

        if let Some(function) = self.config.run_function.as_deref() {
            report.function_response = self.run_function(&token, function).await?;
            report.function_run = Some(function.to_string());
        }

        info!(?report, "[DEPLOY] Deployment pipeline complete");
        Ok(report)
    }

    async fn update_deployment(
        &self,
        token: &AccessToken,
        deployment_id: &str,
        version_number: i64,
    ) -> Result<(), DeployError> {
        let config = DeploymentConfig {
            version_number,
            manifest_file_name: MANIFEST_NAME.to_string(),
            description: automated_description(),
        };
        self.api
            .update_deployment(token, &self.config.script_id, deployment_id, &config)
            .await
            .map_err(|e| {
                stage_failure(
                    Stage::DeploymentUpdate,
                    &format!("Failed to update deployment {deployment_id}."),
                    e,
                )
            })?;
        info!(deployment_id, version = version_number, "[DEPLOY] Deployment repointed");
        Ok(())
    }

    async fn run_function(
        &self,
        token: &AccessToken,
        function: &str,
    ) -> Result<Option<Value>, DeployError> {
        let request = ExecutionRequest {
            function: function.to_string(),
            parameters: parse_parameters(self.config.run_parameters.as_deref()),
        };
        info!(function, parameters = request.parameters.len(), "[DEPLOY] Running function");

        let context = format!("Failed to execute post-deployment function {function}.");
        let response = self
            .api
            .run_function(token, &self.config.script_id, &request)
            .await
            .map_err(|e| stage_failure(Stage::FunctionExecution, &context, e))?;

        if let Some(status) = response.error {
            let payload = serde_json::to_string(&status).unwrap_or_default();
            error!(function, error = %payload, "[DEPLOY][ERROR] Function returned an error");
            let failure = ApiFailure {
                message: "the script returned an error".to_string(),
                http_code: None,
                remote: Some(status),
            };
            return Err(stage_failure(Stage::FunctionExecution, &context, failure));
        }

        info!(function, "[DEPLOY] Function executed successfully");
        Ok(response.response)
    }
}

fn stage_failure(stage: Stage, context: &str, failure: ApiFailure) -> DeployError {
    let message = diagnostics::describe(&format!("[{stage}] {context}"), &failure);
    error!(%stage, error = %message, "[DEPLOY][ERROR] Stage failed");
    DeployError::Deployment {
        stage,
        message,
        cause: Some(failure),
    }
}

fn automated_description() -> String {
    format!(
        "Automated deployment {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Builds the positional argument list for a remote run.
///
/// A JSON array is used as-is, any other JSON value becomes a one-element list, and text
/// that is not JSON at all is passed as a single string. Absent or empty input gives `[]`.
pub fn parse_parameters(raw: Option<&str>) -> Vec<Value> {
    let Some(raw) = raw.filter(|r| !r.is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(values)) => values,
        Ok(value) => vec![value],
        Err(_) => vec![Value::String(raw.to_string())],
    }
}
