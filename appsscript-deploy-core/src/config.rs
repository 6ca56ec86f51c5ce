use tracing::{debug, info};

use crate::credentials::ServiceAccountKey;

/// Everything a deployment run needs, built once at process entry.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub script_id: String,
    pub credentials: ServiceAccountKey,
    pub deployment_id: Option<String>,
    pub run_function: Option<String>,
    /// Raw parameter value; see [`crate::deploy::parse_parameters`].
    pub run_parameters: Option<String>,
}

impl DeployConfig {
    pub fn new(script_id: impl Into<String>, credentials: ServiceAccountKey) -> Self {
        Self {
            script_id: script_id.into(),
            credentials,
            deployment_id: None,
            run_function: None,
            run_parameters: None,
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            script_id = %self.script_id,
            client_email = %self.credentials.client_email,
            deployment_id = self.deployment_id.as_deref().unwrap_or("-"),
            run_function = self.run_function.as_deref().unwrap_or("-"),
            "Loaded deploy config"
        );
        debug!(?self, "Deploy config loaded (full debug)");
    }
}
