//! `load_config` module: loads the optional YAML settings file and merges it with values
//! given on the command line or in the environment.
//!
//! The YAML file holds non-secret settings only. The service account key is never read
//! from it; it comes from `GCP_SERVICE_ACCOUNT_KEY` and is attached by the CLI.
//!
//! # Precedence
//! Command-line flags and environment variables win over the file. Empty values count as
//! absent, since CI systems often export unset secrets as empty strings.
//!
//! # Errors
//! All errors use `anyhow::Error` for context-rich diagnostics and are surfaced at the
//! CLI boundary.

use anyhow::{Context, Result};
use appsscript_deploy_core::config::DeployConfig;
use appsscript_deploy_core::credentials::ServiceAccountKey;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const DEFAULT_SOURCE_DIR: &str = "src";

/// Settings accepted in the YAML file.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    #[serde(default)]
    pub script_id: Option<String>,
    #[serde(default)]
    pub deployment_id: Option<String>,
    #[serde(default)]
    pub run_function: Option<String>,
    /// A string is passed through as-is; any other YAML value is converted to JSON.
    #[serde(default)]
    pub run_parameters: Option<serde_json::Value>,
    #[serde(default)]
    pub source_dir: Option<PathBuf>,
}

/// Values from flags and environment variables.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub script_id: Option<String>,
    pub deployment_id: Option<String>,
    pub run_function: Option<String>,
    pub run_parameters: Option<String>,
    pub source_dir: Option<PathBuf>,
}

/// Merged, non-secret settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub script_id: Option<String>,
    pub deployment_id: Option<String>,
    pub run_function: Option<String>,
    pub run_parameters: Option<String>,
    pub source_dir: PathBuf,
}

impl Settings {
    /// Attaches credentials; fails when no project id was configured anywhere.
    pub fn into_deploy_config(self, credentials: ServiceAccountKey) -> Result<DeployConfig> {
        let script_id = self.script_id.context(
            "APPS_SCRIPT_ID environment variable (or --script-id, or script_id in the config file) is required.",
        )?;
        let mut config = DeployConfig::new(script_id, credentials);
        config.deployment_id = self.deployment_id;
        config.run_function = self.run_function;
        config.run_parameters = self.run_parameters;
        Ok(config)
    }
}

/// Reads and parses the YAML settings file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FileSettings> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty file deserializes as unit, not as a map.
    if config_content.trim().is_empty() {
        return Ok(FileSettings::default());
    }

    match serde_yaml::from_str(&config_content) {
        Ok(settings) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(settings)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

/// Loads the file named in `overrides` (if any) and applies the overrides on top.
pub fn resolve_settings(overrides: &Overrides) -> Result<Settings> {
    let file = match &overrides.config {
        Some(path) => load_config(path)?,
        None => FileSettings::default(),
    };

    let file_parameters = file.run_parameters.map(|value| match value {
        serde_json::Value::String(raw) => raw,
        other => other.to_string(),
    });

    let settings = Settings {
        script_id: pick(&overrides.script_id, file.script_id),
        deployment_id: pick(&overrides.deployment_id, file.deployment_id),
        run_function: pick(&overrides.run_function, file.run_function),
        run_parameters: pick(&overrides.run_parameters, file_parameters),
        source_dir: overrides
            .source_dir
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .or(file.source_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_DIR)),
    };
    info!(
        script_id = settings.script_id.as_deref().unwrap_or("-"),
        source_dir = %settings.source_dir.display(),
        "Settings resolved"
    );
    Ok(settings)
}

fn pick(preferred: &Option<String>, fallback: Option<String>) -> Option<String> {
    preferred
        .clone()
        .filter(|v| !v.is_empty())
        .or(fallback.filter(|v| !v.is_empty()))
}
