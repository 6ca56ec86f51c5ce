//! This module implements the CLI interface for appsscript-deploy: command parsing,
//! settings resolution, wiring of the HTTP implementations, and user-visible output.
//!
//! All core business logic (collection, diagnostics, the pipeline) lives in the
//! [`appsscript-deploy-core`] crate. This module is strictly CLI glue.
//!
//! ## How To Use
//! - For command-line users: run the `appsscript-deploy` binary with `--help`.
//! - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
//!
//! [`appsscript-deploy-core`]: ../../appsscript-deploy-core/

use crate::auth::ServiceAccountAuthorizer;
use crate::client::{ScriptsClient, DEFAULT_BASE_URL};
use crate::load_config::{resolve_settings, Overrides};
use anyhow::{Context, Result};
use appsscript_deploy_core::collect::collect_script_files;
use appsscript_deploy_core::credentials::resolve_credentials;
use appsscript_deploy_core::deploy::{DeploymentReport, Deployer};
use appsscript_deploy_core::diagnostics::diagnostic_block;
use appsscript_deploy_core::error::DeployError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// CLI for appsscript-deploy: publish a directory to an Apps Script project.
#[derive(Parser, Debug)]
#[clap(
    name = "appsscript-deploy",
    version,
    about = "Upload local sources to an Apps Script project, create a version, repoint a deployment and optionally run a function"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload the sources, create a version, then update the deployment and run the function if configured
    Deploy(DeployArgs),
    /// Show the files that would be uploaded, without contacting the remote service
    List(SourceArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Path to a YAML file with non-secret settings
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the project sources [default: src]
    #[clap(long, env = "APPS_SCRIPT_SOURCE_DIR")]
    pub source_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    #[clap(flatten)]
    pub source: SourceArgs,

    /// Target Apps Script project id
    #[clap(long, env = "APPS_SCRIPT_ID")]
    pub script_id: Option<String>,

    /// Service account key as raw or base64-encoded JSON. Prefer the environment variable
    #[clap(long, env = "GCP_SERVICE_ACCOUNT_KEY", hide_env_values = true)]
    pub service_account_key: Option<String>,

    /// Deployment to repoint to the new version
    #[clap(long, env = "APPS_SCRIPT_DEPLOYMENT_ID")]
    pub deployment_id: Option<String>,

    /// Function to run after deploying
    #[clap(long, env = "APPS_SCRIPT_RUN_FUNCTION")]
    pub run_function: Option<String>,

    /// Function arguments: a JSON array, a single JSON value, or plain text
    #[clap(long, env = "APPS_SCRIPT_RUN_PARAMETERS", allow_hyphen_values = true)]
    pub run_parameters: Option<String>,

    /// Root URL of the Apps Script API
    #[clap(long, env = "APPS_SCRIPT_API_URL", default_value = DEFAULT_BASE_URL, hide = true)]
    pub api_url: String,
}

impl SourceArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            config: self.config.clone(),
            source_dir: self.source_dir.clone(),
            ..Overrides::default()
        }
    }
}

impl DeployArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            script_id: self.script_id.clone(),
            deployment_id: self.deployment_id.clone(),
            run_function: self.run_function.clone(),
            run_parameters: self.run_parameters.clone(),
            ..self.source.overrides()
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Deploy(args) => deploy(args).await,
        Commands::List(args) => list(args),
    }
}

async fn deploy(args: DeployArgs) -> Result<()> {
    let settings = resolve_settings(&args.overrides())?;
    if settings.script_id.is_none() {
        anyhow::bail!(
            "APPS_SCRIPT_ID environment variable (or --script-id, or script_id in the config file) is required."
        );
    }
    let raw_key = args
        .service_account_key
        .filter(|k| !k.is_empty())
        .context("GCP_SERVICE_ACCOUNT_KEY environment variable is required.")?;
    let credentials = resolve_credentials(&raw_key).map_err(DeployError::from)?;

    let source_dir = settings.source_dir.clone();
    let config = settings.into_deploy_config(credentials)?;
    config.trace_loaded();

    let files = collect_script_files(&source_dir).map_err(DeployError::from)?;
    println!(
        "Preparing to upload {} file(s) to Apps Script project {}.",
        files.len(),
        config.script_id
    );

    let http = reqwest::Client::builder()
        .user_agent(concat!("appsscript-deploy/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to construct HTTP client")?;
    let authorizer = ServiceAccountAuthorizer::new(http.clone());
    let api = ScriptsClient::with_base_url(http, args.api_url);

    tracing::info!(command = "deploy", "Starting deployment");
    let report = Deployer::new(&config, &authorizer, &api).run(&files).await?;
    print_report(&report);
    tracing::info!(command = "deploy", ?report, "Deployment complete");
    Ok(())
}

fn list(args: SourceArgs) -> Result<()> {
    let settings = resolve_settings(&args.overrides())?;
    let files = collect_script_files(&settings.source_dir).map_err(DeployError::from)?;
    println!(
        "{} file(s) in {}:",
        files.len(),
        settings.source_dir.display()
    );
    for file in &files {
        println!(
            "  {:<9} {} ({} bytes)",
            file.file_type.as_str(),
            file.name,
            file.source.len()
        );
    }
    Ok(())
}

fn print_report(report: &DeploymentReport) {
    println!("Apps Script project content updated ({} file(s)).", report.files_uploaded);
    match report.version_number {
        Some(version) => println!("Created version {version}."),
        None => println!("Created version but did not receive a version number."),
    }
    if let (Some(deployment_id), Some(version)) = (&report.deployment_id, report.version_number) {
        println!("Deployment {deployment_id} updated to version {version}.");
    }
    if report.function_run.is_some() {
        println!("Post-deployment function executed successfully.");
    }
    if let Some(response) = &report.function_response {
        match serde_json::to_string_pretty(response) {
            Ok(json) => println!("Function response: {json}"),
            Err(_) => println!("Function response: {response}"),
        }
    }
}

/// Renders a failure for the error stream: the composed message and, when a remote
/// failure is attached, the diagnostic block below it.
pub fn render_error(err: &anyhow::Error) -> String {
    let mut out = err.to_string();
    let block = err
        .downcast_ref::<DeployError>()
        .and_then(DeployError::api_failure)
        .and_then(diagnostic_block);
    if let Some(block) = block {
        out.push('\n');
        out.push_str(&block);
    }
    out
}
