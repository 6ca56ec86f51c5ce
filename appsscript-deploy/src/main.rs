use appsscript_deploy::cli::{render_error, run, Cli};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load environment
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout only carries the deployment report.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    tracing::info!("CLI arguments parsed, invoking run");
    match run(cli).await {
        Ok(()) => {
            tracing::info!("CLI completed successfully");
        }
        Err(e) => {
            tracing::error!(error = %e, "CLI exited with error");
            eprintln!("{}", render_error(&e));
            std::process::exit(1);
        }
    }
}
