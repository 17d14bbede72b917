use clap::Parser;
use tracing_subscriber::EnvFilter;

use migrator_core::Config;

const DEFAULT_CONFIG_FILE: &str = "migrator.yaml";

/// Multi-tenant database schema migrator.
#[derive(Parser)]
#[command(name = "migrator", version)]
struct Args {
    /// Path to the migrator configuration YAML file
    #[arg(long = "config-file", default_value = DEFAULT_CONFIG_FILE)]
    config_file: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match Config::from_file(&args.config_file) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(config_file = %args.config_file, error = %e, "error reading config file");
            std::process::exit(1);
        }
    };

    if let Err(e) = migrator_http::serve(config).await {
        tracing::error!(error = %e, "error starting migrator");
        std::process::exit(1);
    }
}
