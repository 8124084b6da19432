mod reply;
mod routes;

use std::path::PathBuf;

use anyhow::Context;
use bl_app::ServiceConfig;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "bl-server")]
#[command(about = "HTTP service for battery cell simulations", long_about = None)]
struct Cli {
    /// YAML service configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the configuration file)
    #[arg(long)]
    bind: Option<String>,

    /// Wall-clock budget of one solve in seconds
    #[arg(long)]
    simulation_timeout_s: Option<f64>,

    #[arg(long)]
    max_concurrent_simulations: Option<usize>,

    /// Answer errors with HTTP 200
    #[arg(long)]
    legacy_error_status: bool,
}

impl Cli {
    fn resolve(&self) -> anyhow::Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::load(path)?,
            None => ServiceConfig::default(),
        };
        if let Some(bind) = &self.bind {
            config.bind = bind.clone();
        }
        if let Some(t) = self.simulation_timeout_s {
            config.simulation_timeout_s = t;
        }
        if let Some(n) = self.max_concurrent_simulations {
            config.max_concurrent_simulations = n;
        }
        config.legacy_error_status |= self.legacy_error_status;
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Cli::parse().resolve()?;
    let app = routes::router(routes::AppState::from_config(&config));

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("cannot bind {}", config.bind))?;
    info!(
        bind = %config.bind,
        timeout_s = config.simulation_timeout_s,
        concurrency = config.max_concurrent_simulations,
        legacy_error_status = config.legacy_error_status,
        "batterylab server listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
