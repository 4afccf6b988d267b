use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use voxflow_app::runtime::{build_backend, PipelineHandle};
use voxflow_app::Settings;
use voxflow_foundation::AppError;
use voxflow_store::{JsonTierStore, MemoryTierStore, TierStore};

#[derive(Parser, Debug)]
#[command(name = "voxflow", about = "Transcription job pipeline")]
struct Cli {
    /// Path to a settings file (defaults to config/default.toml)
    #[arg(long)]
    config: Option<String>,

    /// Override the configured backend kind (local|remote)
    #[arg(long)]
    backend: Option<String>,

    /// Override the tier store snapshot path
    #[arg(long, env = "VOXFLOW_STORE_PATH")]
    store_path: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::from_path(path),
        None => Settings::new(),
    }
    .map_err(AppError::Config)?;

    if let Some(kind) = cli.backend {
        settings.backend.kind = kind;
        settings.validate().map_err(AppError::Config)?;
    }
    if let Some(path) = cli.store_path {
        settings.store_path = Some(path);
    }

    let store: Arc<dyn TierStore> = match &settings.store_path {
        Some(path) => {
            Arc::new(JsonTierStore::open(path).context("opening tier store snapshot")?)
        }
        None => {
            info!("no store_path configured, tier state is in-memory only");
            Arc::new(MemoryTierStore::default())
        }
    };

    let backend = build_backend(&settings).context("constructing transcription backend")?;
    if !backend.is_available().await {
        tracing::warn!(
            backend = %backend.info().id,
            "backend reports unavailable; jobs will fail until it recovers"
        );
    }

    let pipeline = PipelineHandle::start(&settings, store, backend)
        .context("starting pipeline")?;

    PipelineHandle::wait_for_shutdown_signal().await;

    let stats = pipeline.stats();
    info!(
        admitted = stats.counters.jobs_admitted,
        succeeded = stats.counters.jobs_succeeded,
        failed = stats.counters.jobs_failed,
        "final pipeline counters"
    );
    pipeline.shutdown().await?;
    Ok(())
}
