use clap::Parser;
use meshforge::catalog::engine::Catalog;
use meshforge::config::Config;
use meshforge::jobs::backend::HttpBackend;
use meshforge::jobs::executor::GenerationWorker;
use meshforge::jobs::queue::{InFlight, WorkQueue};
use meshforge::jobs::service::GenerationService;
use meshforge::jobs::store::JobTable;
use meshforge::routes;
use meshforge::storage::artifacts::ArtifactStore;
use meshforge::storage::cache::ArtifactCache;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_json);
    config.validate()?;

    tracing::info!("Starting meshforge on {}", config.bind);
    tracing::info!("Data directory: {}", config.data_dir.display());

    // 1. Durable state:
    let jobs = Arc::new(JobTable::open(config.data_dir.join("jobs")).await?);
    let cache = Arc::new(ArtifactCache::open(config.data_dir.join("cache")).await?);
    let artifacts = Arc::new(ArtifactStore::open(&config.data_dir).await?);

    // 2. Pipeline:
    let backend = Arc::new(HttpBackend::new(
        config.backend_url.clone(),
        config.backend_timeout(),
    )?);
    let queue = WorkQueue::new(config.queue_capacity);
    let in_flight = InFlight::new();

    let worker = GenerationWorker::new(
        queue.clone(),
        jobs.clone(),
        cache.clone(),
        artifacts.clone(),
        backend,
        in_flight.clone(),
        config.backend_timeout(),
        config.workers,
    );
    let service = GenerationService::new(
        jobs,
        cache,
        artifacts,
        queue,
        in_flight,
        config.pipeline_settings(),
    );

    worker.start();

    // Workers must be running: recovery may requeue jobs.
    let report = service.recover().await?;
    tracing::info!(
        "Recovered jobs: {} reconciled, {} requeued, {} failed",
        report.reconciled,
        report.requeued,
        report.failed
    );

    // 3. Catalog:
    let catalog = Arc::new(Catalog::load(&config.models_dir).await?);

    // 4. HTTP Router:
    let app = routes::router(service, catalog);

    // 5. Start HTTP server:
    tracing::info!("HTTP server listening on {}", config.bind);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
