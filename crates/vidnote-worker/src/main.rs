//! Video processing worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vidnote_media::KeyframeExtractor;
use vidnote_state::{JobStore, MemoryJobStore, StatusFacade};
use vidnote_storage::{AssetPublisher, S3Client};
use vidnote_worker::{
    AnalysisEngine, CaptionExtractor, GeminiClient, PipelineOrchestrator, PipelineService,
    WorkerConfig,
};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::from_default_env().add_directive("vidnote=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vidnote-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let blob_store = match S3Client::from_env() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to create storage client: {}", e);
            std::process::exit(1);
        }
    };

    let model = match GeminiClient::new() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to create model client: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        store.clone(),
        Arc::new(CaptionExtractor::new()),
        AnalysisEngine::new(model),
        Arc::new(
            KeyframeExtractor::new(&config.work_dir)
                .with_capture_timeout(config.capture_timeout.as_secs()),
        ),
        AssetPublisher::new(blob_store),
        &config.work_dir,
    ));

    let service = PipelineService::new(store.clone(), orchestrator, &config);
    let _facade = StatusFacade::new(store);

    info!("Worker ready; waiting for shutdown signal");
    tokio::signal::ctrl_c().await.ok();

    info!("Received shutdown signal; draining in-flight jobs");
    if !service.shutdown(config.shutdown_timeout).await {
        error!("Shutdown timed out; abandoning in-flight jobs");
    }
    info!("Worker shutdown complete");
}
