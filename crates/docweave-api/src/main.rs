//! docweave HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docweave_api::{router, AppState, ServerConfig, StorageBackend};
use docweave_db::{AttachmentCoordinator, Database, FilesystemBlobStore, Repositories};
use docweave_inference::AiClient;
use docweave_jobs::{PipelineConfig, SummarizationPipeline, SummaryService, TextExtractionService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "docweave_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "docweave_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("docweave-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false)); // no ANSI in files by default
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = ServerConfig::from_env()?;

    // Repositories
    let repos = match config.storage_backend {
        StorageBackend::Postgres => {
            let db =
                Database::connect_with_config(&config.database_url, config.pool.clone()).await?;
            db.migrate().await?;
            info!("Database migrations applied");
            db.repositories()
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            Repositories::memory()
        }
    };

    // Blob storage
    let blobs = FilesystemBlobStore::new(&config.upload_dir);
    if let Err(reason) = blobs.validate().await {
        anyhow::bail!("Upload directory unusable: {}", reason);
    }
    info!(upload_dir = %config.upload_dir.display(), "Blob store ready");

    // Text extraction
    let extractor = TextExtractionService::new();
    for (adapter, available) in extractor.health_check_all().await {
        if available {
            info!(adapter = %adapter, "Extraction adapter available");
        } else {
            warn!(adapter = %adapter, "Extraction adapter unavailable; its formats yield no text");
        }
    }

    // Summarization
    let ai_client = AiClient::from_env()?;
    info!(ai_service_url = %ai_client.config().base_url, "AI client configured");
    let summaries = SummaryService::new(Arc::new(ai_client), repos.summaries.clone());
    let (queue, pipeline) =
        SummarizationPipeline::new(summaries.clone(), PipelineConfig::from_env()).start();

    let coordinator = AttachmentCoordinator::new(
        repos.documents.clone(),
        repos.file_assets.clone(),
        Arc::new(blobs),
        Arc::new(extractor),
    )
    .with_scheduler(Arc::new(queue));

    let app = router(AppState {
        documents: repos.documents.clone(),
        coordinator,
        summaries,
        max_upload_bytes: config.max_upload_bytes,
    });

    // Start server
    let addr: SocketAddr = config.bind_addr().parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, draining summarization pipeline");
    pipeline.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
