//! Background summarization of newly extracted text.
//!
//! The attachment path hands `(file_asset_id, text)` to a [`SummaryQueue`]
//! and returns immediately. A single dispatcher task drains the queue and
//! runs up to `workers` summarizations at once. Each request gets exactly one
//! attempt: failures are logged, broadcast as events and dropped.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use docweave_core::{defaults, Error, Result, SummarizeOptions, SummaryScheduler};

use crate::summary::SummaryService;

/// Configuration for the summarization pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// When false, every scheduled request is dropped.
    pub enabled: bool,
    /// Maximum concurrent summarizations.
    pub workers: usize,
    /// Requests buffered before new ones are dropped.
    pub queue_capacity: usize,
    /// Options passed through to the NLP service.
    pub options: SummarizeOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            workers: defaults::SUMMARY_WORKERS,
            queue_capacity: defaults::SUMMARY_QUEUE_CAPACITY,
            options: SummarizeOptions::default(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `SUMMARY_ENABLED` | `true` | Enable/disable background summarization |
    /// | `SUMMARY_WORKERS` | `2` | Max concurrent summarizations |
    /// | `SUMMARY_QUEUE_CAPACITY` | `256` | Pending requests before dropping |
    pub fn from_env() -> Self {
        let enabled = std::env::var("SUMMARY_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let workers = std::env::var("SUMMARY_WORKERS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::SUMMARY_WORKERS)
            .max(1);

        let queue_capacity = std::env::var("SUMMARY_QUEUE_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::SUMMARY_QUEUE_CAPACITY)
            .max(1);

        Self {
            enabled,
            workers,
            queue_capacity,
            options: SummarizeOptions::default(),
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_options(mut self, options: SummarizeOptions) -> Self {
        self.options = options;
        self
    }
}

/// Event emitted by the pipeline. For observation only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// Dispatcher started.
    Started,
    /// A summarization call began.
    SummaryStarted { file_asset_id: Uuid },
    /// A summary was stored.
    SummaryCompleted { file_asset_id: Uuid, summary_id: Uuid },
    /// The single attempt failed; nothing was stored.
    SummaryFailed { file_asset_id: Uuid, error: String },
    /// The request never ran (disabled, queue full, or shut down).
    Dropped { file_asset_id: Uuid, reason: String },
    /// Dispatcher stopped.
    Stopped,
}

#[derive(Debug)]
struct SummaryRequest {
    file_asset_id: Uuid,
    text: String,
}

/// Non-blocking entry point into the pipeline.
#[derive(Clone)]
pub struct SummaryQueue {
    tx: Option<mpsc::Sender<SummaryRequest>>,
    event_tx: broadcast::Sender<PipelineEvent>,
}

impl SummaryQueue {
    fn drop_request(&self, file_asset_id: Uuid, reason: &str) {
        warn!(
            subsystem = "jobs",
            component = "pipeline",
            op = "schedule",
            file_asset_id = %file_asset_id,
            reason,
            "Summary request dropped"
        );
        let _ = self.event_tx.send(PipelineEvent::Dropped {
            file_asset_id,
            reason: reason.to_string(),
        });
    }
}

impl SummaryScheduler for SummaryQueue {
    fn schedule(&self, file_asset_id: Uuid, text: String) {
        if text.trim().is_empty() {
            debug!(file_asset_id = %file_asset_id, "No text to summarize, skipping");
            return;
        }
        let Some(tx) = &self.tx else {
            self.drop_request(file_asset_id, "summarization disabled");
            return;
        };
        match tx.try_send(SummaryRequest {
            file_asset_id,
            text,
        }) {
            Ok(()) => debug!(
                subsystem = "jobs",
                component = "pipeline",
                op = "schedule",
                file_asset_id = %file_asset_id,
                "Summary request queued"
            ),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.drop_request(file_asset_id, "queue full")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.drop_request(file_asset_id, "pipeline stopped")
            }
        }
    }
}

/// Handle for controlling a running pipeline.
pub struct PipelineHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<PipelineEvent>,
    task: Option<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Get a receiver for pipeline events.
    pub fn events(&self) -> broadcast::Receiver<PipelineEvent> {
        self.event_rx.resubscribe()
    }

    /// Stop accepting work and wait for in-flight summarizations to finish.
    ///
    /// Requests still queued are abandoned.
    pub async fn shutdown(mut self) -> Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        // The dispatcher may already have exited because every queue was dropped.
        let _ = self.shutdown_tx.send(()).await;
        task.await
            .map_err(|e| Error::Internal(format!("Summarization dispatcher panicked: {}", e)))
    }
}

/// Background summarization pipeline.
pub struct SummarizationPipeline {
    service: SummaryService,
    config: PipelineConfig,
    event_tx: broadcast::Sender<PipelineEvent>,
}

impl SummarizationPipeline {
    pub fn new(service: SummaryService, config: PipelineConfig) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            service,
            config,
            event_tx,
        }
    }

    /// Get a receiver for pipeline events.
    pub fn events(&self) -> broadcast::Receiver<PipelineEvent> {
        self.event_tx.subscribe()
    }

    /// Spawn the dispatcher. Must be called from within a tokio runtime.
    pub fn start(self) -> (SummaryQueue, PipelineHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        if !self.config.enabled {
            info!(
                subsystem = "jobs",
                component = "pipeline",
                "Summarization is disabled, not starting"
            );
            let queue = SummaryQueue {
                tx: None,
                event_tx: self.event_tx.clone(),
            };
            let handle = PipelineHandle {
                shutdown_tx,
                event_rx,
                task: None,
            };
            return (queue, handle);
        }

        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let queue = SummaryQueue {
            tx: Some(tx),
            event_tx: self.event_tx.clone(),
        };
        let task = tokio::spawn(self.run(rx, shutdown_rx));
        let handle = PipelineHandle {
            shutdown_tx,
            event_rx,
            task: Some(task),
        };
        (queue, handle)
    }

    async fn run(
        self,
        mut rx: mpsc::Receiver<SummaryRequest>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let workers = self.config.workers.max(1);
        info!(
            subsystem = "jobs",
            component = "pipeline",
            workers,
            queue_capacity = self.config.queue_capacity,
            "Summarization pipeline started"
        );
        let _ = self.event_tx.send(PipelineEvent::Started);

        let permits = Arc::new(Semaphore::new(workers));
        let options = Arc::new(self.config.options.clone());
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                Some(()) = shutdown_rx.recv() => {
                    info!(subsystem = "jobs", component = "pipeline", "Pipeline received shutdown signal");
                    break;
                }
                request = rx.recv() => {
                    let Some(request) = request else {
                        debug!("All summary queues dropped");
                        break;
                    };
                    let Ok(permit) = permits.clone().acquire_owned().await else {
                        break;
                    };
                    let service = self.service.clone();
                    let event_tx = self.event_tx.clone();
                    let options = options.clone();
                    tasks.spawn(async move {
                        let _permit = permit;
                        summarize_once(&service, &event_tx, request, &options).await;
                    });
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = ?e, "Summarization task panicked");
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = ?e, "Summarization task panicked");
            }
        }

        let _ = self.event_tx.send(PipelineEvent::Stopped);
        info!(subsystem = "jobs", component = "pipeline", "Summarization pipeline stopped");
    }
}

/// Run one summarization attempt, swallowing any failure.
async fn summarize_once(
    service: &SummaryService,
    event_tx: &broadcast::Sender<PipelineEvent>,
    request: SummaryRequest,
    options: &SummarizeOptions,
) {
    let file_asset_id = request.file_asset_id;
    let _ = event_tx.send(PipelineEvent::SummaryStarted { file_asset_id });

    match service
        .generate_summary(file_asset_id, &request.text, options)
        .await
    {
        Ok(summary) => {
            let _ = event_tx.send(PipelineEvent::SummaryCompleted {
                file_asset_id,
                summary_id: summary.id,
            });
        }
        Err(e) => {
            warn!(
                subsystem = "jobs",
                component = "pipeline",
                op = "summarize",
                file_asset_id = %file_asset_id,
                error = %e,
                "Summarization failed, dropping request"
            );
            let _ = event_tx.send(PipelineEvent::SummaryFailed {
                file_asset_id,
                error: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders_clamp() {
        let config = PipelineConfig::default()
            .with_workers(0)
            .with_queue_capacity(0)
            .with_enabled(false);
        assert_eq!(config.workers, 1);
        assert_eq!(config.queue_capacity, 1);
        assert!(!config.enabled);
        assert_eq!(config.options, SummarizeOptions::default());
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert!(config.enabled);
        assert_eq!(config.workers, 2);
        assert_eq!(config.queue_capacity, 256);
    }
}
