//! Summary generation and access.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};
use uuid::Uuid;

use docweave_core::{
    Error, NewSummary, Result, SummarizationBackend, SummarizeOptions, Summary, SummaryRepository,
};

/// Generates summaries through the NLP backend and persists them.
#[derive(Clone)]
pub struct SummaryService {
    backend: Arc<dyn SummarizationBackend>,
    summaries: Arc<dyn SummaryRepository>,
}

impl SummaryService {
    pub fn new(
        backend: Arc<dyn SummarizationBackend>,
        summaries: Arc<dyn SummaryRepository>,
    ) -> Self {
        Self { backend, summaries }
    }

    /// Summarize `text` and store the result for `file_asset_id`.
    ///
    /// Blank text is rejected before the backend is called. One attempt only.
    pub async fn generate_summary(
        &self,
        file_asset_id: Uuid,
        text: &str,
        options: &SummarizeOptions,
    ) -> Result<Summary> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Cannot summarize empty text".to_string(),
            ));
        }

        let start = Instant::now();
        let result = self.backend.summarize(text, options).await?;
        if result.summary.trim().is_empty() {
            return Err(Error::Upstream(
                "AI service returned an empty summary".to_string(),
            ));
        }

        let summary = self
            .summaries
            .insert(NewSummary {
                file_asset_id,
                summary_text: result.summary,
                model_name: result.model_name,
                style: result.style.unwrap_or_else(|| options.style.clone()),
                latency_ms: result.latency_ms,
            })
            .await?;

        info!(
            subsystem = "jobs",
            component = "summary",
            op = "generate",
            file_asset_id = %file_asset_id,
            summary_id = %summary.id,
            model = %summary.model_name,
            duration_ms = start.elapsed().as_millis() as u64,
            "Summary stored"
        );
        Ok(summary)
    }

    /// All summaries for a file asset, newest first.
    pub async fn summaries_for_file(&self, file_asset_id: Uuid) -> Result<Vec<Summary>> {
        self.summaries.list_for_file(file_asset_id).await
    }

    /// The newest summary for a file asset.
    pub async fn latest_summary(&self, file_asset_id: Uuid) -> Result<Summary> {
        self.summaries
            .latest_for_file(file_asset_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No summary for file {}", file_asset_id)))
    }

    /// Remove every summary of a file asset.
    ///
    /// Not called when a file asset is deleted; summaries outlive their file
    /// until this runs.
    pub async fn delete_summaries_for_file(&self, file_asset_id: Uuid) -> Result<u64> {
        let removed = self.summaries.delete_for_file(file_asset_id).await?;
        debug!(
            subsystem = "jobs",
            component = "summary",
            op = "delete",
            file_asset_id = %file_asset_id,
            removed,
            "Deleted summaries"
        );
        Ok(removed)
    }

    /// Whether the NLP backend is reachable.
    pub async fn ai_healthy(&self) -> bool {
        self.backend.is_healthy().await
    }
}
