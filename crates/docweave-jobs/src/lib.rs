//! # docweave-jobs
//!
//! Text extraction and background summarization for docweave.
//!
//! This crate provides:
//! - Fail-soft text extraction through per-format adapters
//! - Summary generation and lookup on top of an NLP backend
//! - A background pipeline that summarizes new attachments off the request path
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docweave_jobs::{PipelineConfig, SummarizationPipeline, SummaryService};
//!
//! let service = SummaryService::new(Arc::new(ai_client), repos.summaries.clone());
//! let (queue, handle) = SummarizationPipeline::new(service, PipelineConfig::from_env()).start();
//!
//! // Hand the queue to the attachment coordinator
//! let coordinator = coordinator.with_scheduler(Arc::new(queue));
//!
//! // Graceful shutdown
//! handle.shutdown().await?;
//! ```

pub mod adapters;
pub mod extraction;
pub mod pipeline;
pub mod summary;

pub use adapters::{
    ExtractionAdapter, LegacyOfficeAdapter, OfficeConvertAdapter, PdfTextAdapter,
    TextNativeAdapter,
};
pub use extraction::{detect_format, DetectedFormat, TextExtractionService, EXTRACTABLE_TYPES};
pub use pipeline::{
    PipelineConfig, PipelineEvent, PipelineHandle, SummarizationPipeline, SummaryQueue,
};
pub use summary::SummaryService;
