//! # docweave-inference
//!
//! Client for the external NLP service that produces summaries.
//!
//! ```rust,ignore
//! use docweave_inference::{AiClient, AiClientConfig};
//! use docweave_core::{SummarizationBackend, SummarizeOptions};
//!
//! let client = AiClient::new(AiClientConfig::from_env())?;
//! if client.is_healthy().await {
//!     let result = client.summarize(text, &SummarizeOptions::default()).await?;
//! }
//! ```

pub mod client;

pub use client::{AiClient, AiClientConfig};
pub use docweave_core::{SummarizationBackend, SummarizeOptions, SummaryResult};
