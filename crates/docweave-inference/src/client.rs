//! HTTP adapter for the external NLP service.
//!
//! Two endpoints are used:
//! - `POST {base_url}/nlp/summarize` with `{text, max_length, min_length, style}`
//! - `GET {base_url}/health`, where any 2xx means healthy
//!
//! Every call is a single attempt. There is no retry or backoff here.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use docweave_core::{
    defaults, Error, Result, SummarizationBackend, SummarizeOptions, SummaryResult,
};

/// Configuration for [`AiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiClientConfig {
    /// Base URL of the service, without trailing slash.
    pub base_url: String,
    /// Overall request timeout.
    pub request_timeout: Duration,
    /// Connection establishment timeout.
    pub connect_timeout: Duration,
}

impl Default for AiClientConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::AI_SERVICE_URL.to_string(),
            request_timeout: Duration::from_millis(defaults::AI_REQUEST_TIMEOUT_MS),
            connect_timeout: Duration::from_millis(defaults::AI_CONNECT_TIMEOUT_MS),
        }
    }
}

impl AiClientConfig {
    /// Load from `AI_SERVICE_URL` and `AI_SERVICE_TIMEOUT_MS`, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(defaults::ENV_AI_SERVICE_URL) {
            if !url.trim().is_empty() {
                config = config.with_base_url(url);
            }
        }
        if let Some(ms) = std::env::var(defaults::ENV_AI_SERVICE_TIMEOUT_MS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            config.request_timeout = Duration::from_millis(ms);
        }
        config
    }

    /// Set the base URL. A trailing slash is dropped.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim().trim_end_matches('/').to_string();
        self
    }

    /// Set the overall request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct SummarizeRequest<'a> {
    text: &'a str,
    max_length: u32,
    min_length: u32,
    style: &'a str,
}

/// Client for the NLP service.
#[derive(Debug, Clone)]
pub struct AiClient {
    client: Client,
    config: AiClientConfig,
}

impl AiClient {
    /// Build a client. Fails only if the HTTP stack cannot be initialised.
    pub fn new(config: AiClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Build a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(AiClientConfig::from_env())
    }

    pub fn config(&self) -> &AiClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }
}

#[async_trait]
impl SummarizationBackend for AiClient {
    async fn summarize(&self, text: &str, options: &SummarizeOptions) -> Result<SummaryResult> {
        let url = self.url("/nlp/summarize");
        let start = Instant::now();
        info!(
            subsystem = "inference",
            component = "ai_client",
            op = "summarize",
            text_len = text.chars().count(),
            max_length = options.max_length,
            min_length = options.min_length,
            style = %options.style,
            "Requesting summary"
        );

        let body = SummarizeRequest {
            text,
            max_length: options.max_length,
            min_length: options.min_length,
            style: &options.style,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("AI service unavailable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "AI service returned {}: {}",
                status,
                detail.chars().take(200).collect::<String>()
            )));
        }

        let raw = response
            .bytes()
            .await
            .map_err(|e| Error::Upstream(format!("AI service response unreadable: {}", e)))?;
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::Upstream("Empty response from AI service".to_string()));
        }

        let result: SummaryResult = serde_json::from_slice(&raw)
            .map_err(|e| Error::Upstream(format!("Malformed AI service response: {}", e)))?;

        debug!(
            subsystem = "inference",
            component = "ai_client",
            op = "summarize",
            model = %result.model_name,
            service_latency_ms = result.latency_ms,
            duration_ms = start.elapsed().as_millis() as u64,
            "Summary received"
        );
        Ok(result)
    }

    async fn is_healthy(&self) -> bool {
        match self.client.get(self.url("/health")).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(
                    subsystem = "inference",
                    component = "ai_client",
                    op = "health",
                    status = resp.status().as_u16(),
                    "AI service health check failed"
                );
                false
            }
            Err(e) => {
                warn!(
                    subsystem = "inference",
                    component = "ai_client",
                    op = "health",
                    error = %e,
                    "AI service health check error"
                );
                false
            }
        }
    }
}
