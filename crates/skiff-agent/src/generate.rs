//! Text-generation seam and HTTP-backed client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::AgentError;

/// The external AI text-generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AgentError>;
}

/// Client for an HTTP completion endpoint.
pub struct CompletionClient {
    http: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    text: String,
}

impl CompletionClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            // Generation can be slow; no internal deadline beyond the
            // transport's own
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for CompletionClient {
    async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "prompt": prompt }))
            .send()
            .await
            .map_err(|e| AgentError::Generation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Generation(format!("{}: {}", status, body)));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Generation(e.to_string()))?;
        debug!(response_len = body.text.len(), "completion received");
        Ok(body.text)
    }
}
