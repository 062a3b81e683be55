use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::GeminiConfig;

/// Backoff used when a quota error carries no usable `retryDelay`.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

const QUOTA_STATUS: &str = "RESOURCE_EXHAUSTED";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(text.into()),
                }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<serde_json::Value>,
}

/// Why a single key failed to produce text.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error("transport error: {0:#}")]
    Transport(anyhow::Error),

    #[error("quota exhausted (retry after {}s)", .retry_after.as_secs_f64())]
    QuotaExhausted { retry_after: Duration },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Outcome of one `generate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Text(String),
    /// Every key was tried once and none produced text.
    Exhausted,
}

/// Sends one `generateContent` request and hands back the raw response body.
#[async_trait]
pub trait GeminiTransport: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<String>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl GeminiTransport for HttpTransport {
    async fn generate_content(
        &self,
        model: &str,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<String> {
        let url = format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        );

        debug!("Sending request to Gemini: {}", url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .context("Failed to send request to Gemini")?;

        // Quota errors arrive with a non-2xx status, so the body is read either way.
        response
            .text()
            .await
            .context("Failed to read Gemini response body")
    }
}

/// Calls Gemini with an ordered list of API keys, falling through to the next
/// key whenever one fails. Every call starts again from the first key.
pub struct GeminiClient {
    transport: Arc<dyn GeminiTransport>,
    credentials: Arc<[String]>,
    model: String,
    preamble: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::new(&config.base_url)))
    }

    pub fn with_transport(config: &GeminiConfig, transport: Arc<dyn GeminiTransport>) -> Self {
        Self {
            transport,
            credentials: config.credentials().into(),
            model: config.model.clone(),
            preamble: config.preamble.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn key_count(&self) -> usize {
        self.credentials.len()
    }

    fn wrap_prompt(&self, prompt: &str) -> String {
        format!("{}\n\nPertanyaan: {}", self.preamble, prompt)
    }

    pub async fn generate(&self, prompt: &str) -> Generation {
        let request = GenerateContentRequest::from_text(self.wrap_prompt(prompt));
        let total = self.credentials.len();

        for (index, key) in self.credentials.iter().enumerate() {
            let position = index + 1;
            match self.attempt(key, &request).await {
                Ok(text) => {
                    debug!("Gemini key {} answered ({} chars)", position, text.len());
                    return Generation::Text(text);
                }
                Err(AttemptError::QuotaExhausted { retry_after }) => {
                    warn!(
                        "Gemini key {}/{} quota exhausted, backing off {:.1}s",
                        position,
                        total,
                        retry_after.as_secs_f64()
                    );
                    tokio::time::sleep(retry_after).await;
                }
                Err(e @ AttemptError::Transport(_)) => {
                    error!("Gemini key {} failed: {}", position, e);
                }
                Err(e) => {
                    warn!("Gemini key {} failed: {}", position, e);
                }
            }
        }

        warn!("All {} Gemini keys failed for this request", total);
        Generation::Exhausted
    }

    async fn attempt(
        &self,
        key: &str,
        request: &GenerateContentRequest,
    ) -> std::result::Result<String, AttemptError> {
        let body = self
            .transport
            .generate_content(&self.model, key, request)
            .await
            .map_err(AttemptError::Transport)?;
        interpret_response(&body)
    }
}

fn interpret_response(body: &str) -> std::result::Result<String, AttemptError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| AttemptError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|t| !t.is_empty());
    if let Some(text) = text {
        return Ok(text);
    }

    match response.error {
        Some(err) if err.status == QUOTA_STATUS => Err(AttemptError::QuotaExhausted {
            retry_after: retry_delay(&err.details),
        }),
        Some(err) => Err(AttemptError::MalformedResponse(format!(
            "API error {} {}: {}",
            err.code.map(|c| c.to_string()).unwrap_or_default(),
            err.status,
            err.message
        ))),
        None => Err(AttemptError::MalformedResponse(
            "empty response from Gemini".to_string(),
        )),
    }
}

fn retry_delay(details: &[serde_json::Value]) -> Duration {
    details
        .iter()
        .find_map(|d| d.get("retryDelay").and_then(|v| v.as_str()))
        .and_then(parse_delay)
        .unwrap_or(DEFAULT_RETRY_DELAY)
}

/// Parse a protobuf-style duration such as `"27s"` or `"1.5s"`.
fn parse_delay(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.trim().trim_end_matches('s').parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}
