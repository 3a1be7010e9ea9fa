//! Remote providers backed by the Hugging Face Inference API.
//!
//! Both providers share the same transport behavior: a fixed request
//! deadline on the HTTP client, a 503 "model loading" response classified
//! as transient and retried once through the shared [`RetryPolicy`], and
//! every other failure surfaced as the provider's `*Unavailable` error.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{GenerationOptions, GenerationProvider};
use crate::retry::RetryPolicy;

/// Base URL of the hosted inference API.
const HF_API_BASE: &str = "https://api-inference.huggingface.co";

/// Default embedding model and its output dimensionality.
const DEFAULT_EMBED_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
const DEFAULT_EMBED_DIMENSIONS: usize = 384;

/// Default text-generation model.
const DEFAULT_GEN_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";

/// Request deadlines. Generation gets a much longer budget because the
/// hosted models stream nothing back until the completion is done.
const EMBED_TIMEOUT: Duration = Duration::from_secs(10);
const GEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport-level failure, classified for the retry policy.
#[derive(Debug)]
enum HfCallError {
    /// The model is still loading on the inference backend (HTTP 503).
    Loading(String),
    /// Any other failure: network, auth, malformed response.
    Other(String),
}

impl std::fmt::Display for HfCallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HfCallError::Loading(msg) => write!(f, "model loading: {msg}"),
            HfCallError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

fn is_transient(e: &HfCallError) -> bool {
    matches!(e, HfCallError::Loading(_))
}

#[derive(Deserialize)]
struct HfErrorBody {
    error: String,
}

/// Extract a readable message from an error response body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<HfErrorBody>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string())
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RagError::ConfigError(format!("failed to build HTTP client: {e}")))
}

// ── Embedding ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    inputs: Vec<&'a str>,
    options: RequestOptions,
}

#[derive(Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

/// An [`EmbeddingProvider`] backed by the Hugging Face
/// feature-extraction pipeline.
///
/// # Configuration
///
/// - `model` – defaults to `sentence-transformers/all-MiniLM-L6-v2`.
/// - `api_token` – from the constructor or the `HF_API_TOKEN`
///   environment variable.
pub struct HfEmbeddingProvider {
    client: reqwest::Client,
    api_token: String,
    model: String,
    dimensions: usize,
    base_url: String,
    retry: RetryPolicy,
}

impl HfEmbeddingProvider {
    /// Create a new provider with the given API token.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the token is empty.
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(RagError::ConfigError("API token must not be empty".into()));
        }
        Ok(Self {
            client: build_client(EMBED_TIMEOUT)?,
            api_token,
            model: DEFAULT_EMBED_MODEL.into(),
            dimensions: DEFAULT_EMBED_DIMENSIONS,
            base_url: HF_API_BASE.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Create a new provider using the `HF_API_TOKEN` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_token = std::env::var("HF_API_TOKEN").map_err(|_| {
            RagError::ConfigError("HF_API_TOKEN environment variable not set".into())
        })?;
        Self::new(api_token)
    }

    /// Set the model and its output dimensionality.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    /// Override the API base URL (for self-hosted endpoints or tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn request_embeddings(
        &self,
        texts: &[&str],
    ) -> std::result::Result<Vec<Vec<f32>>, HfCallError> {
        let url = format!("{}/pipeline/feature-extraction/{}", self.base_url, self.model);
        let body = EmbeddingRequest {
            inputs: texts.to_vec(),
            options: RequestOptions { wait_for_model: false },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| HfCallError::Other(format!("request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            return Err(HfCallError::Loading(error_detail(&body)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HfCallError::Other(format!("API returned {status}: {}", error_detail(&body))));
        }

        response
            .json::<Vec<Vec<f32>>>()
            .await
            .map_err(|e| HfCallError::Other(format!("failed to parse response: {e}")))
    }
}

#[async_trait]
impl EmbeddingProvider for HfEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingUnavailable {
            provider: "HuggingFace".into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "HuggingFace", batch_size = texts.len(), model = %self.model, "embedding batch");

        let embeddings = self
            .retry
            .run(|| self.request_embeddings(texts), is_transient)
            .await
            .map_err(|e| {
                error!(provider = "HuggingFace", error = %e, "embedding request failed");
                RagError::EmbeddingUnavailable {
                    provider: "HuggingFace".into(),
                    message: e.to_string(),
                }
            })?;

        if embeddings.len() != texts.len() {
            return Err(RagError::EmbeddingUnavailable {
                provider: "HuggingFace".into(),
                message: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    embeddings.len()
                ),
            });
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── Generation ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
    options: RequestOptions,
}

#[derive(Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool,
}

#[derive(Deserialize)]
struct GenerationChoice {
    generated_text: String,
}

/// A [`GenerationProvider`] backed by a hosted text-generation model.
pub struct HfGenerationProvider {
    client: reqwest::Client,
    api_token: String,
    model: String,
    base_url: String,
    retry: RetryPolicy,
}

impl HfGenerationProvider {
    /// Create a new provider with the given API token.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the token is empty.
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(RagError::ConfigError("API token must not be empty".into()));
        }
        Ok(Self {
            client: build_client(GEN_TIMEOUT)?,
            api_token,
            model: DEFAULT_GEN_MODEL.into(),
            base_url: HF_API_BASE.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Create a new provider using the `HF_API_TOKEN` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_token = std::env::var("HF_API_TOKEN").map_err(|_| {
            RagError::ConfigError("HF_API_TOKEN environment variable not set".into())
        })?;
        Self::new(api_token)
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL (for self-hosted endpoints or tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn request_completion(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> std::result::Result<String, HfCallError> {
        let url = format!("{}/models/{}", self.base_url, self.model);
        let body = GenerationRequest {
            inputs: prompt,
            parameters: GenerationParameters {
                max_new_tokens: options.max_tokens,
                temperature: options.temperature,
                return_full_text: false,
            },
            options: RequestOptions { wait_for_model: false },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| HfCallError::Other(format!("request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            return Err(HfCallError::Loading(error_detail(&body)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HfCallError::Other(format!("API returned {status}: {}", error_detail(&body))));
        }

        let choices: Vec<GenerationChoice> = response
            .json()
            .await
            .map_err(|e| HfCallError::Other(format!("failed to parse response: {e}")))?;

        choices
            .into_iter()
            .next()
            .map(|c| c.generated_text)
            .ok_or_else(|| HfCallError::Other("API returned no completions".into()))
    }
}

/// Remove any echoed prompt or instruction fragments from a completion.
///
/// Some hosted models ignore `return_full_text: false` and echo the
/// prompt back; everything up to and including the trailing `Answer:`
/// marker is dropped in that case.
fn strip_echoed_prompt<'a>(completion: &'a str, prompt: &str) -> &'a str {
    let without_prompt = completion.strip_prefix(prompt).unwrap_or(completion);
    let stripped = match without_prompt.rfind("Answer:") {
        Some(idx) => &without_prompt[idx + "Answer:".len()..],
        None => without_prompt,
    };
    stripped.trim()
}

#[async_trait]
impl GenerationProvider for HfGenerationProvider {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        debug!(
            provider = "HuggingFace",
            model = %self.model,
            prompt_len = prompt.len(),
            max_tokens = options.max_tokens,
            "generating completion"
        );

        let completion = self
            .retry
            .run(|| self.request_completion(prompt, options), is_transient)
            .await
            .map_err(|e| {
                error!(provider = "HuggingFace", error = %e, "generation request failed");
                RagError::GenerationUnavailable {
                    provider: "HuggingFace".into(),
                    message: e.to_string(),
                }
            })?;

        let answer = strip_echoed_prompt(&completion, prompt);
        if answer.is_empty() {
            return Err(RagError::GenerationUnavailable {
                provider: "HuggingFace".into(),
                message: "completion was empty after stripping the echoed prompt".into(),
            });
        }
        Ok(answer.to_string())
    }
}
