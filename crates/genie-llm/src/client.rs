//! HTTP client for an OpenAI-compatible chat and embeddings API.
//!
//! Wraps `reqwest` with bearer auth, a request timeout, retry on transient
//! failures, and typed request/response bodies. Point it at a mock server by
//! setting [`LlmConfig::base_url`].

use std::sync::LazyLock;
use std::time::Duration;

use genie_core::{AppConfig, OpportunityDigest};
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::retry::retry_with_backoff;

/// Maximum number of texts per `/embeddings` call.
pub const EMBEDDING_BATCH_SIZE: usize = 64;

const SUMMARY_MAX_TOKENS: u32 = 300;
const DEFAULT_TEMPERATURE: f32 = 0.7;

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("valid regex")
});

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection and model settings for [`LlmClient`].
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub chat_model: String,
    pub summary_model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl LlmConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            api_key: config.openai_api_key.clone(),
            base_url: config.llm_base_url.clone(),
            embedding_model: config.embedding_model.clone(),
            embedding_dim: config.embedding_dim,
            chat_model: config.chat_model.clone(),
            summary_model: config.summary_model.clone(),
            timeout_secs: config.llm_timeout_secs,
            max_retries: config.llm_max_retries,
            backoff_base_ms: 1_000,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_dim", &self.embedding_dim)
            .field("chat_model", &self.chat_model)
            .field("summary_model", &self.summary_model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Per-call knobs for [`LlmClient::chat_completion`].
#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions<'a> {
    pub model: &'a str,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Ask the API for a JSON object response.
    pub json_mode: bool,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'static str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for an OpenAI-compatible API.
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
    chat_url: String,
    embeddings_url: String,
}

impl LlmClient {
    /// Build a client from settings.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("genie/0.1 (opportunity-matching)")
            .build()?;

        let base = config.base_url.trim_end_matches('/');
        let chat_url = format!("{base}/chat/completions");
        let embeddings_url = format!("{base}/embeddings");

        Ok(Self {
            client,
            config,
            chat_url,
            embeddings_url,
        })
    }

    #[must_use]
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Run a chat completion and return the first choice's text.
    ///
    /// # Errors
    ///
    /// - [`LlmError::Api`] / [`LlmError::Http`] if the request fails after retries.
    /// - [`LlmError::Deserialize`] if the response body is not the expected shape.
    /// - [`LlmError::InvalidResponse`] if there is no choice or it has no content.
    pub async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions<'_>,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: options.model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response: ChatResponse = self
            .post_json(&self.chat_url, &request, "chat/completions")
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("chat completion had no content".to_string()))
    }

    /// Run a JSON-mode chat completion with the chat model and parse the reply.
    ///
    /// Markdown code fences around the JSON are tolerated.
    ///
    /// # Errors
    ///
    /// Everything [`Self::chat_completion`] returns, plus
    /// [`LlmError::Deserialize`] if the reply is not valid JSON.
    pub async fn structured_completion(
        &self,
        messages: &[ChatMessage],
    ) -> Result<serde_json::Value, LlmError> {
        let text = self
            .chat_completion(
                messages,
                CompletionOptions {
                    model: &self.config.chat_model,
                    temperature: DEFAULT_TEMPERATURE,
                    max_tokens: None,
                    json_mode: true,
                },
            )
            .await?;

        parse_json_reply(&text)
    }

    /// Generate embeddings for a batch of texts.
    ///
    /// Texts are sent in groups of [`EMBEDDING_BATCH_SIZE`]. Returns one
    /// vector per input, in input order.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::EmbeddingCount`] if a chunk comes back with the
    /// wrong number of vectors, or any request error.
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(EMBEDDING_BATCH_SIZE) {
            let request = EmbeddingRequest {
                model: &self.config.embedding_model,
                input: chunk,
                encoding_format: "float",
            };
            let mut response: EmbeddingResponse = self
                .post_json(&self.embeddings_url, &request, "embeddings")
                .await?;

            if response.data.len() != chunk.len() {
                return Err(LlmError::EmbeddingCount {
                    expected: chunk.len(),
                    actual: response.data.len(),
                });
            }

            response.data.sort_by_key(|d| d.index);
            all_embeddings.extend(response.data.into_iter().map(|d| d.embedding));
        }

        tracing::debug!(count = all_embeddings.len(), "generated embeddings");
        Ok(all_embeddings)
    }

    /// Ask the summary model for a short natural-language overview.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::chat_completion`].
    pub async fn summarize_opportunities(
        &self,
        items: &[OpportunityDigest],
    ) -> Result<String, LlmError> {
        let listing = serde_json::to_string_pretty(items).map_err(|e| LlmError::Deserialize {
            context: "opportunity digests".to_string(),
            source: e,
        })?;

        let prompt = format!(
            "Summarize the following {} opportunities in a brief, engaging way.\n\
             Focus on the most relevant and interesting aspects.\n\n\
             Opportunities:\n{listing}\n\n\
             Provide a natural language summary that highlights:\n\
             1. The total number and types of opportunities\n\
             2. Key highlights or standout opportunities\n\
             3. Geographic distribution if relevant\n",
            items.len()
        );
        let messages = [
            ChatMessage::system(
                "You are a helpful assistant that summarizes job and opportunity listings.",
            ),
            ChatMessage::user(prompt),
        ];

        self.chat_completion(
            &messages,
            CompletionOptions {
                model: &self.config.summary_model,
                temperature: DEFAULT_TEMPERATURE,
                max_tokens: Some(SUMMARY_MAX_TOKENS),
                json_mode: false,
            },
        )
        .await
    }

    /// POST a JSON body with retry and decode a JSON response.
    async fn post_json<B, R>(&self, url: &str, body: &B, context: &str) -> Result<R, LlmError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        retry_with_backoff(self.config.max_retries, self.config.backoff_base_ms, || async move {
            let response = self
                .client
                .post(url)
                .bearer_auth(&self.config.api_key)
                .json(body)
                .send()
                .await?;

            let status = response.status();
            let text = response.text().await?;
            if !status.is_success() {
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: api_error_message(&text),
                });
            }

            serde_json::from_str(&text).map_err(|e| LlmError::Deserialize {
                context: context.to_string(),
                source: e,
            })
        })
        .await
    }
}

/// Parse a model reply as JSON, stripping a surrounding Markdown fence.
pub(crate) fn parse_json_reply(text: &str) -> Result<serde_json::Value, LlmError> {
    let body = JSON_FENCE
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map_or(text, |m| m.as_str());

    serde_json::from_str(body.trim()).map_err(|e| LlmError::Deserialize {
        context: "structured completion".to_string(),
        source: e,
    })
}

/// Pull `error.message` out of an OpenAI-style error body, or fall back to
/// the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}
