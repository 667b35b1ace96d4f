use genie_core::CoreError;
use thiserror::Error;

/// Errors returned by the language-model client.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("LLM API returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// An embeddings call returned a different number of vectors than inputs.
    #[error("embedding API returned {actual} embeddings for {expected} inputs")]
    EmbeddingCount { expected: usize, actual: usize },

    /// The response parsed but is missing what the caller needs.
    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),

    /// The model output failed domain validation.
    #[error(transparent)]
    Core(#[from] CoreError),
}
