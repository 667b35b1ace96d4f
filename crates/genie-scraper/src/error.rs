use genie_db::DbError;
use genie_llm::LlmError;
use thiserror::Error;

/// Errors from fetching and normalizing a source.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("normalization error for {source_name}: {reason}")]
    Normalization { source_name: String, reason: String },
}

/// Errors from goal intake and ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("language model error: {0}")]
    Llm(#[from] LlmError),
}
