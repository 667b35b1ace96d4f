use genie_db::DbError;
use genie_llm::LlmError;
use thiserror::Error;

/// Errors surfaced by ranking and monitoring.
///
/// A missing goal or embedding is not an error; those produce empty results.
#[derive(Debug, Error)]
pub enum RankerError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("language model error: {0}")]
    Llm(#[from] LlmError),

    #[error("dependency unavailable: {0}")]
    Unavailable(String),
}
