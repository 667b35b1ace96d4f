//! Language-model access for Genie: embeddings, chat completions, goal
//! clarification and opportunity summaries over an OpenAI-compatible API.

pub mod clarifier;
pub mod client;
mod embedder;
pub mod error;
mod retry;

pub use clarifier::{Clarifier, GoalClarifier, QaPair};
pub use client::{ChatMessage, CompletionOptions, LlmClient, LlmConfig, Role, EMBEDDING_BATCH_SIZE};
pub use embedder::Embedder;
pub use error::LlmError;
