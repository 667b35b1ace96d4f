//! Summary generation seam; the production generator is the summary model.

use async_trait::async_trait;
use genie_core::OpportunityDigest;
use genie_llm::{LlmClient, LlmError};

/// Produces a short natural-language overview of ranked opportunities.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn summarize(&self, items: &[OpportunityDigest]) -> Result<String, LlmError>;
}

#[async_trait]
impl SummaryGenerator for LlmClient {
    async fn summarize(&self, items: &[OpportunityDigest]) -> Result<String, LlmError> {
        self.summarize_opportunities(items).await
    }
}
