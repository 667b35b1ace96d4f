//! Shared domain types and configuration for Genie.

mod app_config;
mod config;
pub mod feedback;
pub mod goal;
pub mod opportunity;
pub mod sources;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, MAX_WINDOW_HOURS};
pub use config::{load_app_config, load_app_config_from_env};
pub use feedback::Feedback;
pub use goal::{ClarifiedGoal, Goal, GoalFilters, GoalStatus};
pub use opportunity::{
    Compensation, Opportunity, OpportunityDigest, OpportunityType, RawOpportunity,
    ScoredOpportunity,
};
pub use sources::{load_source_routing, FeedFields, FeedSource, SourceRouting};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid opportunity type: {0}")]
    InvalidOpportunityType(String),

    #[error("invalid goal status: {0}")]
    InvalidGoalStatus(String),

    #[error("invalid clarified goal: {0}")]
    InvalidClarification(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read source routing file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse source routing file: {0}")]
    SourcesFileParse(#[from] serde_yaml::Error),

    #[error("source routing validation failed: {0}")]
    Validation(String),
}
