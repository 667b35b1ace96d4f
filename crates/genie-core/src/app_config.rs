use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Longest look-back accepted for new-opportunity checks (ten years).
pub const MAX_WINDOW_HOURS: i64 = 24 * 365 * 10;

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub sources_path: PathBuf,
    pub openai_api_key: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub llm_base_url: String,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub chat_model: String,
    pub summary_model: String,
    pub llm_timeout_secs: u64,
    pub llm_max_retries: u32,
    pub relevance_threshold: f64,
    pub rank_default_limit: usize,
    pub monitor_window_hours: i64,
    pub monitor_max_concurrency: usize,
    pub scraper_user_agent: String,
    pub scrape_cron: String,
    pub monitor_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("sources_path", &self.sources_path)
            .field("database_url", &"[redacted]")
            .field("openai_api_key", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("llm_base_url", &self.llm_base_url)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_dim", &self.embedding_dim)
            .field("chat_model", &self.chat_model)
            .field("summary_model", &self.summary_model)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("llm_max_retries", &self.llm_max_retries)
            .field("relevance_threshold", &self.relevance_threshold)
            .field("rank_default_limit", &self.rank_default_limit)
            .field("monitor_window_hours", &self.monitor_window_hours)
            .field("monitor_max_concurrency", &self.monitor_max_concurrency)
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("scrape_cron", &self.scrape_cron)
            .field("monitor_cron", &self.monitor_cron)
            .finish()
    }
}
