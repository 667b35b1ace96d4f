use std::str::FromStr;

use crate::app_config::{AppConfig, Environment, MAX_WINDOW_HOURS};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let database_url = require("DATABASE_URL")?;
    let openai_api_key = require("OPENAI_API_KEY")?;

    let env = parse_environment(&or_default("GENIE_ENV", "development"));
    let log_level = or_default("GENIE_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default("GENIE_SOURCES_PATH", "./config/sources.yaml"));

    let db_max_connections: u32 = parse_var(&or_default, "GENIE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections: u32 = parse_var(&or_default, "GENIE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs: u64 =
        parse_var(&or_default, "GENIE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let llm_base_url = or_default("GENIE_LLM_BASE_URL", "https://api.openai.com/v1");
    let embedding_model = or_default("GENIE_EMBEDDING_MODEL", "text-embedding-3-small");
    let embedding_dim: usize = parse_var(&or_default, "GENIE_EMBEDDING_DIM", "1536")?;
    if embedding_dim == 0 {
        return Err(invalid("GENIE_EMBEDDING_DIM", "must be greater than zero"));
    }
    let chat_model = or_default("GENIE_CHAT_MODEL", "gpt-4");
    let summary_model = or_default("GENIE_SUMMARY_MODEL", "gpt-4o-mini");
    let llm_timeout_secs: u64 = parse_var(&or_default, "GENIE_LLM_TIMEOUT_SECS", "60")?;
    let llm_max_retries: u32 = parse_var(&or_default, "GENIE_LLM_MAX_RETRIES", "3")?;

    let relevance_threshold: f64 = parse_var(&or_default, "GENIE_RELEVANCE_THRESHOLD", "0.7")?;
    if !(0.0..=1.0).contains(&relevance_threshold) {
        return Err(invalid(
            "GENIE_RELEVANCE_THRESHOLD",
            "must be between 0.0 and 1.0",
        ));
    }
    let rank_default_limit: usize = parse_var(&or_default, "GENIE_RANK_DEFAULT_LIMIT", "50")?;
    let monitor_window_hours: i64 = parse_var(&or_default, "GENIE_MONITOR_WINDOW_HOURS", "24")?;
    if !(1..=MAX_WINDOW_HOURS).contains(&monitor_window_hours) {
        return Err(ConfigError::InvalidEnvVar {
            var: "GENIE_MONITOR_WINDOW_HOURS".to_string(),
            reason: format!("must be between 1 and {MAX_WINDOW_HOURS}"),
        });
    }
    let monitor_max_concurrency: usize =
        parse_var(&or_default, "GENIE_MONITOR_MAX_CONCURRENCY", "4")?;
    if monitor_max_concurrency == 0 {
        return Err(invalid(
            "GENIE_MONITOR_MAX_CONCURRENCY",
            "must be greater than zero",
        ));
    }

    let scraper_user_agent = or_default("GENIE_SCRAPER_USER_AGENT", "Genie-Bot/1.0");
    let scrape_cron = or_default("GENIE_SCRAPE_CRON", "0 0 3 * * *");
    let monitor_cron = or_default("GENIE_MONITOR_CRON", "0 0 * * * *");

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        sources_path,
        openai_api_key,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        llm_base_url,
        embedding_model,
        embedding_dim,
        chat_model,
        summary_model,
        llm_timeout_secs,
        llm_max_retries,
        relevance_threshold,
        rank_default_limit,
        monitor_window_hours,
        monitor_max_concurrency,
        scraper_user_agent,
        scrape_cron,
        monitor_cron,
    })
}

fn parse_var<T, D>(or_default: &D, var: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    D: Fn(&str, &str) -> String,
{
    let raw = or_default(var, default);
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

fn invalid(var: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
