//! Routing table from goal type to the scraper sources searched for it, and
//! the generic JSON feeds that can be registered as sources.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, OpportunityType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRouting {
    #[serde(default)]
    pub routes: HashMap<OpportunityType, Vec<String>>,
    #[serde(default)]
    pub feeds: Vec<FeedSource>,
}

/// A JSON endpoint listing opportunities, scraped without site-specific code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    /// Source name; routes refer to feeds by this name.
    pub name: String,
    pub url: String,
    pub opportunity_type: OpportunityType,
    /// Dot-separated path to the array of listings; the document root when absent.
    #[serde(default)]
    pub items_path: Option<String>,
    #[serde(default)]
    pub fields: FeedFields,
}

/// Which listing keys hold each opportunity field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedFields {
    pub title: String,
    pub url: String,
    pub description: String,
    pub location: String,
    pub remote: String,
    pub compensation: String,
    pub tags: String,
}

impl Default for FeedFields {
    fn default() -> Self {
        Self {
            title: "title".to_string(),
            url: "url".to_string(),
            description: "description".to_string(),
            location: "location".to_string(),
            remote: "remote".to_string(),
            compensation: "compensation".to_string(),
            tags: "tags".to_string(),
        }
    }
}

impl Default for SourceRouting {
    fn default() -> Self {
        let route = |names: &[&str]| names.iter().map(|n| (*n).to_string()).collect();
        let routes = HashMap::from([
            (
                OpportunityType::Speaking,
                route(&["papercall", "sessionize", "eventbrite"]),
            ),
            (
                OpportunityType::Job,
                route(&[
                    "remoteok",
                    "weworkremotely",
                    "indeed",
                    "ycombinator",
                    "angellist",
                ]),
            ),
            (OpportunityType::Event, route(&["eventbrite", "papercall"])),
            (OpportunityType::Grant, Vec::new()),
        ]);
        Self {
            routes,
            feeds: Vec::new(),
        }
    }
}

impl SourceRouting {
    /// Source names routed for `goal_type`, in configured order.
    #[must_use]
    pub fn sources_for(&self, goal_type: OpportunityType) -> &[String] {
        self.routes
            .get(&goal_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Load and validate the source routing table from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_source_routing(path: &Path) -> Result<SourceRouting, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let routing: SourceRouting = serde_yaml::from_str(&content)?;
    validate_routing(&routing)?;
    Ok(routing)
}

fn validate_routing(routing: &SourceRouting) -> Result<(), ConfigError> {
    for (goal_type, sources) in &routing.routes {
        let mut seen = HashSet::new();
        for source in sources {
            if source.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "route '{goal_type}' contains an empty source name"
                )));
            }
            if !seen.insert(source.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "route '{goal_type}' lists source '{source}' more than once"
                )));
            }
        }
    }

    let mut feed_names = HashSet::new();
    for feed in &routing.feeds {
        if feed.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "feed with an empty name".to_string(),
            ));
        }
        if !feed_names.insert(feed.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "feed '{}' is defined more than once",
                feed.name
            )));
        }
        if !(feed.url.starts_with("http://") || feed.url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "feed '{}' has a non-HTTP url '{}'",
                feed.name, feed.url
            )));
        }
    }
    Ok(())
}
