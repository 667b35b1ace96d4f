use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{CoreError, OpportunityType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Paused,
    Completed,
}

impl GoalStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Paused => "paused",
            GoalStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(GoalStatus::Active),
            "paused" => Ok(GoalStatus::Paused),
            "completed" => Ok(GoalStatus::Completed),
            other => Err(CoreError::InvalidGoalStatus(other.to_string())),
        }
    }
}

/// Search filters derived from goal clarification.
///
/// The recognized fields are typed; whatever else the language model
/// returned is kept verbatim in `extra` and never interpreted internally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalFilters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensation_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl GoalFilters {
    const RECOGNIZED: [&'static str; 6] = [
        "keywords",
        "location",
        "remote",
        "compensation_required",
        "timeframe",
        "experience_level",
    ];

    /// Build filters from an untyped JSON object.
    ///
    /// Recognized fields with an unexpected shape are dropped rather than
    /// failing the whole clarification; unknown keys go to `extra`. The
    /// model's `additional_filters` object, if present, is merged into `extra`.
    #[must_use]
    pub fn from_loose(object: &Map<String, Value>) -> Self {
        let keywords = match object.get("keywords") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        let text = |key: &str| -> Option<String> {
            object
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let mut extra = Map::new();
        for (key, value) in object {
            if key == "additional_filters" {
                if let Value::Object(nested) = value {
                    extra.extend(nested.clone());
                }
                continue;
            }
            if key == "goal_type" || Self::RECOGNIZED.contains(&key.as_str()) {
                continue;
            }
            extra.insert(key.clone(), value.clone());
        }

        Self {
            keywords,
            location: text("location"),
            remote: object.get("remote").and_then(Value::as_bool),
            compensation_required: object.get("compensation_required").and_then(Value::as_bool),
            timeframe: text("timeframe"),
            experience_level: text("experience_level"),
            extra,
        }
    }
}

/// A stored goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: String,
    pub goal_type: OpportunityType,
    pub filters: GoalFilters,
    /// Produced at clarification time; reused until the goal is refreshed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub status: GoalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The validated result of goal clarification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarifiedGoal {
    pub original_description: String,
    pub goal_type: OpportunityType,
    pub filters: GoalFilters,
}

impl ClarifiedGoal {
    /// Validate a language-model response into a typed goal.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidClarification`] if the value is not an
    /// object or has no `goal_type`, and [`CoreError::InvalidOpportunityType`]
    /// if `goal_type` is not one of the known kinds.
    pub fn from_llm_value(value: &Value, original_description: &str) -> Result<Self, CoreError> {
        let object = value.as_object().ok_or_else(|| {
            CoreError::InvalidClarification("expected a JSON object".to_string())
        })?;

        let goal_type = object
            .get("goal_type")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::InvalidClarification("missing goal_type".to_string()))?
            .parse::<OpportunityType>()?;

        Ok(Self {
            original_description: original_description.to_string(),
            goal_type,
            filters: GoalFilters::from_loose(object),
        })
    }

    /// Text embedded to produce the goal vector.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        let location = self.filters.location.as_deref().unwrap_or_default();
        format!(
            "{}\nType: {}\nKeywords: {}\nLocation: {}",
            self.original_description.trim(),
            self.goal_type,
            self.filters.keywords.join(", "),
            location
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn goal_status_parses_known_values() {
        assert_eq!("active".parse::<GoalStatus>().unwrap(), GoalStatus::Active);
        assert_eq!("Paused".parse::<GoalStatus>().unwrap(), GoalStatus::Paused);
        assert!("archived".parse::<GoalStatus>().is_err());
    }

    #[test]
    fn clarified_goal_types_recognized_fields() {
        let value = json!({
            "goal_type": "speaking",
            "keywords": ["rust", " async ", ""],
            "location": "Europe",
            "remote": true,
            "compensation_required": false,
            "timeframe": "next 3 months",
            "experience_level": "senior",
            "audience_size": 200,
            "additional_filters": {"travel_covered": true}
        });

        let goal = ClarifiedGoal::from_llm_value(&value, "Speak at Rust conferences").unwrap();
        assert_eq!(goal.goal_type, OpportunityType::Speaking);
        assert_eq!(goal.filters.keywords, vec!["rust", "async"]);
        assert_eq!(goal.filters.location.as_deref(), Some("Europe"));
        assert_eq!(goal.filters.remote, Some(true));
        assert_eq!(goal.filters.compensation_required, Some(false));
        assert_eq!(goal.filters.timeframe.as_deref(), Some("next 3 months"));
        assert_eq!(goal.filters.extra.get("audience_size"), Some(&json!(200)));
        assert_eq!(goal.filters.extra.get("travel_covered"), Some(&json!(true)));
        assert!(!goal.filters.extra.contains_key("goal_type"));
    }

    #[test]
    fn clarified_goal_rejects_unknown_type() {
        let value = json!({"goal_type": "internship"});
        let err = ClarifiedGoal::from_llm_value(&value, "x").unwrap_err();
        assert!(matches!(err, CoreError::InvalidOpportunityType(_)));
    }

    #[test]
    fn clarified_goal_requires_object_with_goal_type() {
        assert!(matches!(
            ClarifiedGoal::from_llm_value(&json!(["job"]), "x"),
            Err(CoreError::InvalidClarification(_))
        ));
        assert!(matches!(
            ClarifiedGoal::from_llm_value(&json!({"keywords": []}), "x"),
            Err(CoreError::InvalidClarification(_))
        ));
    }

    #[test]
    fn mistyped_recognized_fields_are_dropped() {
        let value = json!({"goal_type": "job", "remote": "yes", "keywords": "rust, go"});
        let goal = ClarifiedGoal::from_llm_value(&value, "x").unwrap();
        assert_eq!(goal.filters.remote, None);
        assert_eq!(goal.filters.keywords, vec!["rust", "go"]);
        assert!(goal.filters.extra.is_empty());
    }

    #[test]
    fn embedding_text_includes_type_keywords_and_location() {
        let goal = ClarifiedGoal {
            original_description: "  Find a remote Rust job ".to_string(),
            goal_type: OpportunityType::Job,
            filters: GoalFilters {
                keywords: vec!["rust".to_string(), "backend".to_string()],
                location: Some("remote".to_string()),
                ..GoalFilters::default()
            },
        };
        assert_eq!(
            goal.embedding_text(),
            "Find a remote Rust job\nType: job\nKeywords: rust, backend\nLocation: remote"
        );
    }

    #[test]
    fn filters_round_trip_through_json() {
        let filters = GoalFilters {
            keywords: vec!["grants".to_string()],
            extra: {
                let mut m = Map::new();
                m.insert("region".to_string(), json!("EU"));
                m
            },
            ..GoalFilters::default()
        };
        let value = serde_json::to_value(&filters).unwrap();
        let back: GoalFilters = serde_json::from_value(value).unwrap();
        assert_eq!(back, filters);
    }
}
