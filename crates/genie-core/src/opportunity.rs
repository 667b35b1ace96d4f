use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// The fixed set of opportunity kinds. Goals share the same enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityType {
    Speaking,
    Job,
    Grant,
    Event,
}

impl OpportunityType {
    pub const ALL: [OpportunityType; 4] = [
        OpportunityType::Speaking,
        OpportunityType::Job,
        OpportunityType::Grant,
        OpportunityType::Event,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OpportunityType::Speaking => "speaking",
            OpportunityType::Job => "job",
            OpportunityType::Grant => "grant",
            OpportunityType::Event => "event",
        }
    }
}

impl std::fmt::Display for OpportunityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpportunityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "speaking" => Ok(OpportunityType::Speaking),
            "job" => Ok(OpportunityType::Job),
            "grant" => Ok(OpportunityType::Grant),
            "event" => Ok(OpportunityType::Event),
            other => Err(CoreError::InvalidOpportunityType(other.to_string())),
        }
    }
}

/// Structured compensation attached to an opportunity.
///
/// Scrapers report compensation in wildly different shapes, so only the
/// common fields are typed; anything else is preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Compensation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Compensation {
    /// Decode compensation from whatever JSON a scraper or the store holds.
    ///
    /// `null` means no compensation. Objects whose typed fields have an
    /// unexpected shape, and bare scalars such as `"competitive"`, are kept
    /// whole in `extra` instead of being rejected.
    #[must_use]
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Object(object) => Some(
                serde_json::from_value::<Self>(serde_json::Value::Object(object.clone()))
                    .unwrap_or_else(|_| Self {
                        extra: object,
                        ..Self::default()
                    }),
            ),
            other => {
                let mut extra = serde_json::Map::new();
                extra.insert("text".to_string(), other);
                Some(Self {
                    extra,
                    ..Self::default()
                })
            }
        }
    }
}

/// A normalized, stored opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Dedup key: unique across the store.
    pub source_url: String,
    pub source_name: String,
    pub opportunity_type: OpportunityType,
    pub location: Option<String>,
    pub remote: bool,
    pub compensation: Option<Compensation>,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub scraped_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// An opportunity as produced by a scraper, before storage and embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOpportunity {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub source_url: String,
    pub source_name: String,
    pub opportunity_type: OpportunityType,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub remote: bool,
    #[serde(default)]
    pub compensation: Option<Compensation>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// The untouched scraper payload, kept for debugging and re-normalization.
    #[serde(default)]
    pub raw_data: serde_json::Value,
}

impl RawOpportunity {
    /// Maximum number of description characters fed into the embedding text.
    pub const EMBEDDING_DESCRIPTION_CHARS: usize = 500;

    /// Text used to embed this opportunity: the title followed by the first
    /// 500 characters of the description.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        let description: String = self
            .description
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(Self::EMBEDDING_DESCRIPTION_CHARS)
            .collect();
        format!("{} {}", self.title, description)
    }
}

/// An opportunity annotated with ranking scores. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredOpportunity {
    pub opportunity: Opportunity,
    /// Cosine similarity against the goal embedding, in `0.0..=1.0`.
    pub similarity_score: f64,
    /// Feedback-derived multiplier.
    pub feedback_weight: f64,
    /// `similarity_score * feedback_weight`.
    pub relevance_score: f64,
}

impl ScoredOpportunity {
    #[must_use]
    pub fn new(opportunity: Opportunity, similarity_score: f64, feedback_weight: f64) -> Self {
        Self {
            opportunity,
            similarity_score,
            feedback_weight,
            relevance_score: similarity_score * feedback_weight,
        }
    }
}

/// Compact view of a ranked opportunity handed to the summary generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityDigest {
    pub title: String,
    pub source: String,
    #[serde(rename = "type")]
    pub opportunity_type: OpportunityType,
    pub location: Option<String>,
    pub relevance: f64,
}

impl From<&ScoredOpportunity> for OpportunityDigest {
    fn from(scored: &ScoredOpportunity) -> Self {
        Self {
            title: scored.opportunity.title.clone(),
            source: scored.opportunity.source_name.clone(),
            opportunity_type: scored.opportunity.opportunity_type,
            location: scored.opportunity.location.clone(),
            relevance: (scored.relevance_score * 100.0).round() / 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(description: Option<&str>) -> RawOpportunity {
        RawOpportunity {
            title: "Rust Engineer".to_string(),
            description: description.map(str::to_string),
            source_url: "https://jobs.example.com/1".to_string(),
            source_name: "example".to_string(),
            opportunity_type: OpportunityType::Job,
            location: None,
            remote: true,
            compensation: None,
            tags: vec![],
            raw_data: serde_json::Value::Null,
        }
    }

    #[test]
    fn opportunity_type_round_trips_through_str() {
        for kind in OpportunityType::ALL {
            assert_eq!(kind.as_str().parse::<OpportunityType>().unwrap(), kind);
        }
    }

    #[test]
    fn opportunity_type_parse_is_case_insensitive() {
        assert_eq!(
            " Speaking ".parse::<OpportunityType>().unwrap(),
            OpportunityType::Speaking
        );
    }

    #[test]
    fn opportunity_type_rejects_unknown() {
        let err = "internship".parse::<OpportunityType>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidOpportunityType(ref s) if s == "internship"));
    }

    #[test]
    fn embedding_text_truncates_description() {
        let long = "x".repeat(800);
        let text = raw(Some(&long)).embedding_text();
        assert_eq!(text.len(), "Rust Engineer ".len() + 500);
    }

    #[test]
    fn embedding_text_without_description() {
        assert_eq!(raw(None).embedding_text(), "Rust Engineer ");
    }

    #[test]
    fn compensation_keeps_unknown_fields() {
        let value = serde_json::json!({"min": 100000.0, "currency": "USD", "equity": "0.1%"});
        let comp: Compensation = serde_json::from_value(value).unwrap();
        assert_eq!(comp.min, Some(100_000.0));
        assert_eq!(comp.currency.as_deref(), Some("USD"));
        assert_eq!(comp.extra.get("equity"), Some(&serde_json::json!("0.1%")));
    }

    #[test]
    fn compensation_from_value_is_lenient() {
        assert_eq!(Compensation::from_value(serde_json::Value::Null), None);

        let text = Compensation::from_value(serde_json::json!("competitive")).unwrap();
        assert_eq!(text.extra.get("text"), Some(&serde_json::json!("competitive")));

        let odd = Compensation::from_value(serde_json::json!({"min": "100k"})).unwrap();
        assert_eq!(odd.min, None);
        assert_eq!(odd.extra.get("min"), Some(&serde_json::json!("100k")));
    }

    #[test]
    fn digest_rounds_relevance_to_two_places() {
        let opp = Opportunity {
            id: Uuid::new_v4(),
            title: "Talk".to_string(),
            description: None,
            source_url: "https://cfp.example.com/talk".to_string(),
            source_name: "papercall".to_string(),
            opportunity_type: OpportunityType::Speaking,
            location: Some("Berlin".to_string()),
            remote: false,
            compensation: None,
            tags: vec![],
            embedding: None,
            scraped_at: Utc::now(),
            created_at: Utc::now(),
        };
        let scored = ScoredOpportunity::new(opp, 0.876_54, 1.0);
        let digest = OpportunityDigest::from(&scored);
        assert!((digest.relevance - 0.88).abs() < 1e-9);
        assert_eq!(digest.source, "papercall");
    }
}
