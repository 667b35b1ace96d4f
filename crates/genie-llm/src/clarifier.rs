//! Goal clarification: turns a free-text goal into a typed [`ClarifiedGoal`].

use std::sync::Arc;

use async_trait::async_trait;
use genie_core::ClarifiedGoal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{ChatMessage, LlmClient};
use crate::error::LlmError;

const CLARIFY_SYSTEM_PROMPT: &str = "You are a goal clarification assistant. Your job is to \
understand user goals and extract structured information about what they're looking for.\n\n\
Extract:\n\
- goal_type: one of \"speaking\", \"job\", \"grant\", \"event\"\n\
- keywords: list of relevant keywords\n\
- location: geographic preference (or \"remote\" or \"any\")\n\
- compensation_required: boolean\n\
- additional_filters: any other relevant criteria\n\n\
Return your response as JSON.";

/// A clarifying question and the user's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

/// Something that can turn a goal description into a [`ClarifiedGoal`].
#[async_trait]
pub trait GoalClarifier: Send + Sync {
    async fn clarify_goal(&self, description: &str) -> Result<ClarifiedGoal, LlmError>;
}

/// Clarifier backed by the chat model.
#[derive(Clone)]
pub struct Clarifier {
    client: Arc<LlmClient>,
}

impl Clarifier {
    #[must_use]
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }

    /// Suggest two or three follow-up questions.
    ///
    /// Never fails: any model or parse error yields an empty list.
    pub async fn clarifying_questions(
        &self,
        description: &str,
        preliminary: &ClarifiedGoal,
    ) -> Vec<String> {
        let analysis = serde_json::to_string(preliminary).unwrap_or_default();
        let prompt = format!(
            "Based on this user goal: \"{description}\"\n\n\
             And this preliminary analysis:\n{analysis}\n\n\
             Generate 2-3 clarifying questions to better understand what the user is looking for.\n\
             Make questions specific and actionable. Return a JSON object with a \"questions\" \
             array of strings."
        );
        let messages = [
            ChatMessage::system("You are a helpful assistant that asks clarifying questions."),
            ChatMessage::user(prompt),
        ];

        match self.client.structured_completion(&messages).await {
            Ok(value) => questions_from_value(&value),
            Err(e) => {
                tracing::warn!(error = %e, "failed to generate clarifying questions");
                Vec::new()
            }
        }
    }

    /// Fold the user's answers into the goal.
    ///
    /// On any failure the initial goal is returned unchanged.
    pub async fn refine_goal(&self, initial: &ClarifiedGoal, qa_pairs: &[QaPair]) -> ClarifiedGoal {
        match self.try_refine_goal(initial, qa_pairs).await {
            Ok(refined) => refined,
            Err(e) => {
                tracing::warn!(error = %e, "failed to refine goal, keeping initial analysis");
                initial.clone()
            }
        }
    }

    async fn try_refine_goal(
        &self,
        initial: &ClarifiedGoal,
        qa_pairs: &[QaPair],
    ) -> Result<ClarifiedGoal, LlmError> {
        let analysis = serde_json::to_string(&flatten_goal(initial)).map_err(|e| {
            LlmError::Deserialize {
                context: "initial goal".to_string(),
                source: e,
            }
        })?;
        let qa_text = qa_pairs
            .iter()
            .map(|qa| format!("Q: {}\nA: {}", qa.question, qa.answer))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Initial goal analysis:\n{analysis}\n\n\
             Additional Q&A:\n{qa_text}\n\n\
             Update and refine the goal structure based on the new information.\n\
             Return the updated goal as JSON with the same structure."
        );
        let messages = [
            ChatMessage::system("You refine goal structures based on user answers."),
            ChatMessage::user(prompt),
        ];

        let value = self.client.structured_completion(&messages).await?;
        Ok(ClarifiedGoal::from_llm_value(
            &value,
            &initial.original_description,
        )?)
    }
}

#[async_trait]
impl GoalClarifier for Clarifier {
    /// Extract goal type and filters from a free-text description.
    ///
    /// # Errors
    ///
    /// Returns the model error, or [`LlmError::Core`] if the reply does not
    /// name a known goal type.
    async fn clarify_goal(&self, description: &str) -> Result<ClarifiedGoal, LlmError> {
        let prompt = format!(
            "User goal: \"{description}\"\n\n\
             Analyze this goal and return structured information in JSON format with these fields:\n\
             - goal_type (speaking/job/grant/event)\n\
             - keywords (array of strings)\n\
             - location (string)\n\
             - remote (boolean)\n\
             - compensation_required (boolean)\n\
             - timeframe (string, e.g., \"immediate\", \"next 3 months\", \"ongoing\")\n\
             - experience_level (string, if applicable)\n\
             - additional_filters (object with any other relevant info)"
        );
        let messages = [
            ChatMessage::system(CLARIFY_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ];

        let value = self.client.structured_completion(&messages).await?;
        let goal = ClarifiedGoal::from_llm_value(&value, description)?;
        tracing::info!(
            goal_type = %goal.goal_type,
            keywords = goal.filters.keywords.len(),
            "clarified goal"
        );
        Ok(goal)
    }
}

/// The goal in the same flat shape the model is asked to produce.
fn flatten_goal(goal: &ClarifiedGoal) -> Value {
    let mut object = match serde_json::to_value(&goal.filters) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    if let Some(extra) = object.remove("extra") {
        object.insert("additional_filters".to_string(), extra);
    }
    object.insert(
        "goal_type".to_string(),
        Value::String(goal.goal_type.as_str().to_string()),
    );
    Value::Object(object)
}

/// Accepts `{"questions": [...]}` or a bare array; non-string entries are dropped.
fn questions_from_value(value: &Value) -> Vec<String> {
    let list = value
        .get("questions")
        .and_then(Value::as_array)
        .or_else(|| value.as_array());

    list.map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use genie_core::{GoalFilters, OpportunityType};
    use serde_json::json;

    use super::*;

    #[test]
    fn questions_from_object_or_array() {
        assert_eq!(
            questions_from_value(&json!({"questions": ["Where?", " ", 3, "When?"]})),
            vec!["Where?", "When?"]
        );
        assert_eq!(questions_from_value(&json!(["Budget?"])), vec!["Budget?"]);
        assert!(questions_from_value(&json!({"other": 1})).is_empty());
    }

    #[test]
    fn flatten_goal_round_trips_through_validation() {
        let goal = ClarifiedGoal {
            original_description: "Find a Rust job".to_string(),
            goal_type: OpportunityType::Job,
            filters: GoalFilters {
                keywords: vec!["rust".to_string()],
                remote: Some(true),
                extra: json!({"visa": "sponsored"})
                    .as_object()
                    .cloned()
                    .unwrap(),
                ..GoalFilters::default()
            },
        };

        let flat = flatten_goal(&goal);
        assert_eq!(flat["goal_type"], "job");
        assert_eq!(flat["additional_filters"]["visa"], "sponsored");

        let back = ClarifiedGoal::from_llm_value(&flat, "Find a Rust job").unwrap();
        assert_eq!(back, goal);
    }
}
