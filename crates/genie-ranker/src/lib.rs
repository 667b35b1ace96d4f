//! Relevance ranking for Genie.
//!
//! Orders a goal's candidate opportunities by embedding similarity weighted
//! by the user's feedback, summarizes the result, and detects freshly
//! ingested matches for active goals. Storage and the summary model are
//! reached through the [`OpportunityStore`] and [`SummaryGenerator`] traits.

pub mod error;
pub mod feedback;
pub mod memory;
pub mod monitor;
pub mod ranker;
pub mod similarity;
pub mod store;
pub mod summary;

pub use error::RankerError;
pub use feedback::{feedback_weight, feedback_weights, FeedbackSignal, DEFAULT_WEIGHT};
pub use memory::{cosine_distance, MemoryStore};
pub use monitor::{decode_goals, GoalFailure, GoalNotification, Monitor, MonitorReport};
pub use ranker::{Ranker, RankerConfig, EMPTY_SUMMARY};
pub use similarity::{search_by_text, search_similar};
pub use store::{OpportunityStore, PgStore};
pub use summary::SummaryGenerator;
