//! Projections returned by the timeline read path.

use serde::{Deserialize, Serialize};

use crate::Observation;

/// A contiguous, project-scoped slice of history around an anchor point.
///
/// All three lists are sorted ascending by `created_at_epoch`. Empty lists
/// mean there was no data to window around, not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelineWindow {
    pub observations: Vec<Observation>,
    pub summaries: Vec<TimelineSummary>,
    pub prompts: Vec<TimelinePrompt>,
}

/// The summary fields the dashboard renders on a timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineSummary {
    pub id: i64,
    pub memory_session_id: String,
    pub request: Option<String>,
    pub learned: Option<String>,
    pub completed: Option<String>,
    pub next_steps: Option<String>,
    pub prompt_number: Option<u32>,
    pub created_at_epoch: i64,
}

/// The prompt fields the dashboard renders on a timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinePrompt {
    pub id: i64,
    pub content_session_id: String,
    pub prompt_number: u32,
    pub prompt_text: String,
    pub created_at_epoch: i64,
}
