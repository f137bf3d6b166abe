//! Observation types for coding session capture.

mod input;
mod observation_type;

pub use input::*;
pub use observation_type::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A structured record of one tool action taken during a session.
///
/// Append-only: observations are never updated after creation. The
/// hierarchical fields (`title`, `subtitle`, `facts`, `narrative`,
/// `concepts`, file lists) supersede the legacy free-form `text` column,
/// which survives on old rows only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub id: i64,
    pub memory_session_id: String,
    pub project: String,
    pub observation_type: ObservationType,
    pub title: String,
    pub subtitle: Option<String>,
    pub text: Option<String>,
    pub narrative: Option<String>,
    pub facts: Vec<String>,
    pub concepts: Vec<String>,
    pub files_read: Vec<String>,
    pub files_modified: Vec<String>,
    pub prompt_number: Option<u32>,
    pub discovery_tokens: u32,
    /// External tool-invocation id this observation was extracted from.
    /// Several observations may share one id.
    pub tool_use_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_at_epoch: i64,
}

/// Deduplicated file paths touched across a session's observations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilesTouched {
    pub files_read: Vec<String>,
    pub files_modified: Vec<String>,
}
