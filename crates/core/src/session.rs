//! Session lifecycle types and the records that hang off a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A recorded assistant session.
///
/// `content_session_id` is the stable identifier assigned by the recording
/// hook when the session starts. `memory_session_id` is assigned later by
/// the summarization worker and stays `None` until then; observations and
/// summaries reference it once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub content_session_id: String,
    pub memory_session_id: Option<String>,
    pub project: String,
    pub user_prompt: Option<String>,
    pub started_at: DateTime<Utc>,
    pub started_at_epoch: i64,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_at_epoch: Option<i64>,
    pub status: SessionStatus,
    pub worker_port: Option<u16>,
    pub prompt_counter: u32,
    /// Token counts accumulated by endless-mode transcript compression.
    pub endless_original_tokens: i64,
    pub endless_compressed_tokens: i64,
    pub endless_tokens_saved: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Failed,
}

impl SessionStatus {
    /// Returns the string stored in the `status` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether this status is terminal (only reactivation leaves it).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(*self, Self::Completed | Self::Failed)
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::InvalidSessionStatus(other.to_owned())),
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The subset of session columns the recording hook needs to route work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSession {
    pub id: i64,
    pub memory_session_id: Option<String>,
    pub project: String,
    pub worker_port: Option<u16>,
}

/// One row of the dashboard's recent-sessions list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOverview {
    pub memory_session_id: Option<String>,
    pub status: SessionStatus,
    pub started_at_epoch: i64,
    pub user_prompt: Option<String>,
    pub has_summary: bool,
}

/// End-of-segment summary of a session. A session accumulates one summary
/// per summarization pass, so `memory_session_id` is not unique here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub id: i64,
    pub memory_session_id: String,
    pub project: String,
    pub request: Option<String>,
    pub investigated: Option<String>,
    pub learned: Option<String>,
    pub completed: Option<String>,
    pub next_steps: Option<String>,
    pub files_read: Vec<String>,
    pub files_edited: Vec<String>,
    pub notes: Option<String>,
    pub prompt_number: Option<u32>,
    pub discovery_tokens: u32,
    pub created_at: DateTime<Utc>,
    pub created_at_epoch: i64,
}

/// Fields supplied by the summarization worker when storing a summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryInput {
    pub request: Option<String>,
    pub investigated: Option<String>,
    pub learned: Option<String>,
    pub completed: Option<String>,
    pub next_steps: Option<String>,
    pub files_read: Vec<String>,
    pub files_edited: Vec<String>,
    pub notes: Option<String>,
}

/// A raw user prompt as captured by the recording hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPrompt {
    pub id: i64,
    pub content_session_id: String,
    pub prompt_number: u32,
    pub prompt_text: String,
    pub created_at: DateTime<Utc>,
    pub created_at_epoch: i64,
}

/// A prompt joined with its session's project for filterable reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptWithProject {
    pub id: i64,
    pub content_session_id: String,
    pub project: String,
    pub prompt_number: u32,
    pub prompt_text: String,
    pub created_at_epoch: i64,
}

/// Handle returned by append operations: the new row id and the epoch the
/// row was stamped with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: i64,
    pub created_at_epoch: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    #[test]
    fn status_round_trips_through_str() {
        for status in [SessionStatus::Active, SessionStatus::Completed, SessionStatus::Failed] {
            assert_eq!(SessionStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn status_rejects_unknown_value() {
        assert!(SessionStatus::from_str("paused").is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!SessionStatus::Active.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
    }
}
