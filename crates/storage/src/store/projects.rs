//! Cross-cutting project and overview queries.

use mnemo_core::{SessionOverview, SessionStatus};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::{Storage, get_conn, log_row_error};
use crate::error::Result;

/// Row counts for the dashboard's storage panel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StorageStats {
    pub session_count: u64,
    pub observation_count: u64,
    pub summary_count: u64,
    pub prompt_count: u64,
    pub project_count: u64,
}

impl Storage {
    /// Every project that has a session or an observation, sorted.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn list_projects(&self) -> Result<Vec<String>> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT project FROM (
                 SELECT project FROM sessions
                 UNION
                 SELECT project FROM observations
             )
             WHERE project IS NOT NULL AND project != ''
             ORDER BY project",
        )?;
        let results = stmt.query_map([], |row| row.get(0))?.filter_map(log_row_error).collect();
        Ok(results)
    }

    /// The newest `limit` summarizable sessions of a project with their
    /// summarization state, returned oldest first for display.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn get_recent_sessions_with_status(
        &self,
        project: &str,
        limit: usize,
    ) -> Result<Vec<SessionOverview>> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT * FROM (
                 SELECT
                     s.memory_session_id,
                     s.status,
                     s.started_at_epoch,
                     s.user_prompt,
                     EXISTS(
                         SELECT 1 FROM session_summaries sm
                         WHERE sm.memory_session_id = s.memory_session_id
                     ) AS has_summary
                 FROM sessions s
                 WHERE s.project = ?1 AND s.memory_session_id IS NOT NULL
                 ORDER BY s.started_at_epoch DESC
                 LIMIT ?2
             )
             ORDER BY started_at_epoch ASC",
        )?;
        let results = stmt
            .query_map(params![project, limit], |row| {
                let status: SessionStatus = row
                    .get::<_, String>(1)?
                    .parse()
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                Ok(SessionOverview {
                    memory_session_id: row.get(0)?,
                    status,
                    started_at_epoch: row.get(2)?,
                    user_prompt: row.get(3)?,
                    has_summary: row.get(4)?,
                })
            })?
            .filter_map(log_row_error)
            .collect();
        Ok(results)
    }

    /// # Errors
    /// Returns error if a count query fails.
    pub fn get_stats(&self) -> Result<StorageStats> {
        let conn = get_conn(&self.pool)?;
        let count = |sql: &str| -> Result<u64> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(u64::try_from(n).unwrap_or(0))
        };
        Ok(StorageStats {
            session_count: count("SELECT COUNT(*) FROM sessions")?,
            observation_count: count("SELECT COUNT(*) FROM observations")?,
            summary_count: count("SELECT COUNT(*) FROM session_summaries")?,
            prompt_count: count("SELECT COUNT(*) FROM user_prompts")?,
            project_count: count(
                "SELECT COUNT(*) FROM (
                     SELECT DISTINCT project FROM (
                         SELECT project FROM sessions
                         UNION
                         SELECT project FROM observations
                     )
                     WHERE project IS NOT NULL AND project != ''
                 )",
            )?,
        })
    }
}
