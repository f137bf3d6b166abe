//! User prompt append and lookup operations.
//!
//! The FTS5 mirror is maintained entirely by the v10 triggers; nothing
//! here touches it directly.

use mnemo_core::{PromptWithProject, StoredRecord};
use rusqlite::params;

use super::{Storage, coerce_to_sql, get_conn, log_row_error, now_stamp};
use crate::error::Result;

impl Storage {
    /// Appends a raw user prompt, creating the session row first when the
    /// prompt arrives before session creation. `project` is only used for
    /// that self-healing insert; the prompt row itself recovers its
    /// project by joining sessions.
    ///
    /// # Errors
    /// Returns error if the insert fails.
    pub fn store_prompt(
        &self,
        content_session_id: &str,
        project: &str,
        prompt_number: u32,
        prompt_text: &str,
    ) -> Result<StoredRecord> {
        let conn = get_conn(&self.pool)?;
        let (now, now_epoch) = now_stamp();
        conn.execute(
            "INSERT OR IGNORE INTO sessions
               (content_session_id, project, started_at, started_at_epoch, status)
             VALUES (?1, ?2, ?3, ?4, 'active')",
            params![content_session_id, project, now, now_epoch],
        )?;
        conn.execute(
            "INSERT INTO user_prompts
               (content_session_id, prompt_number, prompt_text, created_at, created_at_epoch)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![content_session_id, prompt_number, prompt_text, now, now_epoch],
        )?;
        Ok(StoredRecord { id: conn.last_insert_rowid(), created_at_epoch: now_epoch })
    }

    /// Batch lookup joined against sessions for the project column.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn get_prompts_by_ids(&self, ids: &[i64]) -> Result<Vec<PromptWithProject>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = get_conn(&self.pool)?;
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT p.id, p.content_session_id, s.project, p.prompt_number, p.prompt_text,
                    p.created_at_epoch
             FROM user_prompts p
             JOIN sessions s ON s.content_session_id = p.content_session_id
             WHERE p.id IN ({placeholders})
             ORDER BY p.created_at_epoch ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let sql_params: Vec<&dyn rusqlite::ToSql> = ids.iter().map(coerce_to_sql).collect();
        let results = stmt
            .query_map(sql_params.as_slice(), |row| {
                Ok(PromptWithProject {
                    id: row.get(0)?,
                    content_session_id: row.get(1)?,
                    project: row.get(2)?,
                    prompt_number: row.get(3)?,
                    prompt_text: row.get(4)?,
                    created_at_epoch: row.get(5)?,
                })
            })?
            .filter_map(log_row_error)
            .collect();
        Ok(results)
    }
}
