//! Summary append and lookup operations.

use mnemo_core::{SortOrder, StoredRecord, Summary, SummaryInput};
use rusqlite::{OptionalExtension as _, params};

use super::{Storage, coerce_to_sql, get_conn, log_row_error, now_stamp, parse_datetime, parse_json_list};
use crate::error::Result;

const SUMMARY_COLUMNS: &str = "id, memory_session_id, project, request, investigated, learned, \
     completed, next_steps, files_read, files_edited, notes, prompt_number, \
     COALESCE(discovery_tokens, 0), created_at, created_at_epoch";

impl Storage {
    /// Appends a summary. A session accumulates one summary per
    /// summarization pass, so there is no uniqueness here. Auto-creates
    /// the session row when the write arrives first.
    ///
    /// # Errors
    /// Returns error if the insert fails or a JSON field cannot encode.
    pub fn store_summary(
        &self,
        memory_session_id: &str,
        project: &str,
        input: &SummaryInput,
        prompt_number: Option<u32>,
        discovery_tokens: u32,
    ) -> Result<StoredRecord> {
        let conn = get_conn(&self.pool)?;
        self.ensure_session_for_memory_id(&conn, memory_session_id, project)?;

        let (now, now_epoch) = now_stamp();
        conn.execute(
            "INSERT INTO session_summaries
               (memory_session_id, project, request, investigated, learned, completed,
                next_steps, files_read, files_edited, notes, prompt_number, discovery_tokens,
                created_at, created_at_epoch)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                memory_session_id,
                project,
                input.request,
                input.investigated,
                input.learned,
                input.completed,
                input.next_steps,
                serde_json::to_string(&input.files_read)?,
                serde_json::to_string(&input.files_edited)?,
                input.notes,
                prompt_number,
                discovery_tokens,
                now,
                now_epoch,
            ],
        )?;
        Ok(StoredRecord { id: conn.last_insert_rowid(), created_at_epoch: now_epoch })
    }

    /// # Errors
    /// Returns error if the query fails.
    pub fn get_summary(&self, id: i64) -> Result<Option<Summary>> {
        let conn = get_conn(&self.pool)?;
        let sql = format!("SELECT {SUMMARY_COLUMNS} FROM session_summaries WHERE id = ?1");
        let summary = conn.query_row(&sql, params![id], Self::row_to_summary).optional()?;
        Ok(summary)
    }

    /// # Errors
    /// Returns error if the query fails.
    pub fn get_summaries_by_ids(
        &self,
        ids: &[i64],
        order: SortOrder,
        limit: usize,
    ) -> Result<Vec<Summary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = get_conn(&self.pool)?;
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM session_summaries WHERE id IN ({placeholders})
             ORDER BY created_at_epoch {} LIMIT ?",
            order.as_sql()
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut sql_params: Vec<&dyn rusqlite::ToSql> = ids.iter().map(coerce_to_sql).collect();
        sql_params.push(&limit);
        let results = stmt
            .query_map(sql_params.as_slice(), Self::row_to_summary)?
            .filter_map(log_row_error)
            .collect();
        Ok(results)
    }

    /// The newest summary of one session, if any.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn get_latest_summary_for_session(
        &self,
        memory_session_id: &str,
    ) -> Result<Option<Summary>> {
        let conn = get_conn(&self.pool)?;
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM session_summaries WHERE memory_session_id = ?1
             ORDER BY created_at_epoch DESC LIMIT 1"
        );
        let summary = conn
            .query_row(&sql, params![memory_session_id], Self::row_to_summary)
            .optional()?;
        Ok(summary)
    }

    /// Newest summaries of one project.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn get_recent_summaries(&self, project: &str, limit: usize) -> Result<Vec<Summary>> {
        let conn = get_conn(&self.pool)?;
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM session_summaries WHERE project = ?1
             ORDER BY created_at_epoch DESC LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let results = stmt
            .query_map(params![project, limit], Self::row_to_summary)?
            .filter_map(log_row_error)
            .collect();
        Ok(results)
    }

    /// Newest summaries across every project.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn get_all_recent_summaries(&self, limit: usize) -> Result<Vec<Summary>> {
        let conn = get_conn(&self.pool)?;
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM session_summaries
             ORDER BY created_at_epoch DESC LIMIT ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let results = stmt
            .query_map(params![limit], Self::row_to_summary)?
            .filter_map(log_row_error)
            .collect();
        Ok(results)
    }

    pub(crate) fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<Summary> {
        Ok(Summary {
            id: row.get(0)?,
            memory_session_id: row.get(1)?,
            project: row.get(2)?,
            request: row.get(3)?,
            investigated: row.get(4)?,
            learned: row.get(5)?,
            completed: row.get(6)?,
            next_steps: row.get(7)?,
            files_read: parse_json_list(row.get(8)?)?,
            files_edited: parse_json_list(row.get(9)?)?,
            notes: row.get(10)?,
            prompt_number: row.get(11)?,
            discovery_tokens: row.get(12)?,
            created_at: parse_datetime(&row.get::<_, String>(13)?)?,
            created_at_epoch: row.get(14)?,
        })
    }
}
