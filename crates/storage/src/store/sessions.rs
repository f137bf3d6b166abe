//! Session lifecycle operations.

use mnemo_core::{ActiveSession, Session, SessionStatus};
use rusqlite::{Connection, OptionalExtension as _, params};

use super::{Storage, get_conn, now_stamp, parse_datetime};
use crate::error::Result;

const SESSION_COLUMNS: &str = "id, content_session_id, memory_session_id, project, user_prompt, \
     started_at, started_at_epoch, completed_at, completed_at_epoch, status, worker_port, \
     COALESCE(prompt_counter, 0), COALESCE(endless_original_tokens, 0), \
     COALESCE(endless_compressed_tokens, 0), COALESCE(endless_tokens_saved, 0)";

impl Storage {
    /// Returns the row id for `content_session_id`, inserting a fresh
    /// active session when none exists.
    ///
    /// Insert-or-ignore on the unique column followed by a separate
    /// lookup. Safe for read-after-write under the single-writer model,
    /// but callers must not assume the row was freshly created.
    ///
    /// # Errors
    /// Returns error if the insert or lookup fails.
    pub fn create_or_get_session(
        &self,
        content_session_id: &str,
        project: &str,
        user_prompt: &str,
    ) -> Result<i64> {
        let conn = get_conn(&self.pool)?;
        let (now, now_epoch) = now_stamp();
        conn.execute(
            "INSERT OR IGNORE INTO sessions
               (content_session_id, project, user_prompt, started_at, started_at_epoch, status)
             VALUES (?1, ?2, ?3, ?4, ?5, 'active')",
            params![content_session_id, project, user_prompt, now, now_epoch],
        )?;
        let id = conn.query_row(
            "SELECT id FROM sessions WHERE content_session_id = ?1",
            params![content_session_id],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Brings a completed or failed session back to active when it resumes
    /// under the same external id. Clears the worker affinity and replaces
    /// the stored prompt.
    ///
    /// # Errors
    /// Returns error if the update fails.
    pub fn reactivate_session(&self, id: i64, user_prompt: &str) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        conn.execute(
            "UPDATE sessions SET status = 'active', user_prompt = ?1, worker_port = NULL
             WHERE id = ?2",
            params![user_prompt, id],
        )?;
        Ok(())
    }

    /// Records the worker-assigned memory session id, but only while it is
    /// still unset; observations and summaries already reference an
    /// assigned id. Returns whether the update happened.
    ///
    /// # Errors
    /// Returns error if the update fails.
    pub fn assign_memory_session_id(&self, id: i64, memory_session_id: &str) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        let changed = conn.execute(
            "UPDATE sessions SET memory_session_id = ?1
             WHERE id = ?2 AND memory_session_id IS NULL",
            params![memory_session_id, id],
        )?;
        if changed == 0 {
            tracing::debug!(id, "memory_session_id already set, skipping update");
        }
        Ok(changed > 0)
    }

    /// Bumps the per-session prompt counter and returns the new value.
    ///
    /// # Errors
    /// Returns error if the update or readback fails.
    pub fn increment_prompt_counter(&self, id: i64) -> Result<u32> {
        let conn = get_conn(&self.pool)?;
        conn.execute(
            "UPDATE sessions SET prompt_counter = COALESCE(prompt_counter, 0) + 1 WHERE id = ?1",
            params![id],
        )?;
        let counter = conn
            .query_row(
                "SELECT COALESCE(prompt_counter, 0) FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(self.expect_with_diagnostic(
            counter,
            "session.prompt_counter",
            &format!("incremented counter of missing session {id}"),
        ))
    }

    /// # Errors
    /// Returns error if the query fails.
    pub fn get_prompt_counter(&self, id: i64) -> Result<u32> {
        let conn = get_conn(&self.pool)?;
        let counter = conn
            .query_row(
                "SELECT COALESCE(prompt_counter, 0) FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(self.expect_with_diagnostic(
            counter,
            "session.prompt_counter",
            &format!("read counter of missing session {id}"),
        ))
    }

    /// # Errors
    /// Returns error if the update fails.
    pub fn set_worker_port(&self, id: i64, port: u16) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        conn.execute("UPDATE sessions SET worker_port = ?1 WHERE id = ?2", params![port, id])?;
        Ok(())
    }

    /// # Errors
    /// Returns error if the query fails.
    pub fn get_worker_port(&self, id: i64) -> Result<Option<u16>> {
        let conn = get_conn(&self.pool)?;
        let port = conn
            .query_row("SELECT worker_port FROM sessions WHERE id = ?1", params![id], |row| {
                row.get::<_, Option<u16>>(0)
            })
            .optional()?;
        Ok(self.expect_with_diagnostic(
            port,
            "session.worker_port",
            &format!("read worker port of missing session {id}"),
        ))
    }

    /// # Errors
    /// Returns error if the update fails.
    pub fn mark_session_completed(&self, id: i64) -> Result<()> {
        self.terminate_session(id, SessionStatus::Completed)
    }

    /// # Errors
    /// Returns error if the update fails.
    pub fn mark_session_failed(&self, id: i64) -> Result<()> {
        self.terminate_session(id, SessionStatus::Failed)
    }

    fn terminate_session(&self, id: i64, status: SessionStatus) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        let (now, now_epoch) = now_stamp();
        conn.execute(
            "UPDATE sessions SET status = ?1, completed_at = ?2, completed_at_epoch = ?3
             WHERE id = ?4",
            params![status.as_str(), now, now_epoch, id],
        )?;
        Ok(())
    }

    /// Active-session lookup for the recording hook.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn find_active_session(&self, content_session_id: &str) -> Result<Option<ActiveSession>> {
        let conn = get_conn(&self.pool)?;
        let session = conn
            .query_row(
                "SELECT id, memory_session_id, project, worker_port
                 FROM sessions
                 WHERE content_session_id = ?1 AND status = 'active'
                 LIMIT 1",
                params![content_session_id],
                |row| {
                    Ok(ActiveSession {
                        id: row.get(0)?,
                        memory_session_id: row.get(1)?,
                        project: row.get(2)?,
                        worker_port: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(session)
    }

    /// Lookup regardless of status.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn find_any_session(&self, content_session_id: &str) -> Result<Option<i64>> {
        let conn = get_conn(&self.pool)?;
        let id = conn
            .query_row(
                "SELECT id FROM sessions WHERE content_session_id = ?1 LIMIT 1",
                params![content_session_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// # Errors
    /// Returns error if the query fails or the row cannot be decoded.
    pub fn get_session(&self, id: i64) -> Result<Option<Session>> {
        let conn = get_conn(&self.pool)?;
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
        let session = conn
            .query_row(&sql, params![id], Self::row_to_session)
            .optional()?;
        Ok(session)
    }

    /// Deletes a session and, through FK cascades, all of its
    /// observations, summaries and prompts. Returns whether a row existed.
    ///
    /// # Errors
    /// Returns error if the delete fails.
    pub fn delete_session(&self, id: i64) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        let affected = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    /// Accumulates endless-mode compression results onto the session.
    ///
    /// # Errors
    /// Returns error if the update fails.
    pub fn record_endless_savings(
        &self,
        id: i64,
        original_tokens: i64,
        compressed_tokens: i64,
    ) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        conn.execute(
            "UPDATE sessions SET
               endless_original_tokens = COALESCE(endless_original_tokens, 0) + ?1,
               endless_compressed_tokens = COALESCE(endless_compressed_tokens, 0) + ?2,
               endless_tokens_saved = COALESCE(endless_tokens_saved, 0) + (?1 - ?2)
             WHERE id = ?3",
            params![original_tokens, compressed_tokens, id],
        )?;
        Ok(())
    }

    /// Marks every still-active session failed. Called on worker startup
    /// to recover from crashes that left sessions open.
    ///
    /// # Errors
    /// Returns error if the update fails.
    pub fn cleanup_orphaned_sessions(&self) -> Result<usize> {
        let conn = get_conn(&self.pool)?;
        let (now, now_epoch) = now_stamp();
        let affected = conn.execute(
            "UPDATE sessions SET status = 'failed', completed_at = ?1, completed_at_epoch = ?2
             WHERE status = 'active'",
            params![now, now_epoch],
        )?;
        if affected > 0 {
            tracing::info!(count = affected, "cleaned up orphaned active sessions");
        }
        Ok(affected)
    }

    /// Inserts a minimal active session when a write arrives before its
    /// session row exists. The placeholder reuses the memory session id as
    /// its content id; both unique constraints make the insert a no-op
    /// when any matching row already exists.
    pub(crate) fn ensure_session_for_memory_id(
        &self,
        conn: &Connection,
        memory_session_id: &str,
        project: &str,
    ) -> Result<()> {
        let (now, now_epoch) = now_stamp();
        conn.execute(
            "INSERT OR IGNORE INTO sessions
               (content_session_id, memory_session_id, project, started_at, started_at_epoch, status)
             VALUES (?1, ?1, ?2, ?3, ?4, 'active')",
            params![memory_session_id, project, now, now_epoch],
        )?;
        Ok(())
    }

    fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
        let started_at = parse_datetime(&row.get::<_, String>(5)?)?;
        let completed_at = row
            .get::<_, Option<String>>(7)?
            .map(|s| parse_datetime(&s))
            .transpose()?;
        let status: SessionStatus = row
            .get::<_, String>(9)?
            .parse()
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        Ok(Session {
            id: row.get(0)?,
            content_session_id: row.get(1)?,
            memory_session_id: row.get(2)?,
            project: row.get(3)?,
            user_prompt: row.get(4)?,
            started_at,
            started_at_epoch: row.get(6)?,
            completed_at,
            completed_at_epoch: row.get(8)?,
            status,
            worker_port: row.get(10)?,
            prompt_counter: row.get(11)?,
            endless_original_tokens: row.get(12)?,
            endless_compressed_tokens: row.get(13)?,
            endless_tokens_saved: row.get(14)?,
        })
    }
}
