//! Observation append and lookup operations.

use std::collections::{BTreeSet, HashMap};

use mnemo_core::{FilesTouched, Observation, ObservationInput, ObservationType, SortOrder, StoredRecord};
use rusqlite::{OptionalExtension as _, params};

use super::{Storage, coerce_to_sql, get_conn, log_row_error, now_stamp, parse_datetime, parse_json_list};
use crate::error::Result;

const OBSERVATION_COLUMNS: &str = "id, memory_session_id, project, type, title, subtitle, text, \
     narrative, facts, concepts, files_read, files_modified, prompt_number, \
     COALESCE(discovery_tokens, 0), tool_use_id, created_at, created_at_epoch";

impl Storage {
    /// Appends an observation, creating a minimal active session first if
    /// none exists yet for `memory_session_id` (writes may arrive before
    /// session creation).
    ///
    /// # Errors
    /// Returns error if the insert fails or a JSON field cannot encode.
    pub fn store_observation(
        &self,
        memory_session_id: &str,
        project: &str,
        input: &ObservationInput,
        prompt_number: Option<u32>,
        discovery_tokens: u32,
    ) -> Result<StoredRecord> {
        let conn = get_conn(&self.pool)?;
        self.ensure_session_for_memory_id(&conn, memory_session_id, project)?;

        let (now, now_epoch) = now_stamp();
        conn.execute(
            "INSERT INTO observations
               (memory_session_id, project, text, type, title, subtitle, facts, narrative,
                concepts, files_read, files_modified, prompt_number, discovery_tokens,
                tool_use_id, created_at, created_at_epoch)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                memory_session_id,
                project,
                input.text,
                input.observation_type.as_str(),
                input.title,
                input.subtitle,
                serde_json::to_string(&input.facts)?,
                input.narrative,
                serde_json::to_string(&input.concepts)?,
                serde_json::to_string(&input.files_read)?,
                serde_json::to_string(&input.files_modified)?,
                prompt_number,
                discovery_tokens,
                input.tool_use_id,
                now,
                now_epoch,
            ],
        )?;
        Ok(StoredRecord { id: conn.last_insert_rowid(), created_at_epoch: now_epoch })
    }

    /// # Errors
    /// Returns error if the query fails.
    pub fn get_observation(&self, id: i64) -> Result<Option<Observation>> {
        let conn = get_conn(&self.pool)?;
        let sql = format!("SELECT {OBSERVATION_COLUMNS} FROM observations WHERE id = ?1");
        let observation = conn
            .query_row(&sql, params![id], |row| self.row_to_observation(row))
            .optional()?;
        Ok(observation)
    }

    /// Batch lookup with explicit ordering and cap.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn get_observations_by_ids(
        &self,
        ids: &[i64],
        order: SortOrder,
        limit: usize,
    ) -> Result<Vec<Observation>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = get_conn(&self.pool)?;
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT {OBSERVATION_COLUMNS} FROM observations WHERE id IN ({placeholders})
             ORDER BY created_at_epoch {} LIMIT ?",
            order.as_sql()
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut sql_params: Vec<&dyn rusqlite::ToSql> = ids.iter().map(coerce_to_sql).collect();
        sql_params.push(&limit);
        let results = stmt
            .query_map(sql_params.as_slice(), |row| self.row_to_observation(row))?
            .filter_map(log_row_error)
            .collect();
        Ok(results)
    }

    /// Every observation extracted from one tool invocation, oldest first.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn get_observations_for_tool_use(&self, tool_use_id: &str) -> Result<Vec<Observation>> {
        let conn = get_conn(&self.pool)?;
        let sql = format!(
            "SELECT {OBSERVATION_COLUMNS} FROM observations WHERE tool_use_id = ?1
             ORDER BY created_at_epoch ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let results = stmt
            .query_map(params![tool_use_id], |row| self.row_to_observation(row))?
            .filter_map(log_row_error)
            .collect();
        Ok(results)
    }

    /// Batch form of [`Storage::get_observations_for_tool_use`]: one map
    /// entry per tool-use id that has observations.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn map_observations_by_tool_use(
        &self,
        tool_use_ids: &[String],
    ) -> Result<HashMap<String, Vec<Observation>>> {
        if tool_use_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let conn = get_conn(&self.pool)?;
        let placeholders = tool_use_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT {OBSERVATION_COLUMNS} FROM observations
             WHERE tool_use_id IN ({placeholders})
             ORDER BY created_at_epoch ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let sql_params: Vec<&dyn rusqlite::ToSql> =
            tool_use_ids.iter().map(coerce_to_sql).collect();
        let rows = stmt
            .query_map(sql_params.as_slice(), |row| self.row_to_observation(row))?
            .filter_map(log_row_error);

        let mut by_tool_use: HashMap<String, Vec<Observation>> = HashMap::new();
        for observation in rows {
            if let Some(key) = observation.tool_use_id.clone() {
                by_tool_use.entry(key).or_default().push(observation);
            }
        }
        Ok(by_tool_use)
    }

    /// All observations of one session.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn get_session_observations(
        &self,
        memory_session_id: &str,
        order: SortOrder,
        limit: usize,
    ) -> Result<Vec<Observation>> {
        let conn = get_conn(&self.pool)?;
        let sql = format!(
            "SELECT {OBSERVATION_COLUMNS} FROM observations WHERE memory_session_id = ?1
             ORDER BY created_at_epoch {} LIMIT ?2",
            order.as_sql()
        );
        let mut stmt = conn.prepare(&sql)?;
        let results = stmt
            .query_map(params![memory_session_id, limit], |row| self.row_to_observation(row))?
            .filter_map(log_row_error)
            .collect();
        Ok(results)
    }

    /// Newest observations of one project.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn get_recent_observations(&self, project: &str, limit: usize) -> Result<Vec<Observation>> {
        let conn = get_conn(&self.pool)?;
        let sql = format!(
            "SELECT {OBSERVATION_COLUMNS} FROM observations WHERE project = ?1
             ORDER BY created_at_epoch DESC LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let results = stmt
            .query_map(params![project, limit], |row| self.row_to_observation(row))?
            .filter_map(log_row_error)
            .collect();
        Ok(results)
    }

    /// Newest observations across every project.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn get_all_recent_observations(&self, limit: usize) -> Result<Vec<Observation>> {
        let conn = get_conn(&self.pool)?;
        let sql = format!(
            "SELECT {OBSERVATION_COLUMNS} FROM observations
             ORDER BY created_at_epoch DESC LIMIT ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let results = stmt
            .query_map(params![limit], |row| self.row_to_observation(row))?
            .filter_map(log_row_error)
            .collect();
        Ok(results)
    }

    /// Deduplicated union of the file lists across a session's
    /// observations.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn get_session_files_touched(&self, memory_session_id: &str) -> Result<FilesTouched> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT files_read, files_modified FROM observations WHERE memory_session_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![memory_session_id], |row| {
                Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?))
            })?
            .filter_map(log_row_error);

        let mut files_read = BTreeSet::new();
        let mut files_modified = BTreeSet::new();
        for (read, modified) in rows {
            files_read.extend(decode_file_list(read));
            files_modified.extend(decode_file_list(modified));
        }
        Ok(FilesTouched {
            files_read: files_read.into_iter().collect(),
            files_modified: files_modified.into_iter().collect(),
        })
    }

    pub(crate) fn row_to_observation(&self, row: &rusqlite::Row<'_>) -> rusqlite::Result<Observation> {
        let id: i64 = row.get(0)?;
        let observation_type: ObservationType = row
            .get::<_, String>(3)?
            .parse()
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        // Rows written before the hierarchical fields existed carry NULL
        // titles; substitute the typed default and surface the anomaly.
        let title = self.expect_with_diagnostic(
            row.get::<_, Option<String>>(4)?,
            "observation.title",
            &format!("observation {id} has no title"),
        );
        let created_at = parse_datetime(&row.get::<_, String>(15)?)?;

        Ok(Observation {
            id,
            memory_session_id: row.get(1)?,
            project: row.get(2)?,
            observation_type,
            title,
            subtitle: row.get(5)?,
            text: row.get(6)?,
            narrative: row.get(7)?,
            facts: parse_json_list(row.get(8)?)?,
            concepts: parse_json_list(row.get(9)?)?,
            files_read: parse_json_list(row.get(10)?)?,
            files_modified: parse_json_list(row.get(11)?)?,
            prompt_number: row.get(12)?,
            discovery_tokens: row.get(13)?,
            tool_use_id: row.get(14)?,
            created_at,
            created_at_epoch: row.get(16)?,
        })
    }
}

fn decode_file_list(raw: Option<String>) -> Vec<String> {
    match raw {
        None => Vec::new(),
        Some(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "corrupt file list column, skipping");
            Vec::new()
        }),
    }
}
