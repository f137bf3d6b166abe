//! Windowed timeline assembly.
//!
//! Reconstructs a contiguous, project-scoped slice of observations,
//! summaries and prompts around an anchor point without scanning whole
//! tables: two bounded boundary scans over observations establish a cheap
//! epoch range, then one ranged query per table fetches the data.

use mnemo_core::{TimelinePrompt, TimelineSummary, TimelineWindow};
use rusqlite::{Connection, OptionalExtension as _, params};

use super::{Storage, get_conn, log_row_error};
use crate::error::Result;

/// Reference point a window is built around. The two variants share the
/// whole algorithm; only the comparison column and seed value differ.
#[derive(Debug, Clone, Copy)]
enum Anchor {
    Observation(i64),
    Epoch(i64),
}

impl Anchor {
    const fn column(self) -> &'static str {
        match self {
            Self::Observation(_) => "id",
            Self::Epoch(_) => "created_at_epoch",
        }
    }

    const fn seed(self) -> i64 {
        match self {
            Self::Observation(v) | Self::Epoch(v) => v,
        }
    }
}

impl Storage {
    /// Window around a specific observation: up to `before` observations
    /// back and `after` forward define the epoch range.
    ///
    /// # Errors
    /// Returns error on connection or ranged-fetch failure. Boundary-scan
    /// failures degrade to an empty window instead, since the timeline is
    /// best-effort presentation data.
    pub fn timeline_around_observation(
        &self,
        observation_id: i64,
        before: usize,
        after: usize,
        project: Option<&str>,
    ) -> Result<TimelineWindow> {
        self.window_around(Anchor::Observation(observation_id), before, after, project)
    }

    /// Window around a point in time (epoch milliseconds).
    ///
    /// # Errors
    /// Same behavior as [`Storage::timeline_around_observation`].
    pub fn timeline_around_epoch(
        &self,
        epoch_ms: i64,
        before: usize,
        after: usize,
        project: Option<&str>,
    ) -> Result<TimelineWindow> {
        self.window_around(Anchor::Epoch(epoch_ms), before, after, project)
    }

    fn window_around(
        &self,
        anchor: Anchor,
        before: usize,
        after: usize,
        project: Option<&str>,
    ) -> Result<TimelineWindow> {
        let conn = get_conn(&self.pool)?;

        let backward = match scan_boundary(&conn, anchor, project, before + 1, true) {
            Ok(epochs) => epochs,
            Err(e) => {
                tracing::warn!(error = %e, "backward boundary scan failed, returning empty window");
                return Ok(TimelineWindow::default());
            },
        };
        let forward = match scan_boundary(&conn, anchor, project, after + 1, false) {
            Ok(epochs) => epochs,
            Err(e) => {
                tracing::warn!(error = %e, "forward boundary scan failed, returning empty window");
                return Ok(TimelineWindow::default());
            },
        };

        // Nothing on either side means nothing to window around.
        if backward.is_empty() && forward.is_empty() {
            return Ok(TimelineWindow::default());
        }

        let anchor_epoch = match anchor {
            Anchor::Epoch(epoch) => Some(epoch),
            Anchor::Observation(id) => observation_epoch(&conn, id)?,
        };

        // Boundary = furthest row each scan reached. An empty side
        // degrades to the anchor's own epoch; when the anchor id is
        // unknown the populated side's nearest row stands in.
        let low_epoch = backward
            .last()
            .copied()
            .or(anchor_epoch)
            .or_else(|| forward.first().copied());
        let high_epoch = forward
            .last()
            .copied()
            .or(anchor_epoch)
            .or_else(|| backward.first().copied());
        let (Some(low_epoch), Some(high_epoch)) = (low_epoch, high_epoch) else {
            return Ok(TimelineWindow::default());
        };

        Ok(TimelineWindow {
            observations: self.observations_between(&conn, low_epoch, high_epoch, project)?,
            summaries: summaries_between(&conn, low_epoch, high_epoch, project)?,
            prompts: prompts_between(&conn, low_epoch, high_epoch, project)?,
        })
    }

    fn observations_between(
        &self,
        conn: &Connection,
        low_epoch: i64,
        high_epoch: i64,
        project: Option<&str>,
    ) -> Result<Vec<mnemo_core::Observation>> {
        let columns = "id, memory_session_id, project, type, title, subtitle, text, narrative, \
             facts, concepts, files_read, files_modified, prompt_number, \
             COALESCE(discovery_tokens, 0), tool_use_id, created_at, created_at_epoch";
        let results = if let Some(p) = project {
            let sql = format!(
                "SELECT {columns} FROM observations
                 WHERE created_at_epoch BETWEEN ?1 AND ?2 AND project = ?3
                 ORDER BY created_at_epoch ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_map(params![low_epoch, high_epoch, p], |row| self.row_to_observation(row))?
                .filter_map(log_row_error)
                .collect()
        } else {
            let sql = format!(
                "SELECT {columns} FROM observations
                 WHERE created_at_epoch BETWEEN ?1 AND ?2
                 ORDER BY created_at_epoch ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_map(params![low_epoch, high_epoch], |row| self.row_to_observation(row))?
                .filter_map(log_row_error)
                .collect()
        };
        Ok(results)
    }
}

/// Bounded scan over observations on one side of the anchor. Returns the
/// epochs in scan order, nearest first, so the last element is the
/// furthest boundary the scan reached.
fn scan_boundary(
    conn: &Connection,
    anchor: Anchor,
    project: Option<&str>,
    limit: usize,
    backward: bool,
) -> rusqlite::Result<Vec<i64>> {
    let column = anchor.column();
    let (cmp, dir) = if backward { ("<=", "DESC") } else { (">=", "ASC") };
    let seed = anchor.seed();

    let epochs = if let Some(p) = project {
        let sql = format!(
            "SELECT created_at_epoch FROM observations
             WHERE {column} {cmp} ?1 AND project = ?2
             ORDER BY {column} {dir} LIMIT ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![seed, p, limit], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<i64>>>()?
    } else {
        let sql = format!(
            "SELECT created_at_epoch FROM observations
             WHERE {column} {cmp} ?1
             ORDER BY {column} {dir} LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![seed, limit], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<i64>>>()?
    };
    Ok(epochs)
}

fn observation_epoch(conn: &Connection, id: i64) -> Result<Option<i64>> {
    let epoch = conn
        .query_row("SELECT created_at_epoch FROM observations WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(epoch)
}

fn summaries_between(
    conn: &Connection,
    low_epoch: i64,
    high_epoch: i64,
    project: Option<&str>,
) -> Result<Vec<TimelineSummary>> {
    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<TimelineSummary> {
        Ok(TimelineSummary {
            id: row.get(0)?,
            memory_session_id: row.get(1)?,
            request: row.get(2)?,
            learned: row.get(3)?,
            completed: row.get(4)?,
            next_steps: row.get(5)?,
            prompt_number: row.get(6)?,
            created_at_epoch: row.get(7)?,
        })
    };
    let columns = "id, memory_session_id, request, learned, completed, next_steps, \
         prompt_number, created_at_epoch";
    let results = if let Some(p) = project {
        let sql = format!(
            "SELECT {columns} FROM session_summaries
             WHERE created_at_epoch BETWEEN ?1 AND ?2 AND project = ?3
             ORDER BY created_at_epoch ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        stmt.query_map(params![low_epoch, high_epoch, p], map_row)?
            .filter_map(log_row_error)
            .collect()
    } else {
        let sql = format!(
            "SELECT {columns} FROM session_summaries
             WHERE created_at_epoch BETWEEN ?1 AND ?2
             ORDER BY created_at_epoch ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        stmt.query_map(params![low_epoch, high_epoch], map_row)?
            .filter_map(log_row_error)
            .collect()
    };
    Ok(results)
}

fn prompts_between(
    conn: &Connection,
    low_epoch: i64,
    high_epoch: i64,
    project: Option<&str>,
) -> Result<Vec<TimelinePrompt>> {
    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<TimelinePrompt> {
        Ok(TimelinePrompt {
            id: row.get(0)?,
            content_session_id: row.get(1)?,
            prompt_number: row.get(2)?,
            prompt_text: row.get(3)?,
            created_at_epoch: row.get(4)?,
        })
    };
    let results = if let Some(p) = project {
        let mut stmt = conn.prepare(
            "SELECT p.id, p.content_session_id, p.prompt_number, p.prompt_text,
                    p.created_at_epoch
             FROM user_prompts p
             JOIN sessions s ON s.content_session_id = p.content_session_id
             WHERE p.created_at_epoch BETWEEN ?1 AND ?2 AND s.project = ?3
             ORDER BY p.created_at_epoch ASC",
        )?;
        stmt.query_map(params![low_epoch, high_epoch, p], map_row)?
            .filter_map(log_row_error)
            .collect()
    } else {
        let mut stmt = conn.prepare(
            "SELECT p.id, p.content_session_id, p.prompt_number, p.prompt_text,
                    p.created_at_epoch
             FROM user_prompts p
             WHERE p.created_at_epoch BETWEEN ?1 AND ?2
             ORDER BY p.created_at_epoch ASC",
        )?;
        stmt.query_map(params![low_epoch, high_epoch], map_row)?
            .filter_map(log_row_error)
            .collect()
    };
    Ok(results)
}
