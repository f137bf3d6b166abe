//! Migration v7: drop the UNIQUE constraint on
//! session_summaries.memory_session_id.

pub(super) const SHADOW_SQL: &str = "
CREATE TABLE session_summaries_new (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    memory_session_id TEXT NOT NULL,
    project TEXT NOT NULL,
    request TEXT,
    investigated TEXT,
    learned TEXT,
    completed TEXT,
    next_steps TEXT,
    files_read TEXT,
    files_edited TEXT,
    notes TEXT,
    prompt_number INTEGER,
    created_at TEXT NOT NULL,
    created_at_epoch INTEGER NOT NULL,
    FOREIGN KEY(memory_session_id) REFERENCES sessions(memory_session_id) ON DELETE CASCADE
);
";

pub(super) const COLUMNS: &[&str] = &[
    "id",
    "memory_session_id",
    "project",
    "request",
    "investigated",
    "learned",
    "completed",
    "next_steps",
    "files_read",
    "files_edited",
    "notes",
    "prompt_number",
    "created_at",
    "created_at_epoch",
];

pub(super) const INDEX_SQL: &str = "
CREATE INDEX IF NOT EXISTS idx_session_summaries_session ON session_summaries(memory_session_id);
CREATE INDEX IF NOT EXISTS idx_session_summaries_project ON session_summaries(project);
CREATE INDEX IF NOT EXISTS idx_session_summaries_created ON session_summaries(created_at_epoch DESC);
";
