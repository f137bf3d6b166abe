//! Migration v10: user_prompts table with its FTS5 mirror.
//!
//! The triggers are the only writers of the FTS table; any direct mutation
//! of prompt rows that bypasses them is a correctness bug.

pub(super) const SQL: &str = "
CREATE TABLE user_prompts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content_session_id TEXT NOT NULL,
    prompt_number INTEGER NOT NULL,
    prompt_text TEXT NOT NULL,
    created_at TEXT NOT NULL,
    created_at_epoch INTEGER NOT NULL,
    FOREIGN KEY(content_session_id) REFERENCES sessions(content_session_id) ON DELETE CASCADE
);

CREATE INDEX idx_user_prompts_session ON user_prompts(content_session_id);
CREATE INDEX idx_user_prompts_created ON user_prompts(created_at_epoch DESC);
CREATE INDEX idx_user_prompts_lookup ON user_prompts(content_session_id, prompt_number);

CREATE VIRTUAL TABLE user_prompts_fts USING fts5(
    prompt_text,
    content='user_prompts',
    content_rowid='id'
);

CREATE TRIGGER user_prompts_ai AFTER INSERT ON user_prompts BEGIN
    INSERT INTO user_prompts_fts(rowid, prompt_text)
    VALUES (new.id, new.prompt_text);
END;

CREATE TRIGGER user_prompts_ad AFTER DELETE ON user_prompts BEGIN
    INSERT INTO user_prompts_fts(user_prompts_fts, rowid, prompt_text)
    VALUES('delete', old.id, old.prompt_text);
END;

CREATE TRIGGER user_prompts_au AFTER UPDATE ON user_prompts BEGIN
    INSERT INTO user_prompts_fts(user_prompts_fts, rowid, prompt_text)
    VALUES('delete', old.id, old.prompt_text);
    INSERT INTO user_prompts_fts(rowid, prompt_text)
    VALUES (new.id, new.prompt_text);
END;
";
