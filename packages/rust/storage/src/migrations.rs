//! SQL migration definitions for the status database.
//!
//! Migrations are applied in order on database open; each one records its
//! version in `schema_migrations`.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: generations",
        sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per pipeline run
CREATE TABLE IF NOT EXISTS generations (
    id         TEXT PRIMARY KEY,
    title      TEXT NOT NULL,
    status     TEXT NOT NULL,
    page_id    TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    -- Unix milliseconds; NULL = never expires
    expires_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_generations_expires ON generations(expires_at);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
