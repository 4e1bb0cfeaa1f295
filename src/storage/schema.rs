//! Database schema definitions.

use rusqlite::{Connection, Result};

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the scanmerge database.
pub const SCHEMA_SQL: &str = r"
    -- Registered rules. Issues reference rules by numeric id; the
    -- external identity is (repository, rule_key).
    CREATE TABLE IF NOT EXISTS rules (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        repository TEXT NOT NULL,
        rule_key TEXT NOT NULL,
        UNIQUE (repository, rule_key)
    );

    -- Issues table.
    -- selected_at is epoch milliseconds (not RFC3339 text) because the
    -- conditional update compares it in SQL.
    CREATE TABLE IF NOT EXISTS issues (
        key TEXT PRIMARY KEY,
        project TEXT NOT NULL,
        component TEXT NOT NULL,
        rule_id INTEGER NOT NULL REFERENCES rules(id),
        severity TEXT NOT NULL,
        status TEXT NOT NULL,
        resolution TEXT,
        assignee TEXT,
        line INTEGER,
        message TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        selected_at INTEGER
    );

    CREATE INDEX IF NOT EXISTS idx_issues_project ON issues(project);
    CREATE INDEX IF NOT EXISTS idx_issues_rule_id ON issues(rule_id);
    CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
    CREATE INDEX IF NOT EXISTS idx_issues_updated_at ON issues(updated_at);

    -- Append-only change log. One row is either a single field
    -- transition (change_type 'diff') or a comment (change_type
    -- 'comment'). Rows are never updated or deleted by the engine.
    CREATE TABLE IF NOT EXISTS issue_changes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_key TEXT NOT NULL,
        change_type TEXT NOT NULL,
        field TEXT,
        old_value TEXT,
        new_value TEXT,
        body TEXT,
        author TEXT,
        created_at TEXT NOT NULL,
        FOREIGN KEY (issue_key) REFERENCES issues(key) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_issue_changes_issue_key ON issue_changes(issue_key);
    CREATE INDEX IF NOT EXISTS idx_issue_changes_created_at ON issue_changes(created_at);

    -- Metadata
    CREATE TABLE IF NOT EXISTS metadata (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

/// Apply the schema to the database.
///
/// This uses `execute_batch` to run the entire DDL script.
/// It is idempotent because all statements use `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    // Set journal mode to WAL for concurrency with the interactive editor
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Enable foreign keys
    conn.pragma_update(None, "foreign_keys", "ON")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_apply_schema() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("Failed to apply schema");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert!(tables.contains(&"rules".to_string()));
        assert!(tables.contains(&"issues".to_string()));
        assert!(tables.contains(&"issue_changes".to_string()));

        let foreign_keys: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);

        let version: String = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION.to_string());
    }

    #[test]
    fn test_apply_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();
    }
}
