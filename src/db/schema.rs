use rusqlite::Connection;

pub const SCHEMA: &str = r#"
-- tips table
CREATE TABLE IF NOT EXISTS tips (
    id TEXT PRIMARY KEY,
    situation TEXT NOT NULL,
    language TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    display_count INTEGER DEFAULT 0,
    is_active BOOLEAN DEFAULT TRUE,
    likes INTEGER DEFAULT 0,
    CHECK (situation IN ('morning', 'work', 'break', 'evening', 'sleep')),
    CHECK (language IN ('zh', 'en'))
);

CREATE INDEX IF NOT EXISTS idx_tips_situation_language ON tips(situation, language);

-- interactions table (append-only like log)
CREATE TABLE IF NOT EXISTS interactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tip_id TEXT NOT NULL REFERENCES tips(id),
    interaction_type TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_interactions_tip_id ON interactions(tip_id);
"#;

/// Columns that older databases may lack, with the definition used to add them.
const ADDITIVE_COLUMNS: [(&str, &str); 3] = [
    ("display_count", "INTEGER DEFAULT 0"),
    ("is_active", "BOOLEAN DEFAULT TRUE"),
    ("likes", "INTEGER DEFAULT 0"),
];

/// Adds any missing optional column to `tips`. Returns the names that were added.
pub fn migrate(conn: &Connection) -> rusqlite::Result<Vec<&'static str>> {
    let existing: Vec<String> = {
        let mut stmt = conn.prepare("PRAGMA table_info(tips)")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        names
    };

    let mut added = Vec::new();
    for (column, definition) in ADDITIVE_COLUMNS {
        if !existing.iter().any(|name| name == column) {
            conn.execute_batch(&format!("ALTER TABLE tips ADD COLUMN {column} {definition}"))?;
            added.push(column);
        }
    }

    Ok(added)
}
