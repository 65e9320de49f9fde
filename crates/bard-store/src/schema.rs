//! Database schema definitions.

use bard_core::Level;

/// Main schema SQL for initializing the database.
pub const SCHEMA: &str = r#"
-- One row per quote; metadata holds the full chunk as JSON
CREATE TABLE IF NOT EXISTS quotes (
    id INTEGER PRIMARY KEY,
    level TEXT NOT NULL,
    chunk_id TEXT NOT NULL,
    title TEXT NOT NULL,
    act TEXT,
    scene TEXT,
    line INTEGER NOT NULL,
    text TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    content_hash TEXT NOT NULL,
    embedding BLOB,
    UNIQUE(level, chunk_id)
);

CREATE INDEX IF NOT EXISTS idx_quotes_level ON quotes(level);
CREATE INDEX IF NOT EXISTS idx_quotes_reference ON quotes(title, act, scene, line);

-- FTS5 virtual table for keyword search
CREATE VIRTUAL TABLE IF NOT EXISTS quotes_fts USING fts5(
    text,
    content=quotes,
    content_rowid=id
);

CREATE TRIGGER IF NOT EXISTS quotes_ai AFTER INSERT ON quotes BEGIN
    INSERT INTO quotes_fts(rowid, text) VALUES (NEW.id, NEW.text);
END;

CREATE TRIGGER IF NOT EXISTS quotes_ad AFTER DELETE ON quotes BEGIN
    INSERT INTO quotes_fts(quotes_fts, rowid, text) VALUES ('delete', OLD.id, OLD.text);
END;

CREATE TRIGGER IF NOT EXISTS quotes_au AFTER UPDATE ON quotes BEGIN
    INSERT INTO quotes_fts(quotes_fts, rowid, text) VALUES ('delete', OLD.id, OLD.text);
    INSERT INTO quotes_fts(rowid, text) VALUES (NEW.id, NEW.text);
END;

CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Name of the sqlite-vec table holding a level's vectors.
pub(crate) fn vec_table(level: Level) -> String {
    format!("vec_{}", level.collection())
}

/// sqlite-vec tables, one per level, keyed by `quotes.id`.
///
/// Created only after the extension has been loaded.
pub fn vec_schema(dimension: usize) -> String {
    Level::ALL
        .iter()
        .map(|level| {
            format!(
                "CREATE VIRTUAL TABLE IF NOT EXISTS {} USING vec0(\n    embedding float[{}] distance_metric=cosine\n);\n",
                vec_table(*level),
                dimension
            )
        })
        .collect()
}

/// Schema version for migrations.
pub const SCHEMA_VERSION: u32 = 1;
