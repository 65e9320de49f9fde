//! SQLite-based storage implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info, warn};

use bard_core::{BardError, CandidateQuote, DatabaseConfig, Level, QuoteChunk, QuoteStore, Result, StoreStats};

use crate::schema::{vec_schema, vec_table, SCHEMA, SCHEMA_VERSION};

const DEFAULT_WRITE_BATCH: usize = 1000;

/// SQLite-based quote store.
///
/// All levels share one `quotes` table. The connection sits behind a
/// blocking Mutex; statements are short so they run inline.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,

    /// Embedding dimension every stored vector must have.
    dimension: usize,

    /// Rows per write transaction.
    write_batch: usize,

    /// Whether sqlite-vec extension is loaded.
    vec_enabled: bool,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>, dimension: usize) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| BardError::database(format!("Failed to open database: {}", e)))?;

        Self::init(conn, dimension, path)
    }

    /// Open the database described by the configuration, applying its tuning.
    pub fn open_with_config(config: &DatabaseConfig, dimension: usize) -> Result<Self> {
        let mut store = Self::open(&config.path, dimension)?;
        store.write_batch = config.write_batch.max(1);
        store.with_conn(|conn| {
            conn.execute_batch(&format!(
                "PRAGMA cache_size = {};\nPRAGMA busy_timeout = {};",
                config.cache_size, config.busy_timeout_ms
            ))
            .map_err(|e| BardError::database(format!("Failed to configure connection: {}", e)))
        })?;
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory(dimension: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| BardError::database(format!("Failed to open in-memory database: {}", e)))?;

        Self::init(conn, dimension, Path::new(":memory:"))
    }

    fn init(conn: Connection, dimension: usize, path: &Path) -> Result<Self> {
        if dimension == 0 {
            return Err(BardError::invalid_argument("Embedding dimension must be positive"));
        }

        Self::configure_connection(&conn)?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| BardError::database(format!("Failed to initialize schema: {}", e)))?;

        Self::check_dimension(&conn, dimension)?;

        let vec_enabled = Self::try_load_vec_extension(&conn);

        if vec_enabled {
            conn.execute_batch(&vec_schema(dimension))
                .map_err(|e| BardError::database(format!("Failed to create vec tables: {}", e)))?;
            info!("sqlite-vec extension loaded successfully");
        } else {
            warn!("sqlite-vec extension not available - using brute-force cosine search");
        }

        info!("Database opened at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            dimension,
            write_batch: DEFAULT_WRITE_BATCH,
            vec_enabled,
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;
            PRAGMA busy_timeout = 30000;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
            PRAGMA foreign_keys = ON;
            "#,
        )
        .map_err(|e| BardError::database(format!("Failed to configure connection: {}", e)))?;

        Ok(())
    }

    /// Record the dimension on first open; reject a different one later.
    fn check_dimension(conn: &Connection, dimension: usize) -> Result<()> {
        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM store_meta WHERE key = 'dimension'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| BardError::database(e.to_string()))?;

        match stored {
            Some(value) if value != dimension.to_string() => Err(BardError::invalid_argument(format!(
                "Database holds {}-dimensional embeddings, embedder produces {}",
                value, dimension
            ))),
            Some(_) => Ok(()),
            None => {
                conn.execute(
                    "INSERT INTO store_meta (key, value) VALUES ('dimension', ?1), ('schema_version', ?2)",
                    params![dimension.to_string(), SCHEMA_VERSION.to_string()],
                )
                .map_err(|e| BardError::database(e.to_string()))?;
                Ok(())
            }
        }
    }

    /// Try to load the sqlite-vec extension.
    fn try_load_vec_extension(conn: &Connection) -> bool {
        let paths = [
            "vec0",
            "libsqlite_vec",
            "/usr/local/lib/libsqlite_vec",
            "/opt/homebrew/lib/libsqlite_vec",
        ];

        unsafe {
            if conn.load_extension_enable().is_err() {
                return false;
            }

            for path in paths {
                if conn.load_extension(path, None::<&str>).is_ok() {
                    let _ = conn.load_extension_disable();
                    return true;
                }
            }

            let _ = conn.load_extension_disable();
        }

        false
    }

    /// Check if the sqlite-vec index is in use.
    pub fn vec_enabled(&self) -> bool {
        self.vec_enabled
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let conn = self.conn.lock().map_err(|e| BardError::database(e.to_string()))?;
        f(&conn)
    }

    fn check_embedding(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(BardError::invalid_argument(format!(
                "Embedding has dimension {}, store expects {}",
                embedding.len(),
                self.dimension
            )));
        }
        Ok(())
    }

    /// Write one batch of rows inside a single transaction.
    fn upsert_batch(&self, level: Level, chunks: &[QuoteChunk], embeddings: &[Vec<f32>]) -> Result<()> {
        let vec_enabled = self.vec_enabled;
        let table = vec_table(level);

        self.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| BardError::database(e.to_string()))?;

            {
                let mut stmt = tx
                    .prepare(
                        r#"
                        INSERT INTO quotes (level, chunk_id, title, act, scene, line, text,
                                            metadata, content_hash, embedding)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                        ON CONFLICT(level, chunk_id) DO UPDATE SET
                            title = excluded.title,
                            act = excluded.act,
                            scene = excluded.scene,
                            line = excluded.line,
                            text = excluded.text,
                            metadata = excluded.metadata,
                            content_hash = excluded.content_hash,
                            embedding = excluded.embedding
                        RETURNING id
                        "#,
                    )
                    .map_err(|e| BardError::database(e.to_string()))?;

                for (chunk, embedding) in chunks.iter().zip(embeddings) {
                    let metadata = serde_json::to_string(chunk)?;
                    let bytes = vec_to_bytes(embedding);
                    let id: i64 = stmt
                        .query_row(
                            params![
                                level.chunk_type(),
                                chunk.chunk_id,
                                chunk.title,
                                chunk.act,
                                chunk.scene,
                                chunk.line,
                                chunk.text,
                                metadata,
                                chunk.content_hash(),
                                bytes,
                            ],
                            |row| row.get(0),
                        )
                        .map_err(|e| BardError::database(format!("Failed to upsert quote: {}", e)))?;

                    if vec_enabled {
                        tx.execute(&format!("DELETE FROM {} WHERE rowid = ?1", table), params![id])
                            .map_err(|e| BardError::database(e.to_string()))?;
                        tx.execute(
                            &format!("INSERT INTO {} (rowid, embedding) VALUES (?1, ?2)", table),
                            params![id, bytes],
                        )
                        .map_err(|e| BardError::database(format!("Failed to insert vector: {}", e)))?;
                    }
                }
            }

            tx.commit().map_err(|e| BardError::database(e.to_string()))?;
            Ok(())
        })
    }

    fn vec_query(&self, level: Level, embedding: &[f32], n: usize) -> Result<Vec<CandidateQuote>> {
        let bytes = vec_to_bytes(embedding);
        let sql = format!(
            r#"
            SELECT q.metadata, v.distance
            FROM {} v
            JOIN quotes q ON q.id = v.rowid
            WHERE v.embedding MATCH ?1 AND k = ?2
            ORDER BY v.distance
            "#,
            vec_table(level)
        );

        let rows: Vec<(String, f64)> = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql).map_err(|e| BardError::database(e.to_string()))?;
            let rows = stmt
                .query_map(params![bytes, n as i64], |row| Ok((row.get(0)?, row.get(1)?)))
                .map_err(|e| BardError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| BardError::database(e.to_string()))?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(metadata, distance)| Ok(CandidateQuote::new(serde_json::from_str(&metadata)?, distance as f32)))
            .collect()
    }

    /// Scan every stored vector of the level and rank by cosine distance.
    fn scan_query(&self, level: Level, embedding: &[f32], n: usize) -> Result<Vec<CandidateQuote>> {
        let rows: Vec<(String, Vec<u8>)> = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT metadata, embedding FROM quotes WHERE level = ?1 AND embedding IS NOT NULL")
                .map_err(|e| BardError::database(e.to_string()))?;
            let rows = stmt
                .query_map(params![level.chunk_type()], |row| Ok((row.get(0)?, row.get(1)?)))
                .map_err(|e| BardError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| BardError::database(e.to_string()))?;
            Ok(rows)
        })?;

        let mut scored: Vec<(String, f32)> = rows
            .into_iter()
            .map(|(metadata, bytes)| {
                let distance = cosine_distance(embedding, &bytes_to_vec(&bytes));
                (metadata, distance)
            })
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(n);

        scored
            .into_iter()
            .map(|(metadata, distance)| Ok(CandidateQuote::new(serde_json::from_str(&metadata)?, distance)))
            .collect()
    }
}

#[async_trait]
impl QuoteStore for SqliteStore {
    async fn upsert_chunks(&self, level: Level, chunks: &[QuoteChunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(BardError::invalid_argument(format!(
                "Got {} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        for embedding in embeddings {
            self.check_embedding(embedding)?;
        }

        let mut written = 0;
        for (chunk_batch, embedding_batch) in chunks.chunks(self.write_batch).zip(embeddings.chunks(self.write_batch)) {
            self.upsert_batch(level, chunk_batch, embedding_batch)?;
            written += chunk_batch.len();
            debug!("Upserted {}/{} {}", written, chunks.len(), level.collection());
        }

        info!("Stored {} {} quotes", written, level.chunk_type());
        Ok(())
    }

    async fn query(&self, level: Level, embedding: &[f32], n: usize) -> Result<Vec<CandidateQuote>> {
        self.check_embedding(embedding)?;
        if n == 0 {
            return Ok(Vec::new());
        }

        if self.vec_enabled {
            self.vec_query(level, embedding, n)
        } else {
            self.scan_query(level, embedding, n)
        }
    }

    async fn keyword_search(&self, level: Level, query: &str, n: usize) -> Result<Vec<CandidateQuote>> {
        let escaped_query = escape_fts5_query(query);
        if escaped_query.is_empty() || n == 0 {
            return Ok(Vec::new());
        }

        let rows: Vec<(String, f64)> = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT q.metadata, bm25(quotes_fts) as score
                    FROM quotes_fts f
                    JOIN quotes q ON q.id = f.rowid
                    WHERE quotes_fts MATCH ?1
                    AND q.level = ?2
                    ORDER BY score
                    LIMIT ?3
                    "#,
                )
                .map_err(|e| BardError::database(e.to_string()))?;

            let rows = stmt
                .query_map(params![escaped_query, level.chunk_type(), n as i64], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })
                .map_err(|e| BardError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| BardError::database(e.to_string()))?;
            Ok(rows)
        })?;

        // bm25 is lower-is-better, like the vector distance
        rows.into_iter()
            .map(|(metadata, score)| Ok(CandidateQuote::new(serde_json::from_str(&metadata)?, score as f32)))
            .collect()
    }

    async fn get_chunk(&self, level: Level, chunk_id: &str) -> Result<Option<QuoteChunk>> {
        let metadata: Option<String> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT metadata FROM quotes WHERE level = ?1 AND chunk_id = ?2",
                params![level.chunk_type(), chunk_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| BardError::database(e.to_string()))
        })?;

        match metadata {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn content_hashes(&self, level: Level) -> Result<HashMap<String, String>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT chunk_id, content_hash FROM quotes WHERE level = ?1")
                .map_err(|e| BardError::database(e.to_string()))?;

            let hashes = stmt
                .query_map(params![level.chunk_type()], |row| Ok((row.get(0)?, row.get(1)?)))
                .map_err(|e| BardError::database(e.to_string()))?
                .collect::<std::result::Result<HashMap<_, _>, _>>()
                .map_err(|e| BardError::database(e.to_string()))?;

            Ok(hashes)
        })
    }

    async fn count(&self, level: Level) -> Result<u64> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM quotes WHERE level = ?1",
                params![level.chunk_type()],
                |row| row.get(0),
            )
            .map_err(|e| BardError::database(e.to_string()))
        })
    }

    async fn clear(&self, level: Level) -> Result<()> {
        let vec_enabled = self.vec_enabled;
        self.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| BardError::database(e.to_string()))?;

            if vec_enabled {
                tx.execute(&format!("DELETE FROM {}", vec_table(level)), [])
                    .map_err(|e| BardError::database(e.to_string()))?;
            }

            let deleted = tx
                .execute("DELETE FROM quotes WHERE level = ?1", params![level.chunk_type()])
                .map_err(|e| BardError::database(e.to_string()))?;

            tx.commit().map_err(|e| BardError::database(e.to_string()))?;

            info!("Cleared {} {} quotes", deleted, level.chunk_type());
            Ok(())
        })
    }

    async fn get_stats(&self) -> Result<StoreStats> {
        let dimension = self.dimension;
        let vector_index = self.vec_enabled;

        self.with_conn(|conn| {
            let count = |level: Level| -> Result<u64> {
                conn.query_row(
                    "SELECT COUNT(*) FROM quotes WHERE level = ?1",
                    params![level.chunk_type()],
                    |row| row.get(0),
                )
                .map_err(|e| BardError::database(e.to_string()))
            };

            let embeddings: u64 = conn
                .query_row("SELECT COUNT(*) FROM quotes WHERE embedding IS NOT NULL", [], |row| row.get(0))
                .map_err(|e| BardError::database(e.to_string()))?;

            let page_count: u64 = conn
                .query_row("PRAGMA page_count", [], |row| row.get(0))
                .map_err(|e| BardError::database(e.to_string()))?;
            let page_size: u64 = conn
                .query_row("PRAGMA page_size", [], |row| row.get(0))
                .map_err(|e| BardError::database(e.to_string()))?;

            Ok(StoreStats {
                lines: count(Level::Line)?,
                phrases: count(Level::Phrase)?,
                fragments: count(Level::Fragment)?,
                embeddings,
                dimension,
                storage_bytes: page_count * page_size,
                vector_index,
            })
        })
    }
}

/// Convert f32 vector to bytes (little-endian).
fn vec_to_bytes(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_vec(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// `1 - cos(a, b)`; zero vectors are maximally distant.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Escape FTS5 query syntax.
///
/// Terms that are not plain words (apostrophes, punctuation, bare
/// operators) are wrapped in double quotes.
fn escape_fts5_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|term| {
            let plain = term.chars().all(|c| c.is_alphanumeric() || c == '_');
            let operator = matches!(term, "AND" | "OR" | "NOT" | "NEAR");
            if plain && !operator {
                term.to_string()
            } else {
                format!("\"{}\"", term.replace('"', "\"\""))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, line: u32, text: &str) -> QuoteChunk {
        QuoteChunk::new(id, "THE TRAGEDY OF MACBETH", Some("V"), Some("V"), line, text)
    }

    async fn seeded() -> SqliteStore {
        let store = SqliteStore::open_memory(3).unwrap();
        let chunks = vec![
            chunk("chunk_1", 19, "Tomorrow, and tomorrow, and tomorrow,"),
            chunk("chunk_2", 20, "Creeps in this petty pace from day to day,"),
            chunk("chunk_3", 27, "Told by an idiot, full of sound and fury,"),
        ];
        let embeddings = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]];
        store.upsert_chunks(Level::Line, &chunks, &embeddings).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_open_memory() {
        let store = SqliteStore::open_memory(8).unwrap();
        assert_eq!(store.count(Level::Line).await.unwrap(), 0);
        assert_eq!(store.dimension(), 8);
    }

    #[tokio::test]
    async fn test_query_orders_by_distance() {
        let store = seeded().await;
        let results = store.query(Level::Line, &[0.1, 0.9, 0.0], 2).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk_id, "chunk_2");
        assert!(results[0].score < results[1].score);
        assert_eq!(results[0].chunk.act.as_deref(), Some("V"));
    }

    #[tokio::test]
    async fn test_levels_are_separate() {
        let store = seeded().await;
        assert_eq!(store.count(Level::Phrase).await.unwrap(), 0);
        assert!(store.query(Level::Phrase, &[1.0, 0.0, 0.0], 3).await.unwrap().is_empty());
        assert!(store.get_chunk(Level::Phrase, "chunk_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = seeded().await;
        let updated = chunk("chunk_1", 19, "To-morrow, and to-morrow, and to-morrow,");
        store
            .upsert_chunks(Level::Line, &[updated], &[vec![1.0, 0.0, 0.0]])
            .await
            .unwrap();

        assert_eq!(store.count(Level::Line).await.unwrap(), 3);
        let stored = store.get_chunk(Level::Line, "chunk_1").await.unwrap().unwrap();
        assert!(stored.text.starts_with("To-morrow"));

        // FTS index follows the update
        assert!(store.keyword_search(Level::Line, "Tomorrow", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keyword_search() {
        let store = seeded().await;
        let results = store.keyword_search(Level::Line, "idiot", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.chunk_id, "chunk_3");

        // Special characters do not break the query
        let results = store.keyword_search(Level::Line, "fury, \"sound\"", 5).await.unwrap();
        assert!(results.is_empty() || results[0].chunk.chunk_id == "chunk_3");
        assert!(store.keyword_search(Level::Line, "   ", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let store = seeded().await;
        let err = store.query(Level::Line, &[1.0, 0.0], 3).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");

        let err = store
            .upsert_chunks(Level::Line, &[chunk("chunk_9", 1, "Out, damned spot!")], &[])
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_content_hashes_and_clear() {
        let store = seeded().await;
        let hashes = store.content_hashes(Level::Line).await.unwrap();
        assert_eq!(hashes.len(), 3);
        assert_eq!(
            hashes["chunk_2"],
            chunk("chunk_2", 20, "Creeps in this petty pace from day to day,").content_hash()
        );

        store.clear(Level::Line).await.unwrap();
        assert_eq!(store.count(Level::Line).await.unwrap(), 0);
        assert!(store.keyword_search(Level::Line, "idiot", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats() {
        let store = seeded().await;
        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.lines, 3);
        assert_eq!(stats.phrases, 0);
        assert_eq!(stats.embeddings, 3);
        assert_eq!(stats.dimension, 3);
        assert!(stats.storage_bytes > 0);
        assert_eq!(stats.total_quotes(), 3);
    }

    #[tokio::test]
    async fn test_reopen_checks_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("quotes.db");

        let store = SqliteStore::open(&path, 3).unwrap();
        store
            .upsert_chunks(Level::Line, &[chunk("chunk_1", 1, "Fair is foul")], &[vec![0.0, 1.0, 0.0]])
            .await
            .unwrap();
        drop(store);

        let reopened = SqliteStore::open(&path, 3).unwrap();
        assert_eq!(reopened.count(Level::Line).await.unwrap(), 1);
        drop(reopened);

        let err = SqliteStore::open(&path, 4).err().unwrap();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_cosine_distance() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn test_escape_fts5_query() {
        assert_eq!(escape_fts5_query("sound fury"), "sound fury");
        assert_eq!(escape_fts5_query("'tis NOT"), "\"'tis\" \"NOT\"");
        assert_eq!(escape_fts5_query("a\"b"), "\"a\"\"b\"");
    }
}
