//! bard-store - SQLite quote store
//!
//! Persists line, phrase and fragment quotes with their embeddings in one
//! SQLite database. Nearest-neighbour queries use the sqlite-vec extension
//! when it can be loaded and fall back to an in-process cosine scan
//! otherwise. Keyword search goes through FTS5.

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

// Re-export schema for testing/migrations
pub use schema::{vec_schema, SCHEMA, SCHEMA_VERSION};
