//! Corpus files: `{"chunk_type", "chunks", "total_chunks"}` JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use bard_core::{BardError, Level, QuoteChunk, Result};

/// One level of the corpus as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusFile {
    pub chunk_type: String,
    pub chunks: Vec<QuoteChunk>,
    #[serde(default)]
    pub total_chunks: usize,
}

impl CorpusFile {
    pub fn new(level: Level, chunks: Vec<QuoteChunk>) -> Self {
        Self {
            chunk_type: level.chunk_type().to_string(),
            total_chunks: chunks.len(),
            chunks,
        }
    }

    /// Level named by `chunk_type`.
    pub fn level(&self) -> Result<Level> {
        self.chunk_type.parse()
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BardError::not_found("Corpus file", path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let file: Self = serde_json::from_str(&content)?;
        info!("Loaded {} {} chunks from {:?}", file.chunks.len(), file.chunk_type, path);
        Ok(file)
    }

    /// Write the file; an empty corpus is rejected.
    pub fn save(&self, path: &Path) -> Result<()> {
        if self.chunks.is_empty() {
            return Err(BardError::chunking("No chunks to save. Process a text first."));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Saved {} {} chunks to {:?}", self.chunks.len(), self.chunk_type, path);
        Ok(())
    }
}
