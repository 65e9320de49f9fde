//! Core traits defining the interfaces between components.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CandidateQuote, ChatRequest, Level, Provider, QuoteChunk, StoreStats};

/// Storage layer for the quote corpus.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Insert or replace chunks with their embeddings.
    async fn upsert_chunks(
        &self,
        level: Level,
        chunks: &[QuoteChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<()>;

    /// Nearest neighbours of `embedding` within a level, closest first.
    async fn query(&self, level: Level, embedding: &[f32], n: usize) -> Result<Vec<CandidateQuote>>;

    /// Full-text search within a level, best match first.
    async fn keyword_search(&self, level: Level, query: &str, n: usize) -> Result<Vec<CandidateQuote>>;

    async fn get_chunk(&self, level: Level, chunk_id: &str) -> Result<Option<QuoteChunk>>;

    /// Content hash per chunk id for a level.
    async fn content_hashes(&self, level: Level) -> Result<HashMap<String, String>>;

    async fn count(&self, level: Level) -> Result<u64>;

    async fn clear(&self, level: Level) -> Result<()>;

    async fn get_stats(&self) -> Result<StoreStats>;
}

/// Embedding model trait.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts.
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Estimate the token count of a text.
    fn count_tokens(&self, text: &str) -> usize;

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Get the maximum number of tokens accepted per request.
    fn max_tokens(&self) -> usize;
}

/// Hosted chat model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn provider(&self) -> Provider;

    fn model(&self) -> &str;

    /// Run one completion and return the text of the reply.
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// Derives sub-line quotes (phrases, fragments) from line chunks.
pub trait Chunker: Send + Sync {
    /// Level of the chunks this chunker produces.
    fn level(&self) -> Level;

    fn chunk_lines(&self, lines: &[QuoteChunk]) -> Result<Vec<QuoteChunk>>;
}
