//! bard-embed - Text embedding clients
//!
//! - [`OpenAiEmbedder`]: the hosted `text-embedding-3-large` model, with
//!   requests split by item count and estimated tokens.
//! - [`MockEmbedder`]: deterministic hash embeddings for tests and offline
//!   corpus builds.

mod mock;
mod openai;

use std::sync::Arc;

use bard_core::{ApiKeys, BardError, EmbeddingConfig, LlmConfig, Provider, Result};

pub use mock::MockEmbedder;
pub use openai::{estimate_tokens, split_batches, OpenAiEmbedder};

// Re-export the Embedder trait for convenience
pub use bard_core::Embedder;

/// Build the embedder selected by `config.backend`.
pub fn build_embedder(config: &EmbeddingConfig, llm: &LlmConfig, keys: &ApiKeys) -> Result<Arc<dyn Embedder>> {
    match config.backend.as_str() {
        "openai" => {
            let key = keys.for_provider(Provider::OpenAi)?;
            Ok(Arc::new(OpenAiEmbedder::new(key, config, &llm.openai_base_url)))
        }
        "mock" => Ok(Arc::new(MockEmbedder::with_config(config.dimension, 8192))),
        other => Err(BardError::config(format!(
            "Unknown embedding backend '{}', expected 'openai' or 'mock'",
            other
        ))),
    }
}
