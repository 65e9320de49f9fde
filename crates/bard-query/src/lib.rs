//! bard-query - Multi-level quote retrieval
//!
//! A modern line is searched at three granularities: the whole line against
//! stored lines, its phrases against stored phrases, and its fragments
//! against stored fragments. Hybrid search adds nearest neighbours of the
//! line's most frequent keywords and merges everything with Reciprocal Rank
//! Fusion.
//!
//! # Example
//!
//! ```rust,ignore
//! use bard_query::SearchEngine;
//! use std::sync::Arc;
//!
//! let engine = SearchEngine::new(Arc::new(store), Arc::new(embedder), SearchConfig::default());
//! let candidates = engine.retrieve_all("I can't sleep at night", 5, true).await?;
//! ```

mod engine;
mod fusion;
mod keywords;

pub use engine::SearchEngine;
pub use fusion::{fuse_candidates, reciprocal_rank_fusion};
pub use keywords::{extract_keywords, STOPWORDS};

// Re-export for convenience
pub use bard_core::{CandidateQuote, CandidateSet};
