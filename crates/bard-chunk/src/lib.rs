//! bard-chunk - Corpus chunkers
//!
//! Splits the plain-text complete works into quotable units at three
//! granularities:
//!
//! - [`LineChunker`]: one chunk per spoken line, tracking title, act, scene
//!   and the line number inside the scene.
//! - [`PhraseChunker`]: punctuation-delimited phrases of at least three words.
//! - [`FragmentChunker`]: non-overlapping windows of three to six words.
//!
//! # Example
//!
//! ```rust
//! use bard_chunk::{Chunker, LineChunker, PhraseChunker};
//!
//! let text = "THE TEMPEST\nACT I\nSCENE I\nWhat cares these roarers for the name of king?";
//! let mut chunker = LineChunker::new();
//! let lines = chunker.chunk_text(text);
//! let phrases = PhraseChunker::new().chunk_lines(&lines).unwrap();
//! assert_eq!(lines.len(), 1);
//! assert_eq!(phrases.len(), 1);
//! ```

mod corpus;
mod fragment;
mod line;
mod phrase;
pub mod text;

pub use corpus::CorpusFile;
pub use fragment::FragmentChunker;
pub use line::{DetectionSummary, LineChunker};
pub use phrase::PhraseChunker;

// Re-export types for convenience
pub use bard_core::{Chunker, Level, QuoteChunk};
