//! Retrieval engine over the three quote levels.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use bard_chunk::{FragmentChunker, PhraseChunker};
use bard_core::{CandidateQuote, CandidateSet, Chunker, Embedder, Level, QuoteChunk, QuoteStore, Result, SearchConfig};

use crate::fusion::fuse_candidates;
use crate::keywords::extract_keywords;

/// Searches the quote store for material matching a modern line.
pub struct SearchEngine<S: ?Sized, E: ?Sized> {
    store: Arc<S>,
    embedder: Arc<E>,
    config: SearchConfig,
}

impl<S, E> SearchEngine<S, E>
where
    S: QuoteStore + ?Sized,
    E: Embedder + ?Sized,
{
    pub fn new(store: Arc<S>, embedder: Arc<E>, config: SearchConfig) -> Self {
        Self { store, embedder, config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Direct search: the whole line, its phrases and its fragments, each
    /// against its own level.
    pub async fn search_line(&self, line: &str, top_k: usize) -> Result<CandidateSet> {
        let start = Instant::now();
        info!("Searching for: {:?}", line);

        let [lines, phrases, fragments] = self.direct_lists(line, top_k).await?;
        let candidates = CandidateSet {
            line: lines.into_iter().flatten().collect(),
            phrases: phrases.into_iter().flatten().collect(),
            fragments: fragments.into_iter().flatten().collect(),
        };

        debug!(
            "Direct search: {} lines, {} phrases, {} fragments in {:?}",
            candidates.line.len(),
            candidates.phrases.len(),
            candidates.fragments.len(),
            start.elapsed()
        );
        Ok(candidates)
    }

    /// Direct search widened with keyword neighbours, fused per level.
    pub async fn hybrid_search(&self, line: &str, top_k: usize) -> Result<CandidateSet> {
        info!("Performing hybrid search for: {:?}", line);

        let start = Instant::now();
        let direct = self.direct_lists(line, top_k).await?;

        let keywords = extract_keywords(line, self.config.keyword_count);
        let mut keyword_lists: [Vec<Vec<CandidateQuote>>; 3] = Default::default();
        if !keywords.is_empty() {
            info!("Extracted keywords for search: {:?}", keywords);
            for (i, level) in Level::ALL.iter().enumerate() {
                keyword_lists[i] = self
                    .search_texts(*level, &keywords, self.config.keyword_results)
                    .await?;
            }
        }

        let k = self.config.rrf_k as f32;
        let mut fused = CandidateSet::default();
        for (i, (level, mut lists)) in Level::ALL.iter().zip(direct).enumerate() {
            lists.append(&mut keyword_lists[i]);
            *fused.get_mut(*level) = fuse_candidates(lists, k);
        }

        info!(
            "Hybrid search results: {} lines, {} phrases, {} fragments in {:?}",
            fused.line.len(),
            fused.phrases.len(),
            fused.fragments.len(),
            start.elapsed()
        );
        Ok(fused)
    }

    /// Candidates for the translator; a failing hybrid search yields an empty set.
    pub async fn retrieve_all(&self, line: &str, top_k: usize, hybrid: bool) -> Result<CandidateSet> {
        if !hybrid {
            return self.search_line(line, top_k).await;
        }

        match self.hybrid_search(line, top_k).await {
            Ok(candidates) => Ok(candidates),
            Err(e) => {
                error!("Error in hybrid search: {}", e);
                Ok(CandidateSet::default())
            }
        }
    }

    /// Per-level result lists of the direct search, one list per query text.
    async fn direct_lists(&self, line: &str, top_k: usize) -> Result<[Vec<Vec<CandidateQuote>>; 3]> {
        let input = QuoteChunk::new("input_line", "Unknown", None, None, 0, line);
        let phrases: Vec<String> = PhraseChunker::new()
            .chunk_lines(std::slice::from_ref(&input))?
            .into_iter()
            .map(|c| c.text)
            .collect();
        let fragments: Vec<String> = FragmentChunker::new()
            .chunk_lines(std::slice::from_ref(&input))?
            .into_iter()
            .map(|c| c.text)
            .collect();

        let line_texts = [line.to_string()];
        let (lines, phrases, fragments) = tokio::join!(
            self.search_texts(Level::Line, &line_texts, top_k),
            self.search_texts(Level::Phrase, &phrases, top_k),
            self.search_texts(Level::Fragment, &fragments, top_k),
        );
        Ok([lines?, phrases?, fragments?])
    }

    /// Embed `texts` in one batch and query `level` once per text.
    async fn search_texts(&self, level: Level, texts: &[String], n: usize) -> Result<Vec<Vec<CandidateQuote>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_documents(&refs).await?;

        let mut results = Vec::with_capacity(embeddings.len());
        for embedding in &embeddings {
            results.push(self.store.query(level, embedding, n).await?);
        }
        debug!("{} queries against {} returned {} results", texts.len(), level, results.iter().map(Vec::len).sum::<usize>());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bard_embed::MockEmbedder;
    use bard_store::SqliteStore;

    const DIM: usize = 32;

    async fn engine_with(lines: &[&str], phrases: &[&str], fragments: &[&str]) -> SearchEngine<SqliteStore, MockEmbedder> {
        let store = Arc::new(SqliteStore::open_memory(DIM).unwrap());
        let embedder = Arc::new(MockEmbedder::with_config(DIM, 8192));

        for (level, texts) in [(Level::Line, lines), (Level::Phrase, phrases), (Level::Fragment, fragments)] {
            let chunks: Vec<QuoteChunk> = texts
                .iter()
                .enumerate()
                .map(|(i, t)| QuoteChunk::new(format!("{}_{}", level.key(), i), "THE TEMPEST", Some("IV"), Some("I"), i as u32 + 1, *t))
                .collect();
            let embeddings = embedder.embed_documents(texts).await.unwrap();
            store.upsert_chunks(level, &chunks, &embeddings).await.unwrap();
        }

        SearchEngine::new(store, embedder, SearchConfig::default())
    }

    #[tokio::test]
    async fn test_search_line_exact_match_first() {
        let engine = engine_with(
            &["We are such stuff as dreams are made on", "Our revels now are ended"],
            &["such stuff as dreams are made on"],
            &["rounded with a sleep"],
        )
        .await;

        let results = engine.search_line("We are such stuff as dreams are made on", 2).await.unwrap();
        assert_eq!(results.line.len(), 2);
        assert_eq!(results.line[0].text(), "We are such stuff as dreams are made on");
        assert!(results.line[0].score.abs() < 1e-4);
        // one phrase and two fragments from the input line, each querying its level
        assert_eq!(results.phrases.len(), 1);
        assert_eq!(results.fragments.len(), 2);
    }

    #[tokio::test]
    async fn test_short_line_searches_lines_only() {
        let engine = engine_with(&["Our revels now are ended"], &["our little life"], &["is rounded"]).await;
        let results = engine.search_line("Sleep now", 3).await.unwrap();
        assert_eq!(results.line.len(), 1);
        assert!(results.phrases.is_empty());
        assert!(results.fragments.is_empty());
    }

    #[tokio::test]
    async fn test_hybrid_search_dedupes() {
        let engine = engine_with(
            &["Our revels now are ended", "These our actors were all spirits", "And like the baseless fabric"],
            &["melted into air"],
            &["the great globe itself"],
        )
        .await;

        let results = engine.hybrid_search("The dreams dreams of actors fade", 5).await.unwrap();

        // three lines in the store; direct and keyword hits overlap
        assert_eq!(results.line.len(), 3);
        let mut ids: Vec<_> = results.line.iter().map(|c| c.chunk.chunk_id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert_eq!(results.phrases.len(), 1);
        assert_eq!(results.fragments.len(), 1);
    }

    #[tokio::test]
    async fn test_retrieve_all_direct() {
        let engine = engine_with(&["Our revels now are ended"], &[], &[]).await;
        let results = engine.retrieve_all("Our revels now are ended", 3, false).await.unwrap();
        assert_eq!(results.line.len(), 1);
        assert!(results.phrases.is_empty());
    }
}
