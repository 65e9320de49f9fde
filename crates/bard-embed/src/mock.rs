//! Deterministic offline embedder.

use async_trait::async_trait;

use bard_core::{BardError, Embedder, Result};

/// Hash-based embedder; equal texts always map to the same unit vector.
pub struct MockEmbedder {
    dimension: usize,
    max_tokens: usize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            dimension: 3072,
            max_tokens: 8192,
        }
    }

    pub fn with_config(dimension: usize, max_tokens: usize) -> Self {
        Self { dimension, max_tokens }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut bytes = vec![0u8; self.dimension * 2];
        blake3::Hasher::new().update(text.as_bytes()).finalize_xof().fill(&mut bytes);
        let mut embedding: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]) as f32 / u16::MAX as f32 - 0.5)
            .collect();
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }
        embedding
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BardError::embedding("Empty embedding batch"))
    }

    fn count_tokens(&self, text: &str) -> usize {
        crate::estimate_tokens(text)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_tokens(&self) -> usize {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedder() {
        let embedder = MockEmbedder::with_config(64, 8192);

        let texts = ["Now is the winter of our discontent", "Made glorious summer by this sun of York"];
        let embeddings = embedder.embed_documents(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), 64);
        assert_ne!(embeddings[0], embeddings[1]);

        let norm: f32 = embeddings[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_deterministic_embeddings() {
        let embedder = MockEmbedder::new();
        let e1 = embedder.embed_query("consistent input").await.unwrap();
        let e2 = embedder.embed_query("consistent input").await.unwrap();
        assert_eq!(e1, e2);
        assert_eq!(e1.len(), 3072);
    }

    #[tokio::test]
    async fn test_embeddings_follow_blake3() {
        let embedder = MockEmbedder::with_config(16, 8192);
        let embedding = embedder.embed_query("Exit, pursued by a bear").await.unwrap();

        let mut bytes = [0u8; 32];
        blake3::Hasher::new().update(b"Exit, pursued by a bear").finalize_xof().fill(&mut bytes);
        let first = u16::from_le_bytes([bytes[0], bytes[1]]) as f32 / u16::MAX as f32 - 0.5;
        let second = u16::from_le_bytes([bytes[2], bytes[3]]) as f32 / u16::MAX as f32 - 0.5;
        // same direction as the raw hash values
        assert!((embedding[0] * second - embedding[1] * first).abs() < 1e-5);
        assert_eq!(embedding[0].signum(), first.signum());
    }

    #[test]
    fn test_count_tokens() {
        let embedder = MockEmbedder::new();
        assert_eq!(embedder.count_tokens("one two three"), 3);
    }
}
