//! OpenAI embeddings client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use bard_core::{BardError, Embedder, EmbeddingConfig, Result};

/// Rough token estimate used for batching: words times 1.33.
pub fn estimate_tokens(text: &str) -> usize {
    (text.split_whitespace().count() as f64 * 1.33) as usize
}

/// Split texts into batches bounded by item count and estimated tokens.
///
/// A single text over the token budget still gets a batch of its own.
pub fn split_batches<'a>(texts: &[&'a str], max_items: usize, max_tokens: usize) -> Vec<Vec<&'a str>> {
    let mut batches = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0;

    for text in texts {
        let tokens = estimate_tokens(text);
        if !current.is_empty() && (current_tokens + tokens > max_tokens || current.len() >= max_items) {
            batches.push(std::mem::take(&mut current));
            current_tokens = 0;
        }
        current.push(*text);
        current_tokens += tokens;
    }

    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Hosted embedding model behind `POST {base_url}/embeddings`.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
    batch_size: usize,
    max_batch_tokens: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [&'a str],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(api_key: impl Into<String>, config: &EmbeddingConfig, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
            batch_size: config.batch_size.max(1),
            max_batch_tokens: config.max_batch_tokens.max(1),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingRequest {
            input: texts,
            model: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| BardError::http(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(String::from))
                .unwrap_or(body);
            return Err(BardError::embedding(format!("API error {}: {}", status, message)));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| BardError::embedding(format!("Parse error: {}", e)))?;

        if parsed.data.len() != texts.len() {
            return Err(BardError::embedding(format!(
                "Requested {} embeddings, received {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batches = split_batches(texts, self.batch_size, self.max_batch_tokens);
        info!("Splitting {} texts into {} batches for embedding", texts.len(), batches.len());

        let mut embeddings = Vec::with_capacity(texts.len());
        for (idx, batch) in batches.iter().enumerate() {
            debug!("Sending batch {}/{} with {} texts", idx + 1, batches.len(), batch.len());
            embeddings.extend(self.embed_batch(batch).await?);
        }
        Ok(embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BardError::embedding("Empty response"))
    }

    fn count_tokens(&self, text: &str) -> usize {
        estimate_tokens(text)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_tokens(&self) -> usize {
        8191
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    fn config(batch_size: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            dimension: 2,
            batch_size,
            ..Default::default()
        }
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("to be or not"), 5);
    }

    #[test]
    fn test_split_batches_by_count() {
        let texts = ["a", "b", "c", "d", "e"];
        let batches = split_batches(&texts, 2, 600_000);
        assert_eq!(batches, vec![vec!["a", "b"], vec!["c", "d"], vec!["e"]]);
    }

    #[test]
    fn test_split_batches_by_tokens() {
        // three words is 3 estimated tokens each
        let texts = ["one two three", "four five six", "seven eight nine"];
        let batches = split_batches(&texts, 1500, 7);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);

        // oversized single text is never dropped
        let batches = split_batches(&["one two three"], 1500, 1);
        assert_eq!(batches, vec![vec!["one two three"]]);
    }

    #[tokio::test]
    async fn test_embed_documents_batches_requests() {
        let mock_server = MockServer::start().await;

        let body = serde_json::json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        });

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/embeddings"))
            .and(matchers::header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(2)
            .mount(&mock_server)
            .await;

        let embedder = OpenAiEmbedder::new("test-key", &config(2), mock_server.uri());
        let embeddings = embedder
            .embed_documents(&["Fair is foul", "and foul is fair", "Hover through the fog", "and filthy air"])
            .await
            .unwrap();

        assert_eq!(embeddings.len(), 4);
        // sorted back into request order by index
        assert_eq!(embeddings[0], vec![1.0, 0.0]);
        assert_eq!(embeddings[1], vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_api_error_message() {
        let mock_server = MockServer::start().await;

        let error_body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/embeddings"))
            .respond_with(ResponseTemplate::new(401).set_body_string(error_body))
            .expect(1)
            .mount(&mock_server)
            .await;

        let embedder = OpenAiEmbedder::new("bad-key", &config(10), mock_server.uri());
        let err = embedder.embed_query("Exit, pursued by a bear").await.unwrap_err();
        assert_eq!(err.error_code(), "EMBEDDING_ERROR");
        assert!(err.to_string().contains("Incorrect API key provided"));
    }

    #[tokio::test]
    async fn test_empty_input_skips_request() {
        let embedder = OpenAiEmbedder::new("key", &config(10), "http://127.0.0.1:9");
        assert!(embedder.embed_documents(&[]).await.unwrap().is_empty());
    }
}
