//! OpenAI Chat Completions client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use bard_core::{BardError, ChatModel, ChatRequest, Provider, Result};

use crate::api_error_message;

/// Chat completions client. `max_tokens` is left to the server default.
pub struct OpenAiModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_key, model, "https://api.openai.com/v1")
    }

    pub fn with_client(
        client: reqwest::Client,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiModel {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(Message {
                role: "system",
                content: system,
            });
        }
        messages.push(Message {
            role: "user",
            content: &request.prompt,
        });

        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: request.temperature,
        };

        debug!("Calling OpenAI model {}", self.model);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| BardError::http(format!("OpenAI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(BardError::llm(
                "openai",
                format!("API error {}: {}", status, api_error_message(text)),
            ));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| BardError::llm("openai", format!("Parse error: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| BardError::llm("openai", "Response has no choices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    fn model(server: &MockServer) -> OpenAiModel {
        OpenAiModel::with_client(reqwest::Client::new(), "sk-test", "gpt-4o", &server.uri())
    }

    #[tokio::test]
    async fn test_complete_success() {
        let mock_server = MockServer::start().await;

        let response_body = serde_json::json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Parting is such sweet sorrow"},
                "finish_reason": "stop"
            }]
        });

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/chat/completions"))
            .and(matchers::header("Authorization", "Bearer sk-test"))
            .and(matchers::body_partial_json(serde_json::json!({
                "model": "gpt-4o",
                "messages": [
                    {"role": "system", "content": "You are a playwright assistant."},
                    {"role": "user", "content": "Say goodbye"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .expect(1)
            .mount(&mock_server)
            .await;

        let request = ChatRequest::new("Say goodbye", 1024, 0.7).with_system("You are a playwright assistant.");
        let reply = model(&mock_server).complete(&request).await.unwrap();
        assert_eq!(reply, "Parting is such sweet sorrow");
    }

    #[tokio::test]
    async fn test_rate_limit_error() {
        let mock_server = MockServer::start().await;

        let error_body = r#"{"error": {"message": "Rate limit exceeded", "type": "rate_limit_error"}}"#;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string(error_body))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = model(&mock_server)
            .complete(&ChatRequest::new("Hello", 16, 0.0))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Rate limit exceeded"));
        assert!(err.to_string().contains("openai"));
    }

    #[tokio::test]
    async fn test_no_choices() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&mock_server)
            .await;

        let err = model(&mock_server)
            .complete(&ChatRequest::new("Hello", 16, 0.0))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "LLM_ERROR");
    }
}
