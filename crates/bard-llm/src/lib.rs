//! bard-llm - Hosted chat model clients
//!
//! Both providers sit behind the [`ChatModel`] trait so the translator and
//! the playwright pipeline can switch between them from configuration.
//! [`ScriptedModel`] replays canned replies for tests and dry runs.

mod anthropic;
pub mod extract;
mod openai;
mod scripted;

use std::sync::Arc;
use std::time::Duration;

use bard_core::{ApiKeys, BardError, LlmConfig, Provider, Result};

pub use anthropic::AnthropicModel;
pub use openai::OpenAiModel;
pub use scripted::ScriptedModel;

// Re-export the ChatModel trait for convenience
pub use bard_core::ChatModel;

/// Build the client for `provider`; a missing API key is a configuration error.
pub fn build_model(
    provider: Provider,
    model: &str,
    keys: &ApiKeys,
    config: &LlmConfig,
) -> Result<Arc<dyn ChatModel>> {
    let key = keys.for_provider(provider)?;
    let client = http_client(config.timeout_secs)?;

    Ok(match provider {
        Provider::Anthropic => Arc::new(AnthropicModel::with_client(
            client,
            key,
            model,
            &config.anthropic_base_url,
        )),
        Provider::OpenAi => Arc::new(OpenAiModel::with_client(client, key, model, &config.openai_base_url)),
    })
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| BardError::http(format!("Failed to build HTTP client: {}", e)))
}

/// Pull `error.message` out of an API error body, else return the body.
pub(crate) fn api_error_message(body: String) -> String {
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_model_requires_key() {
        let err = build_model(
            Provider::Anthropic,
            "claude-3-7-sonnet-20250219",
            &ApiKeys::default(),
            &LlmConfig::default(),
        )
        .err()
        .unwrap();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_build_model_picks_provider() {
        let keys = ApiKeys {
            openai: Some("sk-test".to_string()),
            anthropic: None,
        };
        let model = build_model(Provider::OpenAi, "gpt-4o", &keys, &LlmConfig::default()).unwrap();
        assert_eq!(model.provider(), Provider::OpenAi);
        assert_eq!(model.model(), "gpt-4o");
    }

    #[test]
    fn test_api_error_message() {
        assert_eq!(
            api_error_message(r#"{"error": {"message": "overloaded"}}"#.to_string()),
            "overloaded"
        );
        assert_eq!(api_error_message("Bad Gateway".to_string()), "Bad Gateway");
    }
}
