//! Configuration types for bard.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{BardError, Result};
use crate::types::Provider;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BardConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Embedding configuration.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Remote model endpoints.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Retrieval configuration.
    #[serde(default)]
    pub search: SearchConfig,

    /// Translator configuration.
    #[serde(default)]
    pub translator: TranslatorConfig,

    /// Playwright configuration.
    #[serde(default)]
    pub playwright: PlaywrightConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// SQLite cache size in KB (negative = KB, positive = pages).
    #[serde(default = "default_cache_size")]
    pub cache_size: i32,

    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u32,

    /// Rows written per transaction when loading a corpus.
    #[serde(default = "default_write_batch")]
    pub write_batch: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            cache_size: default_cache_size(),
            busy_timeout_ms: default_busy_timeout(),
            write_batch: default_write_batch(),
        }
    }
}

/// Embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// `openai` for the hosted model, `mock` for offline hash embeddings.
    #[serde(default = "default_embedding_backend")]
    pub backend: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Maximum texts per request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum estimated tokens per request.
    #[serde(default = "default_max_batch_tokens")]
    pub max_batch_tokens: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: default_embedding_backend(),
            model: default_embedding_model(),
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            max_batch_tokens: default_max_batch_tokens(),
        }
    }
}

/// Remote model endpoints and credentials file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_anthropic_url")]
    pub anthropic_base_url: String,

    #[serde(default = "default_openai_url")]
    pub openai_base_url: String,

    /// Dotenv-style file holding API keys.
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            anthropic_base_url: default_anthropic_url(),
            openai_base_url: default_openai_url(),
            env_file: default_env_file(),
            timeout_secs: default_request_timeout(),
        }
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results per level for a direct search.
    #[serde(default = "default_line_top_k")]
    pub line_top_k: usize,

    /// Results per level for a hybrid search.
    #[serde(default = "default_hybrid_top_k")]
    pub hybrid_top_k: usize,

    /// Keywords extracted for hybrid expansion.
    #[serde(default = "default_keyword_count")]
    pub keyword_count: usize,

    /// Results per level per keyword.
    #[serde(default = "default_keyword_results")]
    pub keyword_results: usize,

    /// RRF constant k.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            line_top_k: default_line_top_k(),
            hybrid_top_k: default_hybrid_top_k(),
            keyword_count: default_keyword_count(),
            keyword_results: default_keyword_results(),
            rrf_k: default_rrf_k(),
        }
    }
}

/// Search mode for translations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Normal,
    Hybrid,
}

impl SearchMode {
    pub fn is_hybrid(&self) -> bool {
        matches!(self, Self::Hybrid)
    }
}

/// Translator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default = "default_provider")]
    pub provider: Provider,

    #[serde(default = "default_model")]
    pub model: String,

    /// Known model names per provider.
    #[serde(default = "default_model_options")]
    pub model_options: HashMap<String, Vec<String>>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_search_mode")]
    pub default_search_mode: SearchMode,

    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Relevance (1.0) versus diversity (0.0) when ranking candidates.
    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f32,

    /// Translated scenes land in `{base_output_dir}/{translation_id}`.
    #[serde(default = "default_base_output_dir")]
    pub base_output_dir: PathBuf,

    #[serde(default = "default_sessions_dir")]
    pub translation_sessions_dir: PathBuf,

    #[serde(default = "default_used_map_dir")]
    pub used_map_dir: PathBuf,

    /// Ground-truth line corpus used by the validator.
    #[serde(default = "default_lines_path")]
    pub lines_path: PathBuf,

    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,

    #[serde(default = "default_true")]
    pub validation_enabled: bool,

    /// Seed for shuffling quote options between assembly attempts.
    #[serde(default = "default_seed")]
    pub random_seed: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            model_options: default_model_options(),
            temperature: default_temperature(),
            default_search_mode: default_search_mode(),
            default_top_k: default_top_k(),
            mmr_lambda: default_mmr_lambda(),
            base_output_dir: default_base_output_dir(),
            translation_sessions_dir: default_sessions_dir(),
            used_map_dir: default_used_map_dir(),
            lines_path: default_lines_path(),
            checkpoint_interval: default_checkpoint_interval(),
            validation_enabled: true,
            random_seed: default_seed(),
        }
    }
}

impl TranslatorConfig {
    /// Output directory for one translation session.
    pub fn output_dir(&self, translation_id: &str) -> PathBuf {
        self.base_output_dir.join(translation_id)
    }

    /// Whether the configured model is listed for its provider.
    pub fn is_known_model(&self) -> bool {
        self.model_options
            .get(self.provider.as_str())
            .map(|models| models.iter().any(|m| m == &self.model))
            .unwrap_or(false)
    }
}

/// Playwright configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaywrightConfig {
    #[serde(default = "default_provider")]
    pub provider: Provider,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_seed")]
    pub random_seed: u64,

    #[serde(default = "default_projects_dir")]
    pub projects_dir: PathBuf,

    /// Working directory for ad hoc (non-project) generation.
    #[serde(default = "default_play_dir")]
    pub base_output_dir: PathBuf,

    /// `short`, `medium` or `long`.
    #[serde(default = "default_length_option")]
    pub length_option: String,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            random_seed: default_seed(),
            projects_dir: default_projects_dir(),
            base_output_dir: default_play_dir(),
            length_option: default_length_option(),
        }
    }
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_cache_size() -> i32 {
    -64000
}

fn default_busy_timeout() -> u32 {
    30000
}

fn default_write_batch() -> usize {
    1000
}

fn default_embedding_backend() -> String {
    "openai".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn default_dimension() -> usize {
    3072
}

fn default_batch_size() -> usize {
    1500
}

fn default_max_batch_tokens() -> usize {
    600_000
}

fn default_anthropic_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_env_file() -> PathBuf {
    PathBuf::from(".env")
}

fn default_request_timeout() -> u64 {
    120
}

fn default_line_top_k() -> usize {
    3
}

fn default_hybrid_top_k() -> usize {
    5
}

fn default_keyword_count() -> usize {
    3
}

fn default_keyword_results() -> usize {
    3
}

fn default_rrf_k() -> u32 {
    60
}

fn default_provider() -> Provider {
    Provider::Anthropic
}

fn default_model() -> String {
    "claude-3-7-sonnet-20250219".to_string()
}

fn default_model_options() -> HashMap<String, Vec<String>> {
    let mut options = HashMap::new();
    options.insert(
        "anthropic".to_string(),
        vec![
            "claude-3-7-sonnet-20250219".to_string(),
            "claude-3-opus-20240229".to_string(),
            "claude-3-sonnet-20240229".to_string(),
        ],
    );
    options.insert(
        "openai".to_string(),
        vec![
            "gpt-4o".to_string(),
            "gpt-4-turbo".to_string(),
            "gpt-4".to_string(),
        ],
    );
    options
}

fn default_temperature() -> f32 {
    0.7
}

fn default_search_mode() -> SearchMode {
    SearchMode::Normal
}

fn default_top_k() -> usize {
    10
}

fn default_mmr_lambda() -> f32 {
    0.6
}

fn default_base_output_dir() -> PathBuf {
    PathBuf::from("outputs/translated_scenes")
}

fn default_sessions_dir() -> PathBuf {
    PathBuf::from("translation_sessions")
}

fn default_used_map_dir() -> PathBuf {
    PathBuf::from("data/used_maps")
}

fn default_lines_path() -> PathBuf {
    PathBuf::from("data/processed_chunks/lines.json")
}

fn default_checkpoint_interval() -> usize {
    5
}

fn default_seed() -> u64 {
    926656
}

fn default_projects_dir() -> PathBuf {
    PathBuf::from("data/play_projects")
}

fn default_play_dir() -> PathBuf {
    PathBuf::from("data/modern_play")
}

fn default_length_option() -> String {
    "medium".to_string()
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bard")
        .join("quotes.db")
}

impl BardConfig {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| BardError::config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load configuration from default paths.
    pub fn load_default() -> Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("bard").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        // Try local config
        let local_config = PathBuf::from("bard.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }

    /// Write the configuration as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| BardError::config(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// API keys for the hosted models.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
}

impl ApiKeys {
    pub const OPENAI_VAR: &'static str = "OPENAI_API_KEY";
    pub const ANTHROPIC_VAR: &'static str = "ANTHROPIC_API_KEY";

    /// Resolve keys from the process environment, falling back to a dotenv file.
    pub fn resolve(env_file: &Path) -> Self {
        let file_vars = std::fs::read_to_string(env_file)
            .map(|content| parse_env_file(&content))
            .unwrap_or_default();

        let lookup = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .or_else(|| file_vars.get(name).cloned())
        };

        Self {
            openai: lookup(Self::OPENAI_VAR),
            anthropic: lookup(Self::ANTHROPIC_VAR),
        }
    }

    /// Key for a provider, or a configuration error naming the missing variable.
    pub fn for_provider(&self, provider: Provider) -> Result<&str> {
        let (key, var) = match provider {
            Provider::Anthropic => (&self.anthropic, Self::ANTHROPIC_VAR),
            Provider::OpenAi => (&self.openai, Self::OPENAI_VAR),
        };
        key.as_deref()
            .ok_or_else(|| BardError::config(format!("{} is not set", var)))
    }
}

/// Parse `KEY=value` lines; `#` comments, `export` prefixes and quotes are handled.
pub fn parse_env_file(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            Some((key.trim().to_string(), value.to_string()))
        })
        .collect()
}
