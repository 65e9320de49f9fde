//! Core domain types for bard.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::BardError;

/// Granularity of a quote in the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Line,
    Phrase,
    Fragment,
}

impl Level {
    /// All levels, in prompt order.
    pub const ALL: [Level; 3] = [Level::Line, Level::Phrase, Level::Fragment];

    /// Collection name in the quote store.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Line => "lines",
            Self::Phrase => "phrases",
            Self::Fragment => "fragments",
        }
    }

    /// Key used for candidate groups and prompt temp ids.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Phrase => "phrases",
            Self::Fragment => "fragments",
        }
    }

    /// Chunk type recorded in corpus files.
    pub fn chunk_type(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Phrase => "phrase",
            Self::Fragment => "fragment",
        }
    }
}

impl FromStr for Level {
    type Err = BardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "line" | "lines" => Ok(Self::Line),
            "phrase" | "phrases" => Ok(Self::Phrase),
            "fragment" | "fragments" => Ok(Self::Fragment),
            other => Err(BardError::invalid_argument(format!("unknown level: {}", other))),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.collection())
    }
}

/// A single quote in the corpus: a whole line, a phrase, or a fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteChunk {
    pub chunk_id: String,

    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub act: Option<String>,

    #[serde(default)]
    pub scene: Option<String>,

    /// Line number inside the current scene (1-based).
    pub line: u32,

    pub text: String,

    /// Inclusive token range within the source line, "start,end".
    #[serde(default)]
    pub word_index: String,

    #[serde(default)]
    pub syllables: u32,

    /// Part-of-speech tag per token; empty strings when unknown.
    #[serde(rename = "POS", default)]
    pub pos: Vec<String>,

    #[serde(default = "default_mood")]
    pub mood: String,

    #[serde(default)]
    pub word_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_chunk_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phrase_position: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_phrases_in_line: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_with_punctuation: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment_position: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_fragments_in_line: Option<u32>,
}

fn default_title() -> String {
    "Unknown".to_string()
}

fn default_mood() -> String {
    "neutral".to_string()
}

impl QuoteChunk {
    /// Create a chunk with the given location and text; counts are left at zero.
    pub fn new(
        chunk_id: impl Into<String>,
        title: impl Into<String>,
        act: Option<&str>,
        scene: Option<&str>,
        line: u32,
        text: impl Into<String>,
    ) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            title: title.into(),
            act: act.map(String::from),
            scene: scene.map(String::from),
            line,
            text: text.into(),
            word_index: String::new(),
            syllables: 0,
            pos: Vec::new(),
            mood: default_mood(),
            word_count: 0,
            source_chunk_id: None,
            phrase_position: None,
            total_phrases_in_line: None,
            ends_with_punctuation: None,
            fragment_position: None,
            total_fragments_in_line: None,
        }
    }

    /// Key identifying the source line of this quote.
    pub fn reference_key(&self) -> String {
        reference_key(&self.title, self.act.as_deref(), self.scene.as_deref(), self.line)
    }

    /// Parsed token range, if the word index is well formed.
    pub fn word_range(&self) -> Option<RangeInclusive<usize>> {
        parse_word_index(&self.word_index)
    }

    /// Blake3 hash of the quote text, hex encoded.
    pub fn content_hash(&self) -> String {
        hex::encode(blake3::hash(self.text.as_bytes()).as_bytes())
    }
}

/// Build the `title|act|scene|line` key; missing parts render as `NULL`.
pub fn reference_key(title: &str, act: Option<&str>, scene: Option<&str>, line: u32) -> String {
    format!(
        "{}|{}|{}|{}",
        title,
        act.unwrap_or("NULL"),
        scene.unwrap_or("NULL"),
        line
    )
}

/// Parse a word index: `"s,e"` or `"s-e"` as an inclusive range, or a single index.
pub fn parse_word_index(word_index: &str) -> Option<RangeInclusive<usize>> {
    let trimmed = word_index.trim();
    for sep in [',', '-'] {
        if let Some((start, end)) = trimmed.split_once(sep) {
            let start: usize = start.trim().parse().ok()?;
            let end: usize = end.trim().parse().ok()?;
            return Some(start..=end);
        }
    }
    let single: usize = trimmed.parse().ok()?;
    Some(single..=single)
}

/// A retrieved quote with its distance to the query (lower is closer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateQuote {
    pub chunk: QuoteChunk,
    pub score: f32,
}

impl CandidateQuote {
    pub fn new(chunk: QuoteChunk, score: f32) -> Self {
        Self { chunk, score }
    }

    pub fn text(&self) -> &str {
        &self.chunk.text
    }
}

/// Retrieved candidates grouped by level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateSet {
    #[serde(default)]
    pub line: Vec<CandidateQuote>,
    #[serde(default)]
    pub phrases: Vec<CandidateQuote>,
    #[serde(default)]
    pub fragments: Vec<CandidateQuote>,
}

impl CandidateSet {
    pub fn get(&self, level: Level) -> &[CandidateQuote] {
        match level {
            Level::Line => &self.line,
            Level::Phrase => &self.phrases,
            Level::Fragment => &self.fragments,
        }
    }

    pub fn get_mut(&mut self, level: Level) -> &mut Vec<CandidateQuote> {
        match level {
            Level::Line => &mut self.line,
            Level::Phrase => &mut self.phrases,
            Level::Fragment => &mut self.fragments,
        }
    }

    /// Total number of candidates across levels.
    pub fn total(&self) -> usize {
        self.line.len() + self.phrases.len() + self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Best line-level candidate by score.
    pub fn best_line(&self) -> Option<&CandidateQuote> {
        self.line
            .iter()
            .min_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// How the candidates behind a translated line were retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SearchType {
    Hybrid,
    Standard,
}

/// Source location of a quote used in a translated line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub temp_id: String,
    pub title: String,
    #[serde(default)]
    pub act: Option<String>,
    #[serde(default)]
    pub scene: Option<String>,
    pub line: u32,
    #[serde(default = "default_word_index")]
    pub word_index: String,
}

fn default_word_index() -> String {
    "0,0".to_string()
}

impl Reference {
    /// Build a reference from a corpus chunk.
    pub fn from_chunk(temp_id: impl Into<String>, chunk: &QuoteChunk) -> Self {
        let word_index = if chunk.word_index.is_empty() {
            default_word_index()
        } else {
            chunk.word_index.clone()
        };
        Self {
            temp_id: temp_id.into(),
            title: chunk.title.clone(),
            act: chunk.act.clone(),
            scene: chunk.scene.clone(),
            line: chunk.line,
            word_index,
        }
    }

    pub fn reference_key(&self) -> String {
        reference_key(&self.title, self.act.as_deref(), self.scene.as_deref(), self.line)
    }

    /// Display form: `Title (act.scene.line)`.
    pub fn formatted(&self) -> String {
        format!(
            "{} ({}.{}.{})",
            self.title,
            self.act.as_deref().unwrap_or(""),
            self.scene.as_deref().unwrap_or(""),
            self.line
        )
    }
}

/// One modern line rendered in Shakespeare's words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedLine {
    pub text: String,
    pub temp_ids: Vec<String>,
    pub references: Vec<Reference>,
    #[serde(default)]
    pub original_modern_line: String,
    pub search_type: SearchType,
    #[serde(default)]
    pub is_failsafe: bool,
}

/// Hosted model vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }
}

impl FromStr for Provider {
    type Err = BardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" | "gpt" => Ok(Self::OpenAi),
            other => Err(BardError::config(format!("unknown model provider: {}", other))),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single-turn request to a chat model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// System prompt; sent only to providers that take one per request.
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens,
            temperature,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Statistics about the quote store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub lines: u64,
    pub phrases: u64,
    pub fragments: u64,
    pub embeddings: u64,
    pub dimension: usize,
    pub storage_bytes: u64,
    pub vector_index: bool,
}

impl StoreStats {
    pub fn total_quotes(&self) -> u64 {
        self.lines + self.phrases + self.fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(Level::Line.collection(), "lines");
        assert_eq!(Level::Line.key(), "line");
        assert_eq!(Level::Fragment.chunk_type(), "fragment");
        assert_eq!("phrases".parse::<Level>().unwrap(), Level::Phrase);
        assert!("stanza".parse::<Level>().is_err());
    }

    #[test]
    fn test_reference_key_renders_null() {
        assert_eq!(
            reference_key("THE TEMPEST", Some("I"), None, 4),
            "THE TEMPEST|I|NULL|4"
        );
        let chunk = QuoteChunk::new("chunk_1", "CYMBELINE", Some("II"), Some("III"), 7, "Hark");
        assert_eq!(chunk.reference_key(), "CYMBELINE|II|III|7");
    }

    #[test]
    fn test_parse_word_index() {
        assert_eq!(parse_word_index("2,5"), Some(2..=5));
        assert_eq!(parse_word_index("2-5"), Some(2..=5));
        assert_eq!(parse_word_index("3"), Some(3..=3));
        assert_eq!(parse_word_index("a,b"), None);
        assert_eq!(parse_word_index(""), None);
    }

    #[test]
    fn test_chunk_json_field_names() {
        let json = r#"{
            "chunk_id": "chunk_9",
            "title": "THE TRAGEDY OF MACBETH",
            "line": 3,
            "act": "I",
            "scene": null,
            "text": "Fair is foul, and foul is fair",
            "word_index": "0,6",
            "syllables": 7,
            "POS": ["ADJ", "AUX", "ADJ", "CCONJ", "ADJ", "AUX", "ADJ"],
            "mood": "neutral",
            "word_count": 7
        }"#;
        let chunk: QuoteChunk = serde_json::from_str(json).unwrap();
        assert_eq!(chunk.pos.len(), 7);
        assert_eq!(chunk.scene, None);
        assert_eq!(chunk.word_range(), Some(0..=6));

        let back = serde_json::to_value(&chunk).unwrap();
        assert!(back.get("POS").is_some());
        assert!(back.get("phrase_position").is_none());
    }

    #[test]
    fn test_reference_formatting() {
        let chunk = QuoteChunk::new("chunk_2", "THE TEMPEST", Some("III"), Some("II"), 12, "Be not afeard");
        let reference = Reference::from_chunk("line_1", &chunk);
        assert_eq!(reference.word_index, "0,0");
        assert_eq!(reference.formatted(), "THE TEMPEST (III.II.12)");
    }

    #[test]
    fn test_candidate_set_best_line() {
        let mut set = CandidateSet::default();
        let a = QuoteChunk::new("a", "T", None, None, 1, "far");
        let b = QuoteChunk::new("b", "T", None, None, 2, "near");
        set.line.push(CandidateQuote::new(a, 0.8));
        set.line.push(CandidateQuote::new(b, 0.1));
        assert_eq!(set.total(), 2);
        assert_eq!(set.best_line().unwrap().chunk.chunk_id, "b");
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("Anthropic".parse::<Provider>().unwrap(), Provider::Anthropic);
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert!("cohere".parse::<Provider>().is_err());
    }
}
