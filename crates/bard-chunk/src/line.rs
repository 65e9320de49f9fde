//! Line chunker.
//!
//! Emits one chunk per spoken line. Line numbering restarts at every new
//! title, act and scene, so a chunk can be cited as "line 28 of Act II,
//! Scene II of Macbeth".

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use bard_core::QuoteChunk;

use crate::text::{normalize_quotes, tokens_syllables, tokenize};

static ACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^ACT\s+(INDUCTION|[IVX]+)").expect("valid act regex"));
static SCENE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^SCENE\s+(PROLOGUE|[IVX]+|\d+)").expect("valid scene regex"));
static SONNET_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)$").expect("valid sonnet regex"));
static ALL_CAPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z\s.,;:!?]+$").expect("valid all-caps regex"));

/// Titles recognised as the start of a new work, uppercased.
const KNOWN_TITLES: &[&str] = &[
    "THE SONNETS",
    "ALL'S WELL THAT ENDS WELL",
    "THE TRAGEDY OF ANTONY AND CLEOPATRA",
    "AS YOU LIKE IT",
    "THE COMEDY OF ERRORS",
    "THE TRAGEDY OF CORIOLANUS",
    "CYMBELINE",
    "THE TRAGEDY OF HAMLET, PRINCE OF DENMARK",
    "THE FIRST PART OF KING HENRY THE FOURTH",
    "THE SECOND PART OF KING HENRY THE FOURTH",
    "THE LIFE OF KING HENRY THE FIFTH",
    "THE FIRST PART OF HENRY THE SIXTH",
    "THE SECOND PART OF KING HENRY THE SIXTH",
    "THE THIRD PART OF KING HENRY THE SIXTH",
    "KING HENRY THE EIGHTH",
    "THE LIFE AND DEATH OF KING JOHN",
    "THE TRAGEDY OF JULIUS CAESAR",
    "THE TRAGEDY OF KING LEAR",
    "LOVE'S LABOUR'S LOST",
    "THE TRAGEDY OF MACBETH",
    "MEASURE FOR MEASURE",
    "THE MERCHANT OF VENICE",
    "THE MERRY WIVES OF WINDSOR",
    "A MIDSUMMER NIGHT'S DREAM",
    "MUCH ADO ABOUT NOTHING",
    "THE TRAGEDY OF OTHELLO, THE MOOR OF VENICE",
    "PERICLES, PRINCE OF TYRE",
    "KING RICHARD THE SECOND",
    "KING RICHARD THE THIRD",
    "THE TRAGEDY OF ROMEO AND JULIET",
    "THE TAMING OF THE SHREW",
    "THE TEMPEST",
    "THE LIFE OF TIMON OF ATHENS",
    "THE TRAGEDY OF TITUS ANDRONICUS",
    "TROILUS AND CRESSIDA",
    "TWELFTH NIGHT; OR, WHAT YOU WILL",
    "THE TWO GENTLEMEN OF VERONA",
    "THE TWO NOBLE KINSMEN",
    "A WINTER'S TALE",
    "A LOVER'S COMPLAINT",
    "THE PASSIONATE PILGRIM",
    "THE PHOENIX AND THE TURTLE",
    "THE RAPE OF LUCRECE",
    "VENUS AND ADONIS",
];

/// Titles, acts and scenes seen during the last chunking pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionSummary {
    /// title -> act -> scenes
    pub titles: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
}

impl DetectionSummary {
    fn add_title(&mut self, title: &str) {
        self.titles.insert(title.to_string(), BTreeMap::new());
    }

    fn add_act(&mut self, title: &str, act: &str) {
        if let Some(acts) = self.titles.get_mut(title) {
            acts.entry(act.to_string()).or_default();
        }
    }

    fn add_scene(&mut self, title: &str, act: Option<&str>, scene: &str) {
        let Some(act) = act else { return };
        if let Some(scenes) = self.titles.get_mut(title).and_then(|acts| acts.get_mut(act)) {
            scenes.insert(scene.to_string());
        }
    }

    /// Log the summary at info level.
    pub fn log(&self) {
        info!("Detected {} titles", self.titles.len());
        for (title, acts) in &self.titles {
            let names: Vec<&str> = acts.keys().map(String::as_str).collect();
            info!("{}: acts [{}]", title, names.join(", "));
            for (act, scenes) in acts {
                let scenes: Vec<&str> = scenes.iter().map(String::as_str).collect();
                debug!("  act {} scenes [{}]", act, scenes.join(", "));
            }
        }
    }
}

/// Chunker producing one [`QuoteChunk`] per spoken line.
#[derive(Debug, Default)]
pub struct LineChunker {
    chunks: Vec<QuoteChunk>,
    summary: DetectionSummary,
}

impl LineChunker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `line` (any case) is a known title.
    pub fn is_title(line: &str) -> bool {
        let upper = line.to_uppercase();
        KNOWN_TITLES.contains(&upper.as_str())
    }

    /// Chunk raw text. The result is also retained for the lookup helpers.
    pub fn chunk_text(&mut self, text: &str) -> Vec<QuoteChunk> {
        info!("Chunking {} chars of text into lines", text.len());

        let mut title = "Unknown".to_string();
        let mut act: Option<String> = None;
        let mut scene: Option<String> = None;
        let mut counter = 0u32;
        let mut line_index = 0u32;
        let mut chunks = Vec::new();
        self.summary = DetectionSummary::default();

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let line = normalize_quotes(line);

            if Self::is_title(&line) {
                info!("Detected title: {}", line);
                title = line;
                self.summary.add_title(&title);
                act = None;
                scene = None;
                line_index = 0;
                continue;
            }

            if let Some(caps) = ACT.captures(&line) {
                let value = caps[1].to_uppercase();
                debug!("Detected act {} in '{}'", value, title);
                self.summary.add_act(&title, &value);
                act = Some(value);
                scene = None;
                line_index = 0;
                continue;
            }

            if let Some(caps) = SCENE.captures(&line) {
                let value = caps[1].to_uppercase();
                debug!("Detected scene {} in act {:?} of '{}'", value, act, title);
                self.summary.add_scene(&title, act.as_deref(), &value);
                scene = Some(value);
                line_index = 0;
                continue;
            }

            if title.to_uppercase().contains("SONNETS") {
                if let Some(caps) = SONNET_NUMBER.captures(&line) {
                    let number = caps[1].to_string();
                    debug!("Detected sonnet {}", number);
                    self.summary.add_act(&title, &number);
                    act = Some(number);
                    scene = Some(String::new());
                    line_index = 0;
                    continue;
                }
            }

            if ALL_CAPS.is_match(&line) {
                debug!("Skipping structural line: {}", line);
                continue;
            }

            counter += 1;
            line_index += 1;

            let words = tokenize(&line);
            let word_count = words.len() as u32;

            if act.is_none() || scene.is_none() {
                warn!(
                    "Line with incomplete metadata: title='{}', act={:?}, scene={:?}, line={}",
                    title, act, scene, line_index
                );
            }

            let mut chunk = QuoteChunk::new(
                format!("chunk_{}", counter),
                title.clone(),
                act.as_deref(),
                scene.as_deref(),
                line_index,
                line.clone(),
            );
            chunk.word_index = format!("0,{}", word_count as i64 - 1);
            chunk.syllables = tokens_syllables(&words);
            chunk.pos = vec![String::new(); words.len()];
            chunk.word_count = word_count;
            chunks.push(chunk);
        }

        info!("Created {} line chunks", chunks.len());
        self.summary.log();
        self.chunks = chunks.clone();
        chunks
    }

    /// Chunks from the last pass.
    pub fn chunks(&self) -> &[QuoteChunk] {
        &self.chunks
    }

    /// Titles, acts and scenes from the last pass.
    pub fn summary(&self) -> &DetectionSummary {
        &self.summary
    }

    pub fn lines_by_act_scene(&self, act: &str, scene: &str) -> Vec<&QuoteChunk> {
        self.chunks
            .iter()
            .filter(|c| c.act.as_deref() == Some(act) && c.scene.as_deref() == Some(scene))
            .collect()
    }

    /// Up to `max_lines` consecutive chunks starting at `start`.
    pub fn dialogue_exchange(&self, start: usize, max_lines: usize) -> &[QuoteChunk] {
        if start >= self.chunks.len() {
            warn!("Invalid start index {} for {} chunks", start, self.chunks.len());
            return &[];
        }
        let end = (start + max_lines).min(self.chunks.len());
        &self.chunks[start..end]
    }

    /// Lines of a sonnet: act holds the sonnet number, scene is empty.
    pub fn sonnet_lines(&self, number: &str) -> Vec<&QuoteChunk> {
        self.lines_by_act_scene(number, "")
    }
}
