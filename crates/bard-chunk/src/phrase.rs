//! Phrase chunker: punctuation-delimited phrases aligned to their source line.

use std::collections::HashSet;

use tracing::{debug, info};

use bard_core::{Chunker, Level, QuoteChunk, Result};

use crate::text::{normalize_quotes, tokens_syllables, tokenize};

const MIN_PHRASE_WORDS: usize = 3;
const MAJOR_BREAKS: &[char] = &['.', '!', '?', ';', ':'];

/// Splits line chunks into phrases at sentence punctuation and commas.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhraseChunker;

impl PhraseChunker {
    pub fn new() -> Self {
        Self
    }

    /// Split a line into raw phrases; punctuation stays on the preceding phrase.
    pub fn split_phrases(text: &str) -> Vec<String> {
        let mut major = Vec::new();
        let mut current = String::new();
        for ch in text.chars() {
            current.push(ch);
            if MAJOR_BREAKS.contains(&ch) {
                major.push(std::mem::take(&mut current));
            }
        }
        if !current.trim().is_empty() {
            major.push(current);
        }

        let mut phrases = Vec::new();
        for part in major {
            let pieces: Vec<&str> = part.split(',').collect();
            let last = pieces.len() - 1;
            for (j, piece) in pieces.iter().enumerate() {
                let cleaned = piece.trim();
                if cleaned.is_empty() {
                    continue;
                }
                if j < last {
                    phrases.push(format!("{},", cleaned));
                } else {
                    phrases.push(cleaned.to_string());
                }
            }
        }
        phrases
    }

    fn chunk_line(&self, line: &QuoteChunk) -> Vec<QuoteChunk> {
        let text = normalize_quotes(&line.text);
        let tokens = tokenize(&text);
        let pos = if line.pos.len() == tokens.len() {
            line.pos.clone()
        } else {
            vec![String::new(); tokens.len()]
        };

        let phrases = Self::split_phrases(&text);
        let total = phrases.len() as u32;
        let mut used: HashSet<usize> = HashSet::new();
        let mut chunks = Vec::new();

        for (idx, phrase) in phrases.iter().enumerate() {
            let words = tokenize(phrase);
            if words.len() < MIN_PHRASE_WORDS {
                continue;
            }

            let Some(start) = find_slice(&tokens, &words) else {
                debug!("Phrase not aligned in {}: {}", line.chunk_id, phrase);
                continue;
            };
            let end = start + words.len() - 1;
            if (start..=end).any(|i| used.contains(&i)) {
                debug!("Phrase overlaps earlier phrase in {}: {}", line.chunk_id, phrase);
                continue;
            }

            let mut chunk = QuoteChunk::new(
                format!("phrase_{}_{}", line.chunk_id, idx),
                line.title.clone(),
                line.act.as_deref(),
                line.scene.as_deref(),
                line.line,
                words.join(" "),
            );
            chunk.source_chunk_id = Some(line.chunk_id.clone());
            chunk.word_index = format!("{},{}", start, end);
            chunk.syllables = tokens_syllables(&words);
            chunk.pos = pos[start..=end].to_vec();
            chunk.mood = line.mood.clone();
            chunk.word_count = words.len() as u32;
            chunk.phrase_position = Some(idx as u32);
            chunk.total_phrases_in_line = Some(total);
            chunk.ends_with_punctuation = Some(phrase.ends_with(['.', '!', '?', ';', ':', ',']));

            used.extend(start..=end);
            chunks.push(chunk);
        }

        chunks
    }
}

impl Chunker for PhraseChunker {
    fn level(&self) -> Level {
        Level::Phrase
    }

    fn chunk_lines(&self, lines: &[QuoteChunk]) -> Result<Vec<QuoteChunk>> {
        let chunks: Vec<QuoteChunk> = lines.iter().flat_map(|line| self.chunk_line(line)).collect();
        info!("Created {} phrase chunks from {} lines", chunks.len(), lines.len());
        Ok(chunks)
    }
}

/// Index of the first occurrence of `needle` in `haystack`.
pub(crate) fn find_slice(haystack: &[String], needle: &[String]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
