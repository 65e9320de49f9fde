//! Fragment chunker: non-overlapping word windows of three to six tokens.

use std::collections::{HashMap, HashSet};

use tracing::info;

use bard_core::{Chunker, Level, QuoteChunk, Result};

use crate::text::{normalize_quotes, tokens_syllables, tokenize};

/// Greedy sliding-window chunker.
#[derive(Debug, Clone, Copy)]
pub struct FragmentChunker {
    min_words: usize,
    max_words: usize,
}

impl Default for FragmentChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl FragmentChunker {
    pub fn new() -> Self {
        Self {
            min_words: 3,
            max_words: 6,
        }
    }

    fn chunk_line(&self, line: &QuoteChunk) -> Vec<QuoteChunk> {
        let text = normalize_quotes(&line.text);
        let tokens = tokenize(&text);
        let pos = if line.pos.len() == tokens.len() {
            line.pos.clone()
        } else {
            vec![String::new(); tokens.len()]
        };

        let mut used: HashSet<usize> = HashSet::new();
        let mut chunks = Vec::new();
        let mut i = 0;

        while i + self.min_words <= tokens.len() {
            for size in (self.min_words..=self.max_words).rev() {
                let end = i + size;
                if end > tokens.len() || (i..end).any(|idx| used.contains(&idx)) {
                    continue;
                }

                let words = &tokens[i..end];
                let position = chunks.len() as u32;
                let mut chunk = QuoteChunk::new(
                    format!("fragment_{}_{}", line.chunk_id, position),
                    line.title.clone(),
                    line.act.as_deref(),
                    line.scene.as_deref(),
                    line.line,
                    words.join(" "),
                );
                chunk.source_chunk_id = Some(line.chunk_id.clone());
                chunk.word_index = format!("{},{}", i, end - 1);
                chunk.syllables = tokens_syllables(words);
                chunk.pos = pos[i..end].to_vec();
                chunk.mood = line.mood.clone();
                chunk.word_count = size as u32;
                chunk.fragment_position = Some(position);

                used.extend(i..end);
                chunks.push(chunk);
                break;
            }
            i += 1;
        }

        chunks
    }
}

impl Chunker for FragmentChunker {
    fn level(&self) -> Level {
        Level::Fragment
    }

    fn chunk_lines(&self, lines: &[QuoteChunk]) -> Result<Vec<QuoteChunk>> {
        let mut chunks: Vec<QuoteChunk> = lines.iter().flat_map(|line| self.chunk_line(line)).collect();

        let mut per_line: HashMap<String, u32> = HashMap::new();
        for chunk in &chunks {
            *per_line.entry(chunk.reference_key()).or_default() += 1;
        }
        for chunk in &mut chunks {
            chunk.total_fragments_in_line = per_line.get(&chunk.reference_key()).copied();
        }

        info!("Created {} fragment chunks from {} lines", chunks.len(), lines.len());
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, line_no: u32, text: &str) -> QuoteChunk {
        QuoteChunk::new(id, "THE TRAGEDY OF HAMLET, PRINCE OF DENMARK", Some("III"), Some("I"), line_no, text)
    }

    #[test]
    fn test_windows() {
        let source = line("chunk_1", 56, "To be, or not to be, that is the question:");
        let chunks = FragmentChunker::new().chunk_lines(&[source]).unwrap();

        // 10 tokens: one window of six, then one of four
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "To be or not to be");
        assert_eq!(chunks[0].word_index, "0,5");
        assert_eq!(chunks[1].text, "that is the question");
        assert_eq!(chunks[1].word_index, "6,9");
        assert_eq!(chunks[1].chunk_id, "fragment_chunk_1_1");
        assert_eq!(chunks[1].fragment_position, Some(1));
        assert!(chunks.iter().all(|c| c.total_fragments_in_line == Some(2)));
    }

    #[test]
    fn test_trailing_pair_dropped() {
        // 8 tokens: six, then two left over which is below the minimum
        let source = line("chunk_2", 57, "Whether 'tis nobler in the mind to suffer");
        let chunks = FragmentChunker::new().chunk_lines(&[source]).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].word_count, 6);
    }

    #[test]
    fn test_short_line() {
        let chunks = FragmentChunker::new()
            .chunk_lines(&[line("chunk_3", 1, "Ay, there's")])
            .unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_totals_are_per_line() {
        let lines = vec![
            line("chunk_4", 1, "The slings and arrows of outrageous fortune, or to take arms"),
            line("chunk_5", 2, "Against a sea of troubles"),
        ];
        let chunks = FragmentChunker::new().chunk_lines(&lines).unwrap();
        let first: Vec<_> = chunks.iter().filter(|c| c.line == 1).collect();
        let second: Vec<_> = chunks.iter().filter(|c| c.line == 2).collect();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].total_fragments_in_line, Some(2));
        assert_eq!(second[0].total_fragments_in_line, Some(1));
    }
}
