//! Candidate selection: filtering, MMR ranking and prompt option layout.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use bard_core::{parse_word_index, CandidateQuote, CandidateSet, Level};

use crate::used_map::UsedMap;

/// Options offered to the model per level.
const MAX_OPTIONS: usize = 5;

/// One quote offered to the assembler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptOption {
    pub temp_id: String,
    pub text: String,
    pub score: f32,
    pub form: Level,
    pub syllables: u32,
}

/// Prompt options grouped by level, in line, phrase, fragment order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptOptions {
    by_level: [Vec<PromptOption>; 3],
}

fn slot(level: Level) -> usize {
    match level {
        Level::Line => 0,
        Level::Phrase => 1,
        Level::Fragment => 2,
    }
}

impl PromptOptions {
    pub fn get(&self, level: Level) -> &[PromptOption] {
        &self.by_level[slot(level)]
    }

    pub fn get_mut(&mut self, level: Level) -> &mut Vec<PromptOption> {
        &mut self.by_level[slot(level)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PromptOption> {
        self.by_level.iter().flatten()
    }

    pub fn total(&self) -> usize {
        self.by_level.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Prompt options plus the candidate behind each temp id.
#[derive(Debug, Clone, Default)]
pub struct PromptPlan {
    pub options: PromptOptions,
    pub chunk_map: HashMap<String, CandidateQuote>,
}

/// Word statistics over a candidate list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiversityReport {
    pub word_overlap: f32,
    pub unique_words: usize,
    pub total_words: usize,
    pub avg_repetition: f32,
    pub diversity_score: f32,
    pub most_repeated: Vec<(String, usize)>,
}

/// Picks which retrieved quotes are offered to the model.
pub struct Selector<'a> {
    used_map: &'a UsedMap,
    mmr_lambda: f32,
}

impl<'a> Selector<'a> {
    pub fn new(used_map: &'a UsedMap, mmr_lambda: f32) -> Self {
        Self { used_map, mmr_lambda }
    }

    /// Drop proper nouns, malformed word indices and quotes already used.
    pub fn filter_candidates(&self, candidates: &[CandidateQuote]) -> Vec<CandidateQuote> {
        candidates
            .iter()
            .filter(|candidate| {
                let chunk = &candidate.chunk;
                if chunk.pos.iter().any(|tag| tag == "PROPN") {
                    debug!("Skipping candidate tagged as proper noun: {:?}", chunk.text);
                    return false;
                }
                if let Some(word) = capitalized_mid_sentence(&chunk.text) {
                    debug!("Skipping candidate due to capitalized word mid-sentence: {:?}", word);
                    return false;
                }
                if chunk.word_index.is_empty() {
                    return true;
                }
                let Some(range) = parse_word_index(&chunk.word_index) else {
                    warn!("Invalid word_index format: {:?}", chunk.word_index);
                    return false;
                };
                let indices: Vec<usize> = range.collect();
                let key = chunk.reference_key();
                if self.used_map.was_used(&key, &indices) {
                    debug!("Skipping candidate: already used {}:{:?}", key, indices);
                    return false;
                }
                true
            })
            .cloned()
            .collect()
    }

    /// Maximal marginal relevance over word-set Jaccard similarity.
    pub fn rank_candidates(&self, candidates: &[CandidateQuote], lambda: f32) -> Vec<CandidateQuote> {
        let mut remaining: Vec<CandidateQuote> = candidates.to_vec();
        remaining.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
        if remaining.len() <= 1 {
            return remaining;
        }

        let words: Vec<HashSet<String>> = remaining.iter().map(|c| word_set(c.text())).collect();
        let mut ranked_idx = vec![0usize];
        let mut left: Vec<usize> = (1..remaining.len()).collect();

        while !left.is_empty() {
            let mut best: Option<(usize, f32)> = None;
            for (pos, &i) in left.iter().enumerate() {
                let relevance = 1.0 / (1.0 + remaining[i].score);
                let max_similarity = ranked_idx
                    .iter()
                    .map(|&j| jaccard(&words[i], &words[j]))
                    .fold(0.0f32, f32::max);
                let mmr = lambda * relevance - (1.0 - lambda) * max_similarity;
                if best.map_or(true, |(_, score)| mmr > score) {
                    best = Some((pos, mmr));
                }
            }
            let Some((pos, _)) = best else { break };
            ranked_idx.push(left.remove(pos));
        }

        let mut slots: Vec<Option<CandidateQuote>> = remaining.into_iter().map(Some).collect();
        ranked_idx.into_iter().filter_map(|i| slots[i].take()).collect()
    }

    /// Per level: filter, rank, keep the top five as numbered options.
    pub fn prepare_prompt_structure(&self, candidates: &CandidateSet) -> PromptPlan {
        let mut plan = PromptPlan::default();

        for level in Level::ALL {
            let level_candidates = candidates.get(level);
            let filtered = self.filter_candidates(level_candidates);
            info!("{}: {} of {} candidate(s) passed filter", level, filtered.len(), level_candidates.len());
            if filtered.is_empty() {
                continue;
            }

            let ranked = self.rank_candidates(&filtered, self.mmr_lambda);
            let top: Vec<CandidateQuote> = ranked.into_iter().take(MAX_OPTIONS).collect();

            let before = analyze_diversity(&filtered[..filtered.len().min(MAX_OPTIONS)]);
            let after = analyze_diversity(&top);
            debug!(
                "Diversity for {}: before MMR {:.3}, after MMR {:.3}",
                level, before.diversity_score, after.diversity_score
            );

            for (i, candidate) in top.into_iter().enumerate() {
                let temp_id = format!("{}_{}", level.key(), i + 1);
                plan.options.get_mut(level).push(PromptOption {
                    temp_id: temp_id.clone(),
                    text: candidate.chunk.text.clone(),
                    score: candidate.score,
                    form: level,
                    syllables: candidate.chunk.syllables,
                });
                plan.chunk_map.insert(temp_id, candidate);
            }
        }

        plan
    }
}

/// First word after the opening one that starts uppercase (other than "I").
fn capitalized_mid_sentence(text: &str) -> Option<&str> {
    text.split_whitespace().skip(1).find(|word| {
        word.chars().next().is_some_and(char::is_uppercase)
            && word.chars().any(char::is_alphabetic)
            && word.to_lowercase() != "i"
    })
}

fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase().split_whitespace().map(String::from).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f32 / union as f32
}

/// Word repetition statistics over purely alphabetic words.
pub fn analyze_diversity(candidates: &[CandidateQuote]) -> DiversityReport {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut total_words = 0;

    for candidate in candidates {
        for word in candidate.text().split_whitespace() {
            if !word.chars().all(char::is_alphabetic) {
                continue;
            }
            let word = word.to_lowercase();
            total_words += 1;
            let count = counts.entry(word.clone()).or_insert(0);
            if *count == 0 {
                order.push(word);
            }
            *count += 1;
        }
    }

    let unique_words = counts.len();
    if total_words == 0 {
        return DiversityReport::default();
    }

    let repeated = counts.values().filter(|&&c| c > 1).count();
    let mut most_repeated: Vec<(String, usize)> = order
        .into_iter()
        .filter_map(|w| {
            let c = counts[&w];
            (c > 1).then_some((w, c))
        })
        .collect();
    most_repeated.sort_by(|a, b| b.1.cmp(&a.1));
    most_repeated.truncate(5);

    DiversityReport {
        word_overlap: repeated as f32 / unique_words as f32,
        unique_words,
        total_words,
        avg_repetition: total_words as f32 / unique_words as f32,
        diversity_score: unique_words as f32 / total_words as f32,
        most_repeated,
    }
}
