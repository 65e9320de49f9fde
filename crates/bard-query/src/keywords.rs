//! Keyword extraction for hybrid search.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static WORD3: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w{3,}\b").expect("valid keyword regex"));

/// Common words never used as keywords.
pub const STOPWORDS: &[&str] = &[
    "the", "and", "that", "have", "for", "not", "with", "you", "this", "but", "his", "from", "they", "will",
    "would", "what", "all", "were", "when", "there", "their", "your", "been", "one", "who", "very", "had",
    "was", "are", "she", "her", "him", "has", "our", "them", "its", "about", "can", "out",
];

/// Up to `max` lowercase keywords of three or more characters, most
/// frequent first; ties keep their order of first appearance.
pub fn extract_keywords(line: &str, max: usize) -> Vec<String> {
    let lowered = line.to_lowercase();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for word in WORD3.find_iter(&lowered).map(|m| m.as_str()) {
        if STOPWORDS.contains(&word) {
            continue;
        }
        let count = counts.entry(word).or_insert(0);
        if *count == 0 {
            order.push(word);
        }
        *count += 1;
    }

    // stable sort keeps first-appearance order among equal counts
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.into_iter().take(max).map(String::from).collect()
}
