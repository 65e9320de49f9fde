//! Text helpers shared by the chunkers, the retrieval engine and the validator.

use once_cell::sync::Lazy;
use regex::Regex;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w[\w']*\b").expect("valid word regex"));
static VOWEL_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[aeiouy]+").expect("valid vowel regex"));

/// Replace curly quotes and apostrophes with plain ASCII.
pub fn normalize_quotes(text: &str) -> String {
    text.replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
}

/// Split text into word tokens, keeping inner apostrophes.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Heuristic syllable count for a single word.
pub fn count_syllables(word: &str) -> u32 {
    if !word.chars().any(char::is_alphabetic) {
        return 0;
    }

    let word = word.to_lowercase();
    if word.chars().count() <= 3 {
        return 1;
    }

    let word = word.strip_suffix('e').unwrap_or(&word);
    (VOWEL_GROUP.find_iter(word).count() as u32).max(1)
}

/// Syllables across whitespace-separated words, skipping words without letters.
pub fn line_syllables(text: &str) -> u32 {
    text.split_whitespace().map(count_syllables).sum()
}

/// Syllables across a token list.
pub fn tokens_syllables<S: AsRef<str>>(tokens: &[S]) -> u32 {
    tokens.iter().map(|t| count_syllables(t.as_ref())).sum()
}

/// Lowercase alphanumerics only.
pub fn alphanumeric_lower(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Quotes normalized, lowercased, runs of whitespace collapsed.
pub fn normalize_for_compare(text: &str) -> String {
    normalize_quotes(text)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_quotes() {
        assert_eq!(
            normalize_quotes("\u{201C}Tis\u{2019} true\u{201D}"),
            "\"Tis' true\""
        );
    }

    #[test]
    fn test_tokenize_keeps_apostrophes() {
        assert_eq!(
            tokenize("O, 'tis a consummation devoutly to be wish'd."),
            vec!["O", "tis", "a", "consummation", "devoutly", "to", "be", "wish'd"]
        );
        assert!(tokenize("--").is_empty());
    }

    #[test]
    fn test_count_syllables() {
        assert_eq!(count_syllables("the"), 1);
        assert_eq!(count_syllables("love"), 1);
        assert_eq!(count_syllables("tomorrow"), 3);
        assert_eq!(count_syllables("beautiful"), 3);
        assert_eq!(count_syllables("rhythm"), 1);
        assert_eq!(count_syllables("--"), 0);
    }

    #[test]
    fn test_line_syllables() {
        assert_eq!(line_syllables("To be, or not to be"), 6);
        assert_eq!(line_syllables("  -- "), 0);
    }

    #[test]
    fn test_normalizers() {
        assert_eq!(alphanumeric_lower("Fair is foul, and FOUL is fair!"), "fairisfoulandfoulisfair");
        assert_eq!(normalize_for_compare("  Fair   is\tFoul "), "fair is foul");
    }
}
