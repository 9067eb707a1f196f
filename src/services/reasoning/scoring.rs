// Heuristic Scorer
// Stateless checks for "does this span look like reasoning", context scoring
// of individual pattern matches, and keyword extraction.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use super::patterns::{
    causal_family_re, code_like_re, connective_re, matched_types, reasoning_rules,
    reasoning_verb_re, sequential_family_re, stop_words,
};
use crate::models::{MatchPosition, PatternMatch};
use crate::services::text_processor::{char_window, count_words};

pub const MIN_REASONING_WORDS: usize = 10;
pub const SINGLE_TYPE_MIN_CHARS: usize = 100;

const CONTEXT_BASE: f64 = 0.5;
const CONTEXT_RADIUS_CHARS: usize = 100;
const CONTEXT_FAMILY_BONUS: f64 = 0.1;
const CONTEXT_LENGTH_BONUS: f64 = 0.1;
const CONTEXT_LONG_WINDOW: usize = 200;
const CONTEXT_VERY_LONG_WINDOW: usize = 400;
const CODE_PENALTY: f64 = 0.2;

const STREAM_BASE: f64 = 0.3;
const STREAM_INDICATOR_BONUS: f64 = 0.1;
const STREAM_QUESTION_BONUS: f64 = 0.1;
const STREAM_LENGTH_BONUS: f64 = 0.1;
const STREAM_LONG_CHARS: usize = 100;
const STREAM_VERY_LONG_CHARS: usize = 300;

const MIN_KEYWORD_CHARS: usize = 3;
const LONG_CAUSAL_CLAUSE_CHARS: usize = 80;

fn keyword_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{L}\p{N}_']+").expect("keyword token regex"))
}

/// True when the text has enough words and either two distinct cue types, or
/// one cue type in a text longer than `SINGLE_TYPE_MIN_CHARS`.
pub fn is_likely_reasoning(text: &str) -> bool {
    let trimmed = text.trim();
    if count_words(trimmed) < MIN_REASONING_WORDS {
        return false;
    }

    let types = matched_types(trimmed);
    types.len() >= 2 || (types.len() == 1 && trimmed.chars().count() > SINGLE_TYPE_MIN_CHARS)
}

/// Score a match at byte span `[start, end)` by the ±100-character window
/// around it. Result is clamped to [0, 1].
pub fn context_confidence(text: &str, start: usize, end: usize) -> f64 {
    let window = char_window(text, start, end, CONTEXT_RADIUS_CHARS);
    let window_chars = window.chars().count();

    let mut confidence = CONTEXT_BASE;

    for family in [causal_family_re(), sequential_family_re()] {
        if family.is_match(window) {
            confidence += CONTEXT_FAMILY_BONUS;
        }
    }

    if window_chars > CONTEXT_LONG_WINDOW {
        confidence += CONTEXT_LENGTH_BONUS;
    }
    if window_chars > CONTEXT_VERY_LONG_WINDOW {
        confidence += CONTEXT_LENGTH_BONUS;
    }

    if code_like_re().is_match(window) {
        confidence -= CODE_PENALTY;
    }

    confidence.clamp(0.0, 1.0)
}

/// Lowercased word tokens of at least three characters, minus stop words.
pub fn extract_keywords(text: &str) -> BTreeSet<String> {
    let lower = text.to_lowercase();
    let stops = stop_words();
    keyword_token_re()
        .find_iter(&lower)
        .map(|m| m.as_str().trim_matches('\''))
        .filter(|w| w.chars().count() >= MIN_KEYWORD_CHARS)
        .filter(|w| !stops.contains(w))
        .map(|w| w.to_string())
        .collect()
}

/// Run every rule over `text`; matches are ordered by position, then type.
pub fn analyze_patterns(text: &str) -> Vec<PatternMatch> {
    let mut matches: Vec<PatternMatch> = Vec::new();

    for rule in reasoning_rules() {
        for m in rule.matcher.find_iter(text) {
            let duplicate = matches.iter().any(|existing| {
                existing.kind == rule.kind
                    && existing.position.start < m.end()
                    && m.start() < existing.position.end
            });
            if duplicate {
                continue;
            }

            let context = context_confidence(text, m.start(), m.end());
            matches.push(PatternMatch {
                kind: rule.kind,
                content: m.as_str().to_string(),
                confidence: ((rule.weight + context) / 2.0).clamp(0.0, 1.0),
                position: MatchPosition {
                    start: m.start(),
                    end: m.end(),
                },
                keywords: extract_keywords(m.as_str()),
            });
        }
    }

    matches.sort_by(|a, b| {
        a.position
            .start
            .cmp(&b.position.start)
            .then_with(|| a.kind.cmp(&b.kind))
    });
    matches
}

/// Number of quality indicators present in one line: reasoning verbs,
/// logical connectives, a rhetorical question, a long causal clause.
pub fn line_quality_indicators(line: &str) -> usize {
    let trimmed = line.trim();
    let mut count = 0;
    if reasoning_verb_re().is_match(trimmed) {
        count += 1;
    }
    if connective_re().is_match(trimmed) {
        count += 1;
    }
    if trimmed.ends_with('?') || trimmed.ends_with('？') {
        count += 1;
    }
    if trimmed.chars().count() > LONG_CAUSAL_CLAUSE_CHARS && causal_family_re().is_match(trimmed) {
        count += 1;
    }
    count
}

/// Running confidence for streamed reasoning content, clamped to [0, 1].
pub fn streaming_confidence(content: &str) -> f64 {
    let mut confidence = STREAM_BASE;

    let indicators = reasoning_verb_re().find_iter(content).count()
        + connective_re().find_iter(content).count();
    confidence += STREAM_INDICATOR_BONUS * indicators as f64;

    if content.contains('?') || content.contains('？') {
        confidence += STREAM_QUESTION_BONUS;
    }

    let chars = content.chars().count();
    if chars > STREAM_LONG_CHARS {
        confidence += STREAM_LENGTH_BONUS;
    }
    if chars > STREAM_VERY_LONG_CHARS {
        confidence += STREAM_LENGTH_BONUS;
    }

    if code_like_re().is_match(content) {
        confidence -= CODE_PENALTY;
    }

    confidence.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatternType;

    #[test]
    fn test_is_likely_reasoning_requires_words() {
        assert!(!is_likely_reasoning("Therefore, first."));
        assert!(!is_likely_reasoning(""));
    }

    #[test]
    fn test_is_likely_reasoning_two_types() {
        let text = "First I need to check the input, therefore the loop must start at one.";
        assert!(is_likely_reasoning(text));
    }

    #[test]
    fn test_is_likely_reasoning_single_type_needs_length() {
        let short = "The cache is small and fast and cheap, therefore it is used here today.";
        assert!(short.chars().count() <= SINGLE_TYPE_MIN_CHARS);
        assert!(!is_likely_reasoning(short));

        let long = "The cache is small and fast and cheap and lives in process memory for the whole session, therefore it is used here today.";
        assert!(long.chars().count() > SINGLE_TYPE_MIN_CHARS);
        assert!(is_likely_reasoning(long));
    }

    #[test]
    fn test_plain_facts_are_not_reasoning() {
        let text = "The sky is blue. Water is wet. Paris is in France. Cats have four legs and a tail.";
        assert!(!is_likely_reasoning(text));
    }

    #[test]
    fn test_context_confidence_base_and_bonuses() {
        let plain = "word";
        assert!((context_confidence(plain, 0, 4) - 0.5).abs() < 1e-9);

        let causal = "because it rains, then we stay";
        assert!((context_confidence(causal, 0, 7) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_context_confidence_code_penalty_and_clamp() {
        let code = "```\nfunction foo() {}\n```";
        assert!((context_confidence(code, 4, 12) - 0.3).abs() < 1e-9);

        let long = format!("{} because then {}", "a ".repeat(150), "b ".repeat(150));
        let mid = long.find("because").unwrap();
        let score = context_confidence(&long, mid, mid + 7);
        assert!((score - 0.8).abs() < 1e-9);
        assert!(score <= 1.0);
    }

    #[test]
    fn test_extract_keywords() {
        let keywords = extract_keywords("The Parser should handle NESTED brackets and the parser");
        assert!(keywords.contains("parser"));
        assert!(keywords.contains("nested"));
        assert!(keywords.contains("brackets"));
        assert!(!keywords.contains("the"));
        assert!(!keywords.contains("should"));
        assert_eq!(keywords.iter().filter(|k| k.as_str() == "parser").count(), 1);
    }

    #[test]
    fn test_analyze_patterns_orders_by_position() {
        let text = "First, why does the test fail here? Therefore the fix is simple.";
        let matches = analyze_patterns(text);
        assert!(!matches.is_empty());
        assert!(matches.windows(2).all(|w| w[0].position.start <= w[1].position.start));
        let kinds: Vec<PatternType> = matches.iter().map(|m| m.kind).collect();
        assert!(kinds.contains(&PatternType::Step));
        assert!(kinds.contains(&PatternType::Question));
        assert!(kinds.contains(&PatternType::Conclusion));
        assert!(matches.iter().all(|m| (0.0..=1.0).contains(&m.confidence)));
    }

    #[test]
    fn test_line_quality_indicators() {
        assert_eq!(line_quality_indicators("The sky is blue."), 0);
        assert_eq!(line_quality_indicators("Let me think because it matters?"), 3);
    }

    #[test]
    fn test_streaming_confidence() {
        assert!((streaming_confidence("plain words") - 0.3).abs() < 1e-9);
        let with_code = "```rust\nfn main() {}\n```";
        assert!((streaming_confidence(with_code) - 0.1).abs() < 1e-9);
        let rich = "Let me think. Because X, therefore Y? ".repeat(10);
        assert_eq!(streaming_confidence(&rich), 1.0);
    }
}
