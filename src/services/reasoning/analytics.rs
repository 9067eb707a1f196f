// Reasoning Analytics
// Pattern statistics, quality metrics and improvement hints for an extracted
// reasoning span. Diagnostic only.

use std::collections::BTreeMap;

use super::scoring::analyze_patterns;
use crate::models::{PatternMatch, PatternType, ReasoningAnalytics, ReasoningMetrics};
use crate::services::text_processor::split_sentences;

const READABLE_SENTENCE_CHARS: f64 = 100.0;
const READABILITY_FALLOFF_CHARS: f64 = 200.0;

const LOW_READABILITY: f64 = 0.6;
const LOW_COMPLEXITY: f64 = 0.34;
const LOW_CONFIDENCE: f64 = 0.5;

pub const SUGGEST_NO_PATTERNS: &str =
    "No reasoning patterns detected; make intermediate steps explicit.";
pub const SUGGEST_CONCLUSION: &str = "Add a clear conclusion that states the outcome.";
pub const SUGGEST_SHORTER_SENTENCES: &str = "Shorten sentences to improve readability.";
pub const SUGGEST_MORE_ASPECTS: &str =
    "Cover more aspects of the problem, such as alternatives or trade-offs.";
pub const SUGGEST_QUESTION: &str = "Frame the problem with an explicit question.";
pub const SUGGEST_CONNECTIVES: &str = "Link steps with explicit connectives (because, therefore).";

/// 1.0 up to ~100 characters per sentence on average, falling linearly to 0.0
/// at 300.
fn readability_score(text: &str) -> f64 {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return 1.0;
    }
    let mean = sentences
        .iter()
        .map(|s| s.text.chars().count() as f64)
        .sum::<f64>()
        / sentences.len() as f64;

    if mean <= READABLE_SENTENCE_CHARS {
        1.0
    } else {
        (1.0 - (mean - READABLE_SENTENCE_CHARS) / READABILITY_FALLOFF_CHARS).clamp(0.0, 1.0)
    }
}

fn compute_metrics(text: &str, patterns: &[PatternMatch]) -> ReasoningMetrics {
    let mut distribution: BTreeMap<PatternType, usize> = BTreeMap::new();
    for m in patterns {
        *distribution.entry(m.kind).or_insert(0) += 1;
    }

    let average_confidence = if patterns.is_empty() {
        0.0
    } else {
        patterns.iter().map(|m| m.confidence).sum::<f64>() / patterns.len() as f64
    };

    // Ties go to the type listed first.
    let dominant_type = distribution
        .iter()
        .fold(None::<(PatternType, usize)>, |best, (&kind, &count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((kind, count)),
        })
        .map(|(kind, _)| kind);

    ReasoningMetrics {
        total_patterns: patterns.len(),
        average_confidence,
        dominant_type,
        complexity_score: distribution.len() as f64 / PatternType::ALL.len() as f64,
        readability_score: readability_score(text),
        pattern_distribution: distribution,
    }
}

fn build_suggestions(metrics: &ReasoningMetrics) -> Vec<String> {
    if metrics.total_patterns == 0 {
        return vec![SUGGEST_NO_PATTERNS.to_string()];
    }

    let has = |kind: PatternType| metrics.pattern_distribution.contains_key(&kind);
    let mut suggestions = Vec::new();

    if !has(PatternType::Conclusion) {
        suggestions.push(SUGGEST_CONCLUSION);
    }
    if metrics.readability_score < LOW_READABILITY {
        suggestions.push(SUGGEST_SHORTER_SENTENCES);
    }
    if metrics.complexity_score < LOW_COMPLEXITY {
        suggestions.push(SUGGEST_MORE_ASPECTS);
    }
    if !has(PatternType::Question) {
        suggestions.push(SUGGEST_QUESTION);
    }
    if metrics.average_confidence < LOW_CONFIDENCE {
        suggestions.push(SUGGEST_CONNECTIVES);
    }

    suggestions.into_iter().map(str::to_string).collect()
}

pub fn get_reasoning_analytics(content: &str) -> ReasoningAnalytics {
    let patterns = analyze_patterns(content);
    let metrics = compute_metrics(content, &patterns);
    let suggestions = build_suggestions(&metrics);
    ReasoningAnalytics {
        patterns,
        metrics,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_has_single_suggestion() {
        let analytics = get_reasoning_analytics("");
        assert!(analytics.patterns.is_empty());
        assert_eq!(analytics.metrics.total_patterns, 0);
        assert_eq!(analytics.metrics.dominant_type, None);
        assert_eq!(analytics.metrics.complexity_score, 0.0);
        assert_eq!(analytics.suggestions, vec![SUGGEST_NO_PATTERNS.to_string()]);
    }

    #[test]
    fn test_metrics_over_rich_reasoning() {
        let text = "Why does the build fail on CI? First, let me analyze the logs. \
However, the cache may be stale. I'll go with a clean rebuild. Therefore the fix is to clear the cache.";
        let analytics = get_reasoning_analytics(text);
        let metrics = &analytics.metrics;

        assert_eq!(metrics.total_patterns, analytics.patterns.len());
        assert_eq!(metrics.pattern_distribution.len(), 6);
        assert!((metrics.complexity_score - 1.0).abs() < 1e-9);
        assert_eq!(metrics.readability_score, 1.0);
        assert!(metrics.average_confidence > 0.0 && metrics.average_confidence <= 1.0);
        assert!(metrics.dominant_type.is_some());
        assert!(!analytics.suggestions.contains(&SUGGEST_CONCLUSION.to_string()));
        assert!(!analytics.suggestions.contains(&SUGGEST_QUESTION.to_string()));
        assert!(!analytics.suggestions.contains(&SUGGEST_MORE_ASPECTS.to_string()));
    }

    #[test]
    fn test_missing_conclusion_and_long_sentences() {
        let long = format!("First we gather every record from the {} store", "very large ".repeat(40));
        let analytics = get_reasoning_analytics(&long);
        assert!(analytics.metrics.readability_score < LOW_READABILITY);
        assert!(analytics.suggestions.contains(&SUGGEST_CONCLUSION.to_string()));
        assert!(analytics.suggestions.contains(&SUGGEST_SHORTER_SENTENCES.to_string()));
        assert!(analytics.suggestions.contains(&SUGGEST_MORE_ASPECTS.to_string()));
    }

    #[test]
    fn test_dominant_type_is_most_frequent() {
        let text = "First do this. Then do that. Next check it. Therefore done.";
        let metrics = get_reasoning_analytics(text).metrics;
        assert_eq!(metrics.dominant_type, Some(PatternType::Step));
        assert_eq!(metrics.pattern_distribution.get(&PatternType::Step), Some(&3));
    }

    #[test]
    fn test_readability_bounds() {
        assert_eq!(readability_score("Short one. Another."), 1.0);
        let huge = format!("{}.", "word ".repeat(200));
        assert_eq!(readability_score(&huge), 0.0);
    }
}
