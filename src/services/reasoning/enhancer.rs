// Content Enhancer
// Cleans extracted reasoning, re-titles unstructured paragraphs, and
// truncates at a safe boundary.

use regex::Regex;
use std::sync::OnceLock;

use super::patterns::{existing_structure_re, option_word_re, step_word_re};
use crate::services::text_processor::{is_sentence_terminal, normalize_whitespace, split_paragraphs};

pub const TRUNCATION_MARKER: &str = "\n\n[... reasoning truncated]";

/// Share of `max_length` searched backwards for a sentence end.
const SENTENCE_SEARCH_RATIO: f64 = 0.3;
/// Share of `max_length` searched backwards for a line (or word) break.
const LINE_SEARCH_RATIO: f64 = 0.2;

const RESECTION_MIN_CHARS: usize = 300;
const RESECTION_MIN_PARAGRAPHS: usize = 2;

fn punctuation_runs() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (r"!{2,}", "!"),
            (r"\?{2,}", "?"),
            (r"\.{4,}", "..."),
            (r",{2,}", ","),
            (r"\*{3,}", "**"),
            (r"_{3,}", "__"),
        ]
        .into_iter()
        .map(|(pattern, replacement)| {
            (Regex::new(pattern).expect("punctuation run regex"), replacement)
        })
        .collect()
    })
}

/// Normalize whitespace and collapse repeated punctuation or emphasis markers.
pub fn clean_content(text: &str) -> String {
    let mut s = normalize_whitespace(text);
    for (re, replacement) in punctuation_runs() {
        if re.is_match(&s) {
            s = re.replace_all(&s, *replacement).into_owned();
        }
    }
    s
}

/// Cut `text` to at most `max_length` characters plus `TRUNCATION_MARKER`.
///
/// Preference order: the last sentence end within the final 30% of the limit,
/// then the last line break within the final 20%, then the last word break in
/// that window, and only then a hard cut.
pub fn truncate_content(text: &str, max_length: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_length {
        return text.to_string();
    }

    let sentence_floor = max_length.saturating_sub((max_length as f64 * SENTENCE_SEARCH_RATIO) as usize);
    let line_floor = max_length.saturating_sub((max_length as f64 * LINE_SEARCH_RATIO) as usize);

    let sentence_cut = (sentence_floor..max_length).rev().find_map(|i| {
        let ch = chars[i];
        let at_break = chars.get(i + 1).map_or(true, |c| c.is_whitespace());
        let cjk = matches!(ch, '。' | '！' | '？');
        (is_sentence_terminal(ch) && (at_break || cjk)).then_some(i + 1)
    });

    let cut = sentence_cut
        .or_else(|| (line_floor..max_length).rev().find(|&i| chars[i] == '\n'))
        .or_else(|| (line_floor..max_length).rev().find(|&i| chars[i].is_whitespace()))
        .unwrap_or(max_length);

    let head: String = chars[..cut].iter().collect();
    format!("{}{}", head.trim_end(), TRUNCATION_MARKER)
}

fn resection_label(paragraph: &str, index: usize, total: usize, has_options: bool) -> String {
    if index == 0 {
        return if paragraph.contains('?') || paragraph.contains('？') {
            "Understanding the Question".to_string()
        } else {
            "Problem Framing".to_string()
        };
    }
    if index == total - 1 {
        return if has_options {
            "Decision".to_string()
        } else {
            "Conclusion".to_string()
        };
    }
    if index == 1 {
        return if step_word_re().is_match(paragraph) {
            "Approach".to_string()
        } else {
            "Analysis".to_string()
        };
    }
    format!("Step {}", index - 1)
}

/// Add bold section labels to long, unstructured multi-paragraph text.
/// Returns the input unchanged when it is short, already structured, or a
/// single paragraph.
pub fn resection_content(text: &str) -> String {
    if text.chars().count() <= RESECTION_MIN_CHARS || existing_structure_re().is_match(text) {
        return text.to_string();
    }

    let paragraphs = split_paragraphs(text);
    if paragraphs.len() < RESECTION_MIN_PARAGRAPHS {
        return text.to_string();
    }

    let has_options = option_word_re().is_match(text);
    let total = paragraphs.len();
    paragraphs
        .iter()
        .map(|p| {
            format!(
                "**{}**\n\n{}",
                resection_label(&p.text, p.index, total, has_options),
                p.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Full post-processing pass: clean, optionally re-section, then truncate.
pub fn enhance_content(text: &str, max_length: usize, resection: bool) -> String {
    let cleaned = clean_content(text);
    let sectioned = if resection {
        resection_content(&cleaned)
    } else {
        cleaned
    };
    truncate_content(&sectioned, max_length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_content_collapses_runs() {
        let cleaned = clean_content("  Wait!!! Really???  Hmm......\n\n\n\n***Bold***  ");
        assert_eq!(cleaned, "Wait! Really? Hmm...\n\n**Bold**");
    }

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate_content("short.", 100), "short.");
    }

    #[test]
    fn test_truncate_prefers_sentence_end() {
        let text = "One sentence here. Another one follows. And a third that runs long";
        let out = truncate_content(text, 50);
        assert_eq!(out, format!("One sentence here. Another one follows.{}", TRUNCATION_MARKER));
    }

    #[test]
    fn test_truncate_falls_back_to_line_break() {
        let text = format!("{}\n{}", "a".repeat(90), "b".repeat(50));
        let out = truncate_content(&text, 100);
        assert_eq!(out, format!("{}{}", "a".repeat(90), TRUNCATION_MARKER));
    }

    #[test]
    fn test_truncate_hard_cut_without_boundaries() {
        let text = "x".repeat(50);
        let out = truncate_content(&text, 20);
        assert_eq!(out, format!("{}{}", "x".repeat(20), TRUNCATION_MARKER));
    }

    #[test]
    fn test_truncate_zero_length() {
        assert_eq!(truncate_content("abc", 0), TRUNCATION_MARKER);
    }

    #[test]
    fn test_resection_labels_paragraphs() {
        let p1 = "What is the fastest way to sort these records when most of them are already in order and memory is tight?";
        let p2 = "First, insertion sort does well on nearly sorted input because each element moves only a short distance.";
        let p3 = "Merge sort is stable but needs extra memory proportional to the input, which we do not have here.";
        let p4 = "The best option is insertion sort for this particular workload.";
        let text = [p1, p2, p3, p4].join("\n\n");
        let out = resection_content(&text);
        assert!(out.starts_with("**Understanding the Question**\n\nWhat is"));
        assert!(out.contains("**Approach**\n\nFirst,"));
        assert!(out.contains("**Step 1**\n\nMerge sort"));
        assert!(out.contains("**Decision**\n\nThe best option"));
    }

    #[test]
    fn test_resection_skips_structured_or_short_text() {
        let short = "One.\n\nTwo.";
        assert_eq!(resection_content(short), short);

        let structured = format!("## Heading\n\n{}\n\n{}", "word ".repeat(40), "more ".repeat(40));
        assert_eq!(resection_content(&structured), structured);
    }

    #[test]
    fn test_enhance_truncates_after_resection() {
        let text = format!("{}\n\n{}", "Alpha beta gamma. ".repeat(30), "Delta epsilon. ".repeat(30));
        let out = enhance_content(&text, 200, true);
        assert!(out.ends_with(TRUNCATION_MARKER));
        let body = out.trim_end_matches(TRUNCATION_MARKER);
        assert!(body.chars().count() <= 200);
        assert!(body.starts_with("**Problem Framing**"));
    }
}
