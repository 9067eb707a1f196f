// Reasoning Removal
// Strips delimited, structural and previously extracted reasoning from a
// message, leaving the answer-only text.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

use super::extractor::{find_reasoning_sections, until_final_answer};
use super::patterns::{final_answer_re, marker_families, marker_token_re};

fn blank_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("blank run regex"))
}

/// Drop an unclosed marker that opens the text, together with everything up
/// to the first final-answer opener.
fn strip_leading_unclosed(text: &str) -> Option<String> {
    let trimmed = text.trim_start();
    for family in marker_families() {
        let Some(open) = family.open.find(trimmed).filter(|m| m.start() == 0) else {
            continue;
        };
        let rest = &trimmed[open.end()..];
        if family.close.is_match(rest) {
            return None;
        }
        let body = until_final_answer(rest);
        return Some(rest[body.len()..].to_string());
    }
    None
}

fn strip_markers(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let mut next = current.clone();
        for family in marker_families() {
            if family.block.is_match(&next) {
                next = family.block.replace_all(&next, "").into_owned();
            }
        }
        if let Some(stripped) = strip_leading_unclosed(&next) {
            next = stripped;
        }
        if marker_token_re().is_match(&next) {
            next = marker_token_re().replace_all(&next, "").into_owned();
        }

        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_sections(text: &str) -> String {
    let sections = find_reasoning_sections(text);
    if sections.is_empty() {
        return text.to_string();
    }
    let mut out = text.to_string();
    for section in sections.iter().rev() {
        out.replace_range(section.start..section.end, "");
    }
    out
}

fn strip_extracted_lines(text: &str, extracted: &str) -> String {
    let known: HashSet<&str> = extracted
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let kept: Vec<&str> = text
        .lines()
        .filter(|line| !known.contains(line.trim()))
        .collect();

    match kept.iter().position(|line| final_answer_re().is_match(line.trim())) {
        Some(first_answer) => kept[first_answer..].join("\n"),
        None => kept.join("\n"),
    }
}

/// Remove reasoning from `content`: explicit marker blocks and stray marker
/// tokens, reasoning heading sections, and, when `extracted` is given, every
/// line it contains plus anything before the first final-answer opener.
/// Returns `content` unchanged when nothing was removed.
pub fn remove_reasoning_from_content(content: &str, extracted: Option<&str>) -> String {
    let mut text = strip_markers(content);
    text = strip_sections(&text);
    if let Some(extracted) = extracted.filter(|e| !e.trim().is_empty()) {
        text = strip_extracted_lines(&text, extracted);
    }

    if text == content {
        return content.to_string();
    }

    let collapsed = blank_run_re().replace_all(&text, "\n\n");
    let cleaned = strip_markers(&collapsed).trim().to_string();
    debug!(
        before = content.chars().count(),
        after = cleaned.chars().count(),
        "[removal] stripped reasoning"
    );
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_block_removed() {
        let input = "<thinking>Because X, therefore Y.</thinking>\n\nHere's the answer: Y.";
        assert_eq!(remove_reasoning_from_content(input, None), "Here's the answer: Y.");
    }

    #[test]
    fn test_plain_text_returned_unchanged() {
        let input = "Plain answer with trailing space.  \n";
        assert_eq!(remove_reasoning_from_content(input, None), input);
    }

    #[test]
    fn test_nested_blocks_and_stray_tokens() {
        let input = "<think>a<thinking>b</thinking>c</think>done";
        assert_eq!(remove_reasoning_from_content(input, None), "done");

        let stray = "Answer </think> here [/reasoning]";
        let out = remove_reasoning_from_content(stray, None);
        assert!(!marker_token_re().is_match(&out));
        assert!(out.starts_with("Answer"));
    }

    #[test]
    fn test_leading_unclosed_marker_removed() {
        let input = "<think>\nI should check.\nFine.\n\nHere is the answer: ok.";
        assert_eq!(remove_reasoning_from_content(input, None), "Here is the answer: ok.");
    }

    #[test]
    fn test_heading_section_removed() {
        let input = "## Thinking\nThe user wants X, so Y.\n## Answer\nUse Y.";
        assert_eq!(remove_reasoning_from_content(input, None), "## Answer\nUse Y.");
    }

    #[test]
    fn test_extracted_lines_removed() {
        let input = "Let me think about the input.\nIt has three parts.\n\nHere's the answer: three.";
        let extracted = "Let me think about the input.\nIt has three parts.";
        assert_eq!(
            remove_reasoning_from_content(input, Some(extracted)),
            "Here's the answer: three."
        );
    }

    #[test]
    fn test_blank_extracted_is_ignored() {
        let input = "Nothing to strip.";
        assert_eq!(remove_reasoning_from_content(input, Some("  ")), input);
    }

    #[test]
    fn test_fenced_block_removed() {
        let input = "```thinking\nweigh both options\n```\nUse the first one.";
        assert_eq!(remove_reasoning_from_content(input, None), "Use the first one.");
    }
}
