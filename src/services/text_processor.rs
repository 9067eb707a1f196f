// Text Processing Service
// Whitespace normalization, word counting, sentence and paragraph splitting

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // CJK ideographs count one word each; other letters and digits form runs.
        Regex::new(r"[\u{4e00}-\u{9fff}]|[[\p{L}\p{N}_']--[\u{4e00}-\u{9fff}]]+").expect("word regex")
    })
}

fn inner_space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\S)[ \t\x0C\x0B\u{00A0}\u{3000}]{2,}").expect("inner space regex"))
}

fn blank_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("blank run regex"))
}

fn paragraph_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t]*\n").expect("paragraph regex"))
}

/// Normalize line endings, tabs and runs of blank lines; trims the result.
/// Leading indentation is kept so nested lists and code survive.
pub fn normalize_whitespace(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let s = text.replace("\r\n", "\n").replace('\r', "\n");

    let lines: Vec<String> = s
        .lines()
        .map(|ln| {
            let ln = ln.replace('\t', "    ");
            let ln = inner_space_re().replace_all(&ln, "$1 ");
            ln.trim_end().to_string()
        })
        .collect();

    let joined = lines.join("\n");
    blank_run_re().replace_all(&joined, "\n\n").trim().to_string()
}

/// Count words (Latin tokens plus individual CJK characters)
pub fn count_words(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    word_re().find_iter(text).count()
}

pub fn is_sentence_terminal(ch: char) -> bool {
    matches!(ch, '。' | '！' | '？' | '.' | '!' | '?')
}

fn is_cjk_terminal(ch: char) -> bool {
    matches!(ch, '。' | '！' | '？')
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentenceOffset {
    pub text: String,
    /// UTF-8 byte offset of the sentence start.
    pub start: usize,
    /// UTF-8 byte offset, end-exclusive.
    pub end: usize,
}

/// Sentence splitting with offset tracking; respects quotes and decimals.
pub fn split_sentences(text: &str) -> Vec<SentenceOffset> {
    if text.is_empty() {
        return vec![];
    }

    let mut sentences = Vec::new();
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let quote_chars: HashSet<char> = ['"', '\u{201c}', '\u{201d}'].into_iter().collect();

    let mut current_start: usize = 0;
    let mut in_quote = false;
    let mut i = 0;

    while i < chars.len() {
        let (_, ch) = chars[i];

        if quote_chars.contains(&ch) {
            in_quote = !in_quote;
        }

        let mut is_sentence_end = false;
        if is_sentence_terminal(ch) && !in_quote {
            let decimal = ch == '.'
                && i > 0
                && i + 1 < chars.len()
                && chars[i - 1].1.is_ascii_digit()
                && chars[i + 1].1.is_ascii_digit();
            let followed_by_break = chars.get(i + 1).map_or(true, |(_, c)| c.is_whitespace());
            is_sentence_end = !decimal && (followed_by_break || is_cjk_terminal(ch));
        }

        if is_sentence_end {
            // Absorb a run of terminal punctuation ("?!", "...").
            while i + 1 < chars.len() && is_sentence_terminal(chars[i + 1].1) {
                i += 1;
            }
            let end = chars.get(i + 1).map_or(text.len(), |(b, _)| *b);
            let sentence_text = text[current_start..end].trim();
            if !sentence_text.is_empty() {
                sentences.push(SentenceOffset {
                    text: sentence_text.to_string(),
                    start: current_start,
                    end,
                });
            }
            current_start = end;
        }

        i += 1;
    }

    let remaining = text[current_start..].trim();
    if !remaining.is_empty() {
        sentences.push(SentenceOffset {
            text: remaining.to_string(),
            start: current_start,
            end: text.len(),
        });
    }

    sentences
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Split text into blank-line delimited paragraphs, trimmed, with byte offsets.
pub fn split_paragraphs(text: &str) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    if text.trim().is_empty() {
        return blocks;
    }

    let mut cursor: usize = 0;
    for para in paragraph_break_re().split(text) {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        let start = text[cursor..].find(trimmed).map(|i| cursor + i).unwrap_or(cursor);
        let end = start + trimmed.len();

        blocks.push(TextBlock {
            index: blocks.len(),
            start,
            end,
            text: trimmed.to_string(),
        });

        cursor = end;
    }

    blocks
}

/// Slice `[start - radius, end + radius)` out of `text`, measured in characters
/// around byte offsets, snapped to char boundaries and never past either end.
pub fn char_window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let len = text.len();
    let mut s = start.min(len);
    let mut e = end.min(len).max(s);
    while s > 0 && !text.is_char_boundary(s) {
        s -= 1;
    }
    while e < len && !text.is_char_boundary(e) {
        e += 1;
    }

    let lo = text[..s]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map(|(b, _)| b)
        .unwrap_or(s);
    let hi = text[e..]
        .char_indices()
        .nth(radius)
        .map(|(b, _)| e + b)
        .unwrap_or(len);

    &text[lo..hi]
}
