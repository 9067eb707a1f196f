// Batch Extractor
// Ordered cascade of extraction strategies over a complete message:
// explicit markers -> leading marker -> structural headings ->
// heuristic line scan -> paragraph fallback.

use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::cache::{cache_key, ResultCache};
use super::enhancer::enhance_content;
use super::patterns::{
    final_answer_re, marker_families, reasoning_heading_re, section_boundary_re,
    structured_line_re,
};
use super::scoring::{analyze_patterns, is_likely_reasoning, line_quality_indicators};
use super::streaming::StreamingExtractor;
use crate::models::{CacheStats, ConfidenceLevel, ExtractionMethod, ExtractionResult};
use crate::services::config_store::ExtractorConfig;
use crate::services::text_processor::split_paragraphs;

const HEURISTIC_MIN_LINES: usize = 2;
const HEURISTIC_MIN_LINES_WITHOUT_INDICATORS: usize = 5;
const HEURISTIC_MEDIUM_INDICATORS: usize = 3;
const HEURISTIC_HIGH_INDICATORS: usize = 8;
const HEURISTIC_LONG_SCAN_LINES: usize = 15;

const FALLBACK_MAX_PARAGRAPHS: usize = 15;
const FALLBACK_MAX_CHARS: usize = 8000;
const FALLBACK_MEDIUM_PARAGRAPHS: usize = 3;
const FALLBACK_MEDIUM_CHARS: usize = 500;

#[derive(Debug, Clone)]
struct Candidate {
    content: String,
    method: ExtractionMethod,
    confidence: ConfidenceLevel,
}

impl Candidate {
    fn new(content: String, method: ExtractionMethod, confidence: ConfidenceLevel) -> Self {
        Self {
            content,
            method,
            confidence,
        }
    }
}

/// A heading-delimited reasoning section. `start..end` covers the heading line
/// through the last body line (byte offsets, newline included).
#[derive(Debug, Clone)]
pub(crate) struct ReasoningSection {
    pub start: usize,
    pub end: usize,
    pub body: String,
}

/// Lines with their byte span; `end` includes the trailing newline.
fn line_spans(content: &str) -> Vec<(usize, &str, usize)> {
    let mut spans = Vec::new();
    let mut offset = 0;
    for raw in content.split_inclusive('\n') {
        let line = raw.trim_end_matches(['\n', '\r']);
        spans.push((offset, line, offset + raw.len()));
        offset += raw.len();
    }
    spans
}

/// Prefix of `text` before the first final-answer opener that follows at
/// least one non-blank line.
pub(crate) fn until_final_answer(text: &str) -> &str {
    let mut seen_content = false;
    for (start, line, _) in line_spans(text) {
        let trimmed = line.trim();
        if seen_content && final_answer_re().is_match(trimmed) {
            return &text[..start];
        }
        if !trimmed.is_empty() {
            seen_content = true;
        }
    }
    text
}

pub(crate) fn find_reasoning_sections(content: &str) -> Vec<ReasoningSection> {
    let lines = line_spans(content);
    let mut sections = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let (start, line, heading_end) = lines[i];
        let Some(caps) = reasoning_heading_re().captures(line) else {
            i += 1;
            continue;
        };

        let mut body: Vec<&str> = Vec::new();
        if !line.trim_start().starts_with('#') {
            if let Some(rest) = caps.name("rest") {
                let rest = rest.as_str().trim();
                if !rest.is_empty() {
                    body.push(rest);
                }
            }
        }

        let mut end = heading_end;
        let mut j = i + 1;
        while j < lines.len() {
            let (_, next, next_end) = lines[j];
            if section_boundary_re().is_match(next) || final_answer_re().is_match(next.trim()) {
                break;
            }
            body.push(next);
            end = next_end;
            j += 1;
        }

        let body = body.join("\n").trim().to_string();
        if !body.is_empty() {
            sections.push(ReasoningSection { start, end, body });
        }
        i = j;
    }

    sections
}

/// Blocks of the family whose first non-empty block starts earliest, so the
/// choice matches what an incremental reader would see first.
fn extract_explicit(content: &str) -> Option<Candidate> {
    let (family, blocks) = marker_families()
        .iter()
        .filter_map(|family| {
            let blocks: Vec<(usize, &str)> = family
                .block
                .captures_iter(content)
                .filter_map(|caps| Some((caps.get(0)?.start(), caps.get(1)?.as_str().trim())))
                .filter(|(_, body)| !body.is_empty())
                .collect();
            (!blocks.is_empty()).then_some((family, blocks))
        })
        .min_by_key(|(_, blocks)| blocks[0].0)?;

    debug!(family = family.name, blocks = blocks.len(), "[extractor] explicit markers");
    let joined = blocks
        .iter()
        .map(|(_, body)| *body)
        .collect::<Vec<_>>()
        .join("\n\n");
    Some(Candidate::new(joined, ExtractionMethod::Explicit, ConfidenceLevel::High))
}

fn extract_leading_marker(content: &str) -> Option<Candidate> {
    let trimmed = content.trim_start();
    for family in marker_families() {
        let Some(open) = family.open.find(trimmed).filter(|m| m.start() == 0) else {
            continue;
        };
        let rest = &trimmed[open.end()..];
        let body = match family.close.find(rest) {
            Some(close) => &rest[..close.start()],
            None => until_final_answer(rest),
        };
        let body = body.trim();
        if !body.is_empty() {
            debug!(family = family.name, "[extractor] leading marker");
            return Some(Candidate::new(
                body.to_string(),
                ExtractionMethod::Explicit,
                ConfidenceLevel::High,
            ));
        }
    }
    None
}

fn extract_structural(content: &str) -> Option<Candidate> {
    let sections = find_reasoning_sections(content);
    if sections.is_empty() {
        return None;
    }
    debug!(sections = sections.len(), "[extractor] structural headings");
    let joined = sections
        .iter()
        .map(|s| s.body.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    Some(Candidate::new(joined, ExtractionMethod::Pattern, ConfidenceLevel::Medium))
}

fn extract_heuristic(content: &str) -> Option<Candidate> {
    let mut collected: Vec<&str> = Vec::new();
    let mut reasoning_lines = 0usize;
    let mut indicators = 0usize;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if reasoning_lines > 0 {
                collected.push("");
            }
            continue;
        }
        if final_answer_re().is_match(trimmed) {
            break;
        }
        if reasoning_lines >= HEURISTIC_MIN_LINES && structured_line_re().is_match(line) {
            break;
        }

        indicators += line_quality_indicators(trimmed);
        collected.push(line.trim_end());
        reasoning_lines += 1;
    }

    if reasoning_lines < HEURISTIC_MIN_LINES {
        return None;
    }
    if indicators == 0 && reasoning_lines < HEURISTIC_MIN_LINES_WITHOUT_INDICATORS {
        return None;
    }

    let text = collected.join("\n").trim().to_string();
    if indicators == 0 && !is_likely_reasoning(&text) {
        return None;
    }

    let mut confidence = if indicators >= HEURISTIC_HIGH_INDICATORS {
        ConfidenceLevel::High
    } else if indicators >= HEURISTIC_MEDIUM_INDICATORS {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    };
    if reasoning_lines > HEURISTIC_LONG_SCAN_LINES {
        confidence = confidence.bump();
    }

    debug!(lines = reasoning_lines, indicators, "[extractor] heuristic scan");
    Some(Candidate::new(text, ExtractionMethod::Heuristic, confidence))
}

fn extract_fallback(content: &str) -> Option<Candidate> {
    if !is_likely_reasoning(content) {
        return None;
    }

    let mut kept: Vec<String> = Vec::new();
    let mut total_chars = 0usize;

    for block in split_paragraphs(content) {
        if kept.len() >= FALLBACK_MAX_PARAGRAPHS || total_chars >= FALLBACK_MAX_CHARS {
            break;
        }
        if final_answer_re().is_match(&block.text) {
            break;
        }
        if is_likely_reasoning(&block.text) {
            total_chars += block.text.chars().count();
            kept.push(block.text);
        }
    }

    if kept.is_empty() {
        return None;
    }

    let confidence = if kept.len() >= FALLBACK_MEDIUM_PARAGRAPHS && total_chars >= FALLBACK_MEDIUM_CHARS {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    };

    debug!(paragraphs = kept.len(), chars = total_chars, "[extractor] paragraph fallback");
    Some(Candidate::new(kept.join("\n\n"), ExtractionMethod::Fallback, confidence))
}

/// Run the cascade and post-processing without touching any cache.
/// Returns `None` for blank input or when every strategy declines.
pub fn extract_uncached(
    content: &str,
    max_length: usize,
    config: &ExtractorConfig,
) -> Option<ExtractionResult> {
    if content.trim().is_empty() {
        return None;
    }

    let candidate = extract_explicit(content)
        .or_else(|| extract_leading_marker(content))
        .or_else(|| extract_structural(content))
        .or_else(|| extract_heuristic(content))
        .or_else(|| extract_fallback(content))?;

    // Explicitly delimited content is the author's own text; only inferred
    // spans get synthetic section labels.
    let resection = config.resection_enabled && candidate.method != ExtractionMethod::Explicit;
    let enhanced = enhance_content(&candidate.content, max_length, resection);
    if enhanced.trim().is_empty() {
        return None;
    }

    let mut result = ExtractionResult::new(
        enhanced,
        content.chars().count(),
        candidate.method,
        candidate.confidence,
    );
    result.patterns = Some(analyze_patterns(&result.content));
    result.cache_key = Some(cache_key(content, config.cache_key_prefix_chars));

    debug!(
        method = result.extraction_method.as_str(),
        confidence = result.confidence.as_str(),
        chars = result.content.chars().count(),
        "[extractor] extracted"
    );
    Some(result)
}

/// Entry point for callers: configuration plus a shared, lock-guarded cache.
/// Clones share the same cache.
#[derive(Debug, Clone)]
pub struct ReasoningEngine {
    config: ExtractorConfig,
    cache: Arc<Mutex<ResultCache>>,
}

impl Default for ReasoningEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReasoningEngine {
    pub fn new() -> Self {
        Self::with_config(ExtractorConfig::default())
    }

    pub fn with_config(config: ExtractorConfig) -> Self {
        let cache = ResultCache::new(&config);
        Self::with_cache(config, Arc::new(Mutex::new(cache)))
    }

    /// Build an engine around an existing cache, e.g. one shared by several
    /// engines or constructed with a test clock.
    pub fn with_cache(config: ExtractorConfig, cache: Arc<Mutex<ResultCache>>) -> Self {
        Self { config, cache }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    fn lock_cache(&self) -> MutexGuard<'_, ResultCache> {
        // Entries stay valid after a panicking holder; keep serving them.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Extract with the configured default `max_length`, cache enabled.
    pub fn extract(&self, content: &str) -> Option<ExtractionResult> {
        self.extract_reasoning(content, self.config.max_length, true)
    }

    pub fn extract_reasoning(
        &self,
        content: &str,
        max_length: usize,
        use_cache: bool,
    ) -> Option<ExtractionResult> {
        if content.trim().is_empty() {
            return None;
        }

        let use_cache = use_cache && self.config.cache_enabled;
        let key = cache_key(content, self.config.cache_key_prefix_chars);

        if use_cache {
            if let Some(hit) = self.lock_cache().get(&key, content, max_length) {
                return Some(hit);
            }
        }

        let result = extract_uncached(content, max_length, &self.config)?;

        if use_cache {
            self.lock_cache().set(&key, result.clone(), content, max_length);
        }
        Some(result)
    }

    pub fn create_streaming_extractor(&self) -> StreamingExtractor {
        StreamingExtractor::new(self.config.clone())
    }

    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats()
    }
}
