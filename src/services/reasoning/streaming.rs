// Streaming Extractor
// Per-session state machine that isolates reasoning while a message is still
// arriving; falls back to the batch cascade on finalize.

use tracing::debug;

use super::enhancer::enhance_content;
use super::extractor::extract_uncached;
use super::patterns::{
    final_answer_re, marker_families, marker_family, reasoning_heading_re, section_boundary_re,
};
use super::scoring::{analyze_patterns, streaming_confidence};
use crate::models::{
    ConfidenceLevel, ExtractionMethod, ExtractionResult, StreamPhase, StreamingState,
};
use crate::services::config_store::ExtractorConfig;

/// Accumulated characters required before the running confidence is scored.
const CONFIDENCE_MIN_CHARS: usize = 50;

#[derive(Debug)]
struct Opening {
    start: usize,
    content_start: usize,
    pattern: String,
    family: Option<&'static str>,
    inline: bool,
}

fn find_marker_opening(buffer: &str) -> Option<Opening> {
    marker_families()
        .iter()
        .filter_map(|family| {
            family.open.find(buffer).map(|m| Opening {
                start: m.start(),
                content_start: m.end(),
                pattern: m.as_str().to_string(),
                family: Some(family.name),
                inline: false,
            })
        })
        .min_by_key(|o| o.start)
}

/// First complete line that is a reasoning heading or bold label.
fn find_heading_opening(buffer: &str) -> Option<Opening> {
    let mut offset = 0;
    for raw in buffer.split_inclusive('\n') {
        let line_start = offset;
        offset += raw.len();
        if !raw.ends_with('\n') {
            break;
        }

        let line = raw.trim_end_matches(['\n', '\r']);
        let Some(caps) = reasoning_heading_re().captures(line) else {
            continue;
        };

        let is_label = !line.trim_start().starts_with('#');
        let rest = caps
            .name("rest")
            .filter(|r| is_label && !r.as_str().trim().is_empty());
        let (content_start, inline) = match rest {
            Some(r) => (line_start + r.start(), true),
            None => (offset, false),
        };
        return Some(Opening {
            start: line_start,
            content_start,
            pattern: line.trim().to_string(),
            family: None,
            inline,
        });
    }
    None
}

fn find_opening(buffer: &str) -> Option<Opening> {
    match (find_marker_opening(buffer), find_heading_opening(buffer)) {
        (Some(marker), Some(heading)) => Some(if heading.start < marker.start {
            heading
        } else {
            marker
        }),
        (marker, heading) => marker.or(heading),
    }
}

/// Byte offset in `span` of the first complete line that ends a heading
/// section. The first line is skipped when the span started mid-line.
fn heading_section_end(span: &str, inline: bool) -> Option<usize> {
    let mut offset = 0;
    for (i, raw) in span.split_inclusive('\n').enumerate() {
        let start = offset;
        offset += raw.len();
        if !raw.ends_with('\n') {
            break;
        }
        if i == 0 && inline {
            continue;
        }
        let line = raw.trim_end_matches(['\n', '\r']);
        if section_boundary_re().is_match(line) || final_answer_re().is_match(line.trim()) {
            return Some(start);
        }
    }
    None
}

/// One instance per in-flight message; not shared between messages.
#[derive(Debug)]
pub struct StreamingExtractor {
    state: StreamingState,
    config: ExtractorConfig,
    inline_heading: bool,
}

impl StreamingExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        let state = StreamingState::new();
        debug!(session = %state.session_id, "[streaming] session started");
        Self {
            state,
            config,
            inline_heading: false,
        }
    }

    /// Read-only view of the live state.
    pub fn state(&self) -> &StreamingState {
        &self.state
    }

    /// Detached copy of the current state.
    pub fn get_state(&self) -> StreamingState {
        self.state.clone()
    }

    /// Feed the next chunk. Returns a partial result once enough reasoning has
    /// accumulated, or the completed span when its closing marker arrives.
    /// Chunks received after completion are ignored.
    pub fn process_chunk(&mut self, chunk: &str) -> Option<ExtractionResult> {
        if self.state.phase == StreamPhase::Complete {
            debug!(session = %self.state.session_id, "[streaming] chunk after completion ignored");
            return None;
        }

        self.state.buffer.push_str(chunk);

        match self.state.phase {
            StreamPhase::Searching => self.search(),
            StreamPhase::Accumulating => {
                if !chunk.is_empty() {
                    self.state.extracted_chunks.push(chunk.to_string());
                }
            }
            StreamPhase::Complete => {}
        }

        if self.state.phase == StreamPhase::Accumulating {
            self.check_close();
        }

        self.refresh_confidence();
        self.partial_result()
    }

    fn search(&mut self) {
        let Some(opening) = find_opening(&self.state.buffer) else {
            return;
        };

        let fragment = self.state.buffer[opening.content_start..].to_string();
        if !fragment.is_empty() {
            self.state.extracted_chunks.push(fragment);
        }

        debug!(
            session = %self.state.session_id,
            pattern = %opening.pattern,
            family = opening.family.unwrap_or("heading"),
            "[streaming] searching -> accumulating"
        );

        self.state.span_start = Some(opening.content_start);
        self.state.current_pattern = Some(opening.pattern);
        self.state.marker_family = opening.family.map(str::to_string);
        self.state.phase = StreamPhase::Accumulating;
        self.inline_heading = opening.inline;
    }

    fn check_close(&mut self) {
        let Some(start) = self.state.span_start else {
            return;
        };

        let closed = {
            let span = &self.state.buffer[start..];
            let end = match self.state.marker_family.as_deref().and_then(marker_family) {
                Some(family) => family.close.find(span).map(|m| m.start()),
                None => heading_section_end(span, self.inline_heading),
            };
            end.map(|end| span[..end].trim().to_string())
        };

        let Some(fragment) = closed else {
            return;
        };

        self.state.extracted_chunks = if fragment.is_empty() {
            Vec::new()
        } else {
            vec![fragment]
        };
        self.state.phase = StreamPhase::Complete;
        self.state.is_complete = true;
        debug!(session = %self.state.session_id, "[streaming] accumulating -> complete");
    }

    fn refresh_confidence(&mut self) {
        let accumulated = self.state.accumulated();
        if accumulated.chars().count() > CONFIDENCE_MIN_CHARS {
            self.state.confidence = streaming_confidence(&accumulated);
        }
    }

    fn partial_result(&self) -> Option<ExtractionResult> {
        let accumulated = self.state.accumulated();
        let complete = self.state.phase == StreamPhase::Complete;
        if !complete && accumulated.chars().count() <= self.config.streaming_partial_threshold {
            return None;
        }

        let method = if self.state.marker_family.is_some() {
            ExtractionMethod::Explicit
        } else {
            ExtractionMethod::Pattern
        };
        self.build_result(&accumulated, method)
    }

    fn build_result(&self, accumulated: &str, method: ExtractionMethod) -> Option<ExtractionResult> {
        let content = enhance_content(accumulated, self.config.max_length, false);
        if content.trim().is_empty() {
            return None;
        }

        let confidence = if self.state.is_complete && method == ExtractionMethod::Explicit {
            ConfidenceLevel::High
        } else {
            ConfidenceLevel::from_score(self.state.confidence)
        };

        let mut result = ExtractionResult::new(
            content,
            self.state.buffer.chars().count(),
            method,
            confidence,
        );
        result.streaming_chunks = Some(self.state.extracted_chunks.clone());
        Some(result)
    }

    /// Close the session. Accumulated content becomes the result; with nothing
    /// accumulated the whole buffer goes through the batch cascade, uncached.
    pub fn finalize(self) -> Option<ExtractionResult> {
        let accumulated = self.state.accumulated();

        if !accumulated.trim().is_empty() {
            let method = if self.state.marker_family.is_some() {
                ExtractionMethod::Explicit
            } else {
                ExtractionMethod::Heuristic
            };
            let mut result = self.build_result(&accumulated, method)?;
            result.patterns = Some(analyze_patterns(&result.content));
            debug!(
                session = %self.state.session_id,
                method = method.as_str(),
                chunks = self.state.extracted_chunks.len(),
                "[streaming] finalized from accumulated span"
            );
            return Some(result);
        }

        debug!(session = %self.state.session_id, "[streaming] nothing accumulated, running batch cascade");
        extract_uncached(&self.state.buffer, self.config.max_length, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> StreamingExtractor {
        StreamingExtractor::new(ExtractorConfig::default())
    }

    #[test]
    fn test_explicit_span_completes_on_close_marker() {
        let mut stream = extractor();
        assert!(stream.process_chunk("<think").is_none());
        assert_eq!(stream.state().phase, StreamPhase::Searching);

        assert!(stream.process_chunk("ing>Because the input ").is_none());
        assert_eq!(stream.state().phase, StreamPhase::Accumulating);
        assert_eq!(stream.state().marker_family.as_deref(), Some("thinking"));
        assert_eq!(stream.state().extracted_chunks, vec!["Because the input ".to_string()]);

        assert!(stream.process_chunk("is sorted, binary search works.").is_none());

        let done = stream.process_chunk("</thinking>").unwrap();
        assert_eq!(done.content, "Because the input is sorted, binary search works.");
        assert_eq!(done.extraction_method, ExtractionMethod::Explicit);
        assert_eq!(done.confidence, ConfidenceLevel::High);
        assert_eq!(
            done.streaming_chunks,
            Some(vec!["Because the input is sorted, binary search works.".to_string()])
        );

        let state = stream.get_state();
        assert_eq!(state.phase, StreamPhase::Complete);
        assert!(state.is_complete);

        let buffered = state.buffer.len();
        assert!(stream.process_chunk(" Answer: yes").is_none());
        assert_eq!(stream.state().buffer.len(), buffered);

        let finalized = stream.finalize().unwrap();
        assert_eq!(finalized.content, "Because the input is sorted, binary search works.");
        assert_eq!(finalized.extraction_method, ExtractionMethod::Explicit);
    }

    #[test]
    fn test_open_and_close_in_one_chunk() {
        let mut stream = extractor();
        let result = stream
            .process_chunk("Intro. <reasoning>Check both ends.</reasoning> Done.")
            .unwrap();
        assert_eq!(result.content, "Check both ends.");
        assert!(stream.state().is_complete);
    }

    #[test]
    fn test_partial_result_after_threshold() {
        let mut stream = extractor();
        assert!(stream.process_chunk("<reasoning>").is_none());
        let long = "I need to consider the trade-off because memory is limited. ".repeat(5);
        let partial = stream.process_chunk(&long).unwrap();
        assert_eq!(partial.extraction_method, ExtractionMethod::Explicit);
        assert_ne!(partial.confidence, ConfidenceLevel::Low);
        assert!(!stream.state().is_complete);
        assert!(stream.state().confidence > 0.3);
        assert_eq!(partial.streaming_chunks.map(|c| c.len()), Some(1));
    }

    #[test]
    fn test_heading_span_closes_at_next_heading() {
        let mut stream = extractor();
        assert!(stream.process_chunk("## Thinking\n").is_none());
        assert_eq!(stream.state().phase, StreamPhase::Accumulating);
        assert!(stream.state().marker_family.is_none());

        assert!(stream.process_chunk("The list is short, so a linear scan is fine.\n").is_none());
        let done = stream.process_chunk("## Answer\n").unwrap();
        assert_eq!(done.content, "The list is short, so a linear scan is fine.");
        assert_eq!(done.extraction_method, ExtractionMethod::Pattern);

        stream.process_chunk("Scan it.");
        let finalized = stream.finalize().unwrap();
        assert_eq!(finalized.extraction_method, ExtractionMethod::Heuristic);
    }

    #[test]
    fn test_inline_label_starts_at_rest() {
        let mut stream = extractor();
        stream.process_chunk("**Reasoning:** the values repeat, so a set helps.\n");
        assert_eq!(
            stream.state().accumulated(),
            "the values repeat, so a set helps.\n"
        );
        let done = stream.process_chunk("**Answer:** use a set.\n").unwrap();
        assert_eq!(done.content, "the values repeat, so a set helps.");
    }

    #[test]
    fn test_finalize_without_span_runs_batch() {
        let mut stream = extractor();
        stream.process_chunk("Let me think about how the parser should handle this input.\n");
        stream.process_chunk(
            "The tokens arrive in order, so I need to track nesting depth because brackets can nest.\n\
What happens when a bracket is never closed?\n\
\n\
Here's the answer: count the depth.",
        );
        assert_eq!(stream.state().phase, StreamPhase::Searching);
        let result = stream.finalize().unwrap();
        assert_eq!(result.extraction_method, ExtractionMethod::Heuristic);
        assert!(result.streaming_chunks.is_none());
    }

    #[test]
    fn test_mixed_families_match_batch() {
        let input = "<think>A because B.</think> mid <thinking>C therefore D.</thinking>";
        let mut stream = extractor();
        for ch in input.chars() {
            stream.process_chunk(&ch.to_string());
        }
        assert_eq!(stream.state().marker_family.as_deref(), Some("think"));

        let streamed = stream.finalize().unwrap();
        let batch = extract_uncached(input, 10_000, &ExtractorConfig::default()).unwrap();
        assert_eq!(streamed.content, "A because B.");
        assert_eq!(streamed.content, batch.content);
    }

    #[test]
    fn test_finalize_immediately_is_none() {
        assert!(extractor().finalize().is_none());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut stream = extractor();
        stream.process_chunk("<think>abc");
        let mut snapshot = stream.get_state();
        snapshot.buffer.push_str("tampered");
        snapshot.extracted_chunks.clear();
        assert_eq!(stream.state().buffer, "<think>abc");
        assert_eq!(stream.state().extracted_chunks, vec!["abc".to_string()]);
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        assert_ne!(extractor().state().session_id, extractor().state().session_id);
    }
}
