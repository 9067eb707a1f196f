// Reasoning Module
// Isolates model "thinking" content from chat output, organized into:
// - patterns: Rule table, marker families and shared cue vocabularies
// - scoring: Likely-reasoning check, context confidence, keywords
// - extractor: Batch cascade and the ReasoningEngine entry point
// - enhancer: Cleanup, re-sectioning and safe truncation
// - cache: Bounded TTL cache keyed by text prefix and length
// - streaming: Incremental per-message state machine
// - removal: Answer-only text with reasoning stripped
// - analytics: Pattern statistics and quality suggestions

pub mod patterns;
pub mod scoring;
pub mod extractor;
pub mod enhancer;
pub mod cache;
pub mod streaming;
pub mod removal;
pub mod analytics;

// Re-export commonly used items
pub use patterns::{marker_families, marker_family, reasoning_rules, MarkerFamily, ReasoningRule};
pub use scoring::{analyze_patterns, context_confidence, extract_keywords, is_likely_reasoning};
pub use extractor::{extract_uncached, ReasoningEngine};
pub use enhancer::{clean_content, enhance_content, truncate_content, TRUNCATION_MARKER};
pub use cache::{cache_key, Clock, ResultCache, SystemClock};
pub use streaming::StreamingExtractor;
pub use removal::remove_reasoning_from_content;
pub use analytics::get_reasoning_analytics;
