// ReasoningLens Data Models
// Shared result, pattern, cache and streaming records

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

// ============ Extraction Method & Confidence ============

/// Which cascade strategy produced a result, in decreasing certainty.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Explicit,
    Pattern,
    Heuristic,
    Fallback,
}

impl ExtractionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionMethod::Explicit => "explicit",
            ExtractionMethod::Pattern => "pattern",
            ExtractionMethod::Heuristic => "heuristic",
            ExtractionMethod::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        }
    }

    /// One level up, saturating at `High`.
    pub fn bump(self) -> Self {
        match self {
            ConfidenceLevel::Low => ConfidenceLevel::Medium,
            _ => ConfidenceLevel::High,
        }
    }

    /// Bucket a numeric estimate: > 0.7 high, > 0.4 medium, otherwise low.
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            ConfidenceLevel::High
        } else if score > 0.4 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    /// Clamp a level into the range allowed for `method`.
    /// Explicit results are never low and fallback results are never high.
    pub fn reconcile(self, method: ExtractionMethod) -> Self {
        match method {
            ExtractionMethod::Explicit => self.max(ConfidenceLevel::Medium),
            ExtractionMethod::Fallback => self.min(ConfidenceLevel::Medium),
            _ => self,
        }
    }
}

// ============ Pattern Matches ============

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Question,
    Analysis,
    Decision,
    Step,
    Consideration,
    Conclusion,
}

impl PatternType {
    pub const ALL: [PatternType; 6] = [
        PatternType::Question,
        PatternType::Analysis,
        PatternType::Decision,
        PatternType::Step,
        PatternType::Consideration,
        PatternType::Conclusion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PatternType::Question => "question",
            PatternType::Analysis => "analysis",
            PatternType::Decision => "decision",
            PatternType::Step => "step",
            PatternType::Consideration => "consideration",
            PatternType::Conclusion => "conclusion",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPosition {
    /// UTF-8 byte offset (0-based) into the analyzed text.
    pub start: usize,
    /// UTF-8 byte offset (0-based, end-exclusive) into the analyzed text.
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMatch {
    #[serde(rename = "type")]
    pub kind: PatternType,
    pub content: String,
    pub confidence: f64,
    pub position: MatchPosition,
    pub keywords: BTreeSet<String>,
}

// ============ Extraction Result ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub content: String,
    /// Character count of the text the extraction ran against.
    pub original_length: usize,
    pub extraction_method: ExtractionMethod,
    pub confidence: ConfidenceLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<PatternMatch>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming_chunks: Option<Vec<String>>,
}

impl ExtractionResult {
    pub fn new(
        content: String,
        original_length: usize,
        method: ExtractionMethod,
        confidence: ConfidenceLevel,
    ) -> Self {
        Self {
            content,
            original_length,
            extraction_method: method,
            confidence: confidence.reconcile(method),
            patterns: None,
            cache_key: None,
            streaming_chunks: None,
        }
    }

    /// Share of the original input that was classified as reasoning.
    pub fn reasoning_ratio(&self) -> f64 {
        if self.original_length == 0 {
            return 0.0;
        }
        self.content.chars().count() as f64 / self.original_length as f64
    }
}

// ============ Streaming ============

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamPhase {
    Searching,
    Accumulating,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingState {
    pub session_id: Uuid,
    pub phase: StreamPhase,
    pub buffer: String,
    pub extracted_chunks: Vec<String>,
    /// Opening marker (or reasoning heading) matched so far.
    pub current_pattern: Option<String>,
    /// Name of the marker family that opened the span; `None` for headings.
    pub marker_family: Option<String>,
    /// Byte offset in `buffer` just past the opening marker.
    pub span_start: Option<usize>,
    pub confidence: f64,
    pub is_complete: bool,
}

impl StreamingState {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            phase: StreamPhase::Searching,
            buffer: String::new(),
            extracted_chunks: Vec::new(),
            current_pattern: None,
            marker_family: None,
            span_start: None,
            confidence: 0.0,
            is_complete: false,
        }
    }

    pub fn accumulated(&self) -> String {
        self.extracted_chunks.concat()
    }
}

impl Default for StreamingState {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Cache Stats ============

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub total_access: u64,
    pub average_age_seconds: f64,
    pub hit_rate: f64,
}

// ============ Analytics ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningMetrics {
    pub total_patterns: usize,
    pub average_confidence: f64,
    pub dominant_type: Option<PatternType>,
    pub complexity_score: f64,
    pub readability_score: f64,
    pub pattern_distribution: BTreeMap<PatternType, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningAnalytics {
    pub patterns: Vec<PatternMatch>,
    pub metrics: ReasoningMetrics,
    pub suggestions: Vec<String>,
}
