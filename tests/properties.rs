use proptest::prelude::*;
use reasoning_lens_lib::models::{ConfidenceLevel, ExtractionMethod};
use reasoning_lens_lib::services::reasoning::cache::{cache_key, ResultCache};
use reasoning_lens_lib::services::reasoning::enhancer::{clean_content, truncate_content, TRUNCATION_MARKER};
use reasoning_lens_lib::services::reasoning::patterns::marker_token_re;
use reasoning_lens_lib::services::{
    extract_uncached, remove_reasoning_from_content, ExtractorConfig, ReasoningEngine,
};

fn reasoning_body() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ,;:'()-]{0,120}[a-z.?]"
}

fn wrap_thinking(body: &str) -> String {
    format!("<thinking>{}</thinking>\n\nHere's the answer: ok.", body)
}

fn marker_soup() -> impl Strategy<Value = String> {
    let pieces = vec![
        "<think>", "</think>", "<thinking>", "</thinking>", "<reasoning>", "</reasoning>",
        "[thinking]", "[/reasoning]", "```thinking\n", "```", "word", " ", "\n", "\n\n",
        "because", "Here's the answer:", ".", "<",
    ];
    prop::collection::vec(prop::sample::select(pieces), 0..40).prop_map(|p| p.concat())
}

proptest! {
    #[test]
    fn explicit_block_round_trips(body in reasoning_body()) {
        let result = extract_uncached(&wrap_thinking(&body), 10_000, &ExtractorConfig::default())
            .expect("explicit block should extract");
        prop_assert_eq!(result.content, clean_content(&body));
        prop_assert_eq!(result.extraction_method, ExtractionMethod::Explicit);
        prop_assert_eq!(result.confidence, ConfidenceLevel::High);
    }

    #[test]
    fn removal_leaves_no_marker_tokens(input in marker_soup()) {
        let out = remove_reasoning_from_content(&input, None);
        prop_assert!(!marker_token_re().is_match(&out), "marker left in {:?}", out);
    }

    #[test]
    fn truncation_respects_bound(
        text in prop::collection::vec(any::<char>(), 0..3000).prop_map(String::from_iter),
        max_length in 0usize..2000,
    ) {
        let out = truncate_content(&text, max_length);
        let bound = max_length + TRUNCATION_MARKER.chars().count();
        prop_assert!(out.chars().count() <= bound);
    }

    #[test]
    fn streaming_matches_batch_for_explicit_blocks(body in reasoning_body()) {
        let text = wrap_thinking(&body);
        let engine = ReasoningEngine::new();
        let batch = engine.extract_reasoning(&text, 10_000, false).expect("batch result");

        let mut stream = engine.create_streaming_extractor();
        for ch in text.chars() {
            stream.process_chunk(&ch.to_string());
        }
        let streamed = stream.finalize().expect("streamed result");

        prop_assert_eq!(streamed.content, batch.content);
        prop_assert_eq!(streamed.extraction_method, ExtractionMethod::Explicit);
    }

    #[test]
    fn colliding_key_with_different_text_misses(
        tail_a in "[a-z]{8}",
        tail_b in "[a-z]{8}",
    ) {
        prop_assume!(tail_a != tail_b);
        let prefix = "p".repeat(500);
        let a = format!("{}{}", prefix, tail_a);
        let b = format!("{}{}", prefix, tail_b);
        let key = cache_key(&a, 500);
        prop_assert_eq!(&key, &cache_key(&b, 500));

        let config = ExtractorConfig::default();
        let mut cache = ResultCache::new(&config);
        let stored = extract_uncached(&wrap_thinking("Because it collides."), 10_000, &config)
            .expect("result to store");
        cache.set(&key, stored, &a, 10_000);
        prop_assert!(cache.get(&key, &b, 10_000).is_none());
        prop_assert!(cache.get(&key, &a, 10_000).is_some());
    }

    #[test]
    fn cached_extraction_is_idempotent(body in reasoning_body()) {
        let engine = ReasoningEngine::new();
        let text = wrap_thinking(&body);
        let first = engine.extract_reasoning(&text, 10_000, true);
        let second = engine.extract_reasoning(&text, 10_000, true);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn cached_extraction_honors_each_limit(
        sentence in "[A-Z][a-z]{3,10}( [a-z]{2,8}){4,9}\\.",
        repeats in 10usize..60,
        max_length in 50usize..400,
    ) {
        let engine = ReasoningEngine::new();
        let text = wrap_thinking(&vec![sentence.as_str(); repeats].join(" "));
        let _ = engine.extract_reasoning(&text, 10_000, true);
        let limited = engine.extract_reasoning(&text, max_length, true).expect("limited result");
        let bound = max_length + TRUNCATION_MARKER.chars().count();
        prop_assert!(limited.content.chars().count() <= bound);
    }

    #[test]
    fn method_and_confidence_stay_consistent(input in marker_soup()) {
        if let Some(result) = extract_uncached(&input, 10_000, &ExtractorConfig::default()) {
            prop_assert!(!(result.extraction_method == ExtractionMethod::Explicit
                && result.confidence == ConfidenceLevel::Low));
            prop_assert!(!(result.extraction_method == ExtractionMethod::Fallback
                && result.confidence == ConfidenceLevel::High));
            prop_assert!(!result.content.trim().is_empty());
        }
    }
}
