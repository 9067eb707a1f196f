use anyhow::{bail, Context, Result};
use reasoning_lens_lib::models::{CacheStats, ExtractionResult, ReasoningAnalytics};
use reasoning_lens_lib::services::{
    get_reasoning_analytics, remove_reasoning_from_content, ConfigStore, ExtractorConfig,
    ReasoningEngine,
};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use tracing::info;

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn parse_usize(args: &[String], key: &str) -> Result<Option<usize>> {
    parse_arg_value(args, key)
        .map(|raw| {
            raw.parse::<usize>()
                .with_context(|| format!("{} expects a non-negative integer, got {:?}", key, raw))
        })
        .transpose()
}

fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("read stdin failed")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("read file failed: {}", path))
}

fn load_config(config_dir: Option<String>) -> Result<ExtractorConfig> {
    let dir = match config_dir {
        Some(dir) => PathBuf::from(dir),
        None => match ConfigStore::default_config_dir() {
            Some(dir) => dir,
            None => return Ok(ExtractorConfig::default().with_env_overrides()),
        },
    };
    let store = ConfigStore::new(dir);
    let config = store
        .load()
        .with_context(|| format!("load config failed: {}", store.config_file().display()))?;
    Ok(config.with_env_overrides())
}

/// Replay `text` through a streaming session in `chunk_chars`-sized chunks.
/// Returns the finalized result and how many partial results were emitted.
fn run_streaming(engine: &ReasoningEngine, text: &str, chunk_chars: usize) -> (Option<ExtractionResult>, usize) {
    let mut stream = engine.create_streaming_extractor();
    let chars: Vec<char> = text.chars().collect();
    let mut partials = 0;

    for piece in chars.chunks(chunk_chars) {
        let chunk: String = piece.iter().collect();
        if stream.process_chunk(&chunk).is_some() {
            partials += 1;
        }
    }

    info!(
        session = %stream.state().session_id,
        phase = ?stream.state().phase,
        partials,
        "[cli] stream replay finished"
    );
    (stream.finalize(), partials)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Output {
    file: String,
    input_chars: usize,
    streamed: bool,
    partial_results: usize,
    result: Option<ExtractionResult>,
    answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    analytics: Option<ReasoningAnalytics>,
    cache_stats: CacheStats,
}

fn main() -> Result<()> {
    reasoning_lens_lib::init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage:\n  extract_reasoning <path|-> [--max-length <n>] [--no-cache] [--stream <chunk-chars>] [--analytics] [--config <dir>] [--out <json_path>]\n\nNotes:\n  - `-` reads the message from stdin.\n  - `--stream` replays the input through a streaming session instead of the batch cascade.\n  - Without `--out` the JSON report goes to stdout."
        );
        return Ok(());
    }

    let path = args[1].clone();
    let max_length = parse_usize(&args, "--max-length")?;
    let stream_chunk = parse_usize(&args, "--stream")?;
    let use_cache = !has_flag(&args, "--no-cache");
    let with_analytics = has_flag(&args, "--analytics");
    let out_path = parse_arg_value(&args, "--out");

    if stream_chunk == Some(0) {
        bail!("--stream expects a chunk size of at least 1");
    }

    let mut config = load_config(parse_arg_value(&args, "--config"))?;
    if let Some(max_length) = max_length {
        config.max_length = max_length;
    }

    let text = read_input(&path)?;
    let engine = ReasoningEngine::with_config(config.clone());

    let (result, partial_results) = match stream_chunk {
        Some(size) => run_streaming(&engine, &text, size),
        None => (engine.extract_reasoning(&text, config.max_length, use_cache), 0),
    };

    let answer = remove_reasoning_from_content(&text, result.as_ref().map(|r| r.content.as_str()));
    let analytics = with_analytics.then(|| {
        let target = result.as_ref().map_or(text.as_str(), |r| r.content.as_str());
        get_reasoning_analytics(target)
    });

    let out = Output {
        file: path.clone(),
        input_chars: text.chars().count(),
        streamed: stream_chunk.is_some(),
        partial_results,
        result,
        answer,
        analytics,
        cache_stats: engine.cache_stats(),
    };
    let json = serde_json::to_string_pretty(&out).context("serialize report failed")?;

    let Some(out_path) = out_path else {
        println!("{}", json);
        return Ok(());
    };

    println!("File: {}", out.file);
    println!("Input: {} chars", out.input_chars);
    println!("Mode: {}", if out.streamed { "streaming" } else { "batch" });
    match &out.result {
        Some(r) => {
            println!(
                "Reasoning: {} chars, method={}, confidence={}",
                r.content.chars().count(),
                r.extraction_method.as_str(),
                r.confidence.as_str()
            );
            println!("  {}", preview(&r.content, 140));
        }
        None => println!("Reasoning: none found"),
    }
    println!("Answer: {}", preview(&out.answer, 140));

    std::fs::write(&out_path, json).with_context(|| format!("write out failed: {}", out_path))?;
    println!();
    println!("Wrote JSON: {}", out_path);

    Ok(())
}
