// Pattern Library
// Declarative rule table of lexical reasoning cues, explicit marker families,
// and the shared vocabularies used by the extractors.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::models::PatternType;

/// One classification rule: a reasoning cue of type `kind`, weighted by how
/// strongly it signals deliberate reasoning.
#[derive(Debug)]
pub struct ReasoningRule {
    pub kind: PatternType,
    pub weight: f64,
    pub matcher: Regex,
}

const RULE_TABLE: &[(PatternType, f64, &str)] = &[
    (
        PatternType::Question,
        0.8,
        r"(?i)\b(?:what|why|how|which|should|could|would|is it|does|do i|can i)\b[^.!?\n]{3,}\?",
    ),
    (PatternType::Question, 0.6, r"[^\s.!?。！？][^.!?\n。！？]{8,}[?？]"),
    (
        PatternType::Analysis,
        0.7,
        r"(?i)\b(?:analy[sz]e|analy[sz]ing|analysis|examin(?:e|ing)|look(?:ing)? (?:at|into)|let me (?:think|check|see|consider)|evaluat(?:e|ing)|break(?:ing)? (?:this|it) down)\b",
    ),
    (PatternType::Analysis, 0.6, r"分析|考虑一下|让我想想|仔细看"),
    (
        PatternType::Decision,
        0.7,
        r"(?i)\b(?:i(?:'ll| will) (?:use|go with|choose|pick)|decid(?:e|ed|ing)|cho(?:ose|se|osing)|the best (?:option|approach|choice)|opt(?:ed)? for|going to (?:use|go with)|settle on)\b",
    ),
    (PatternType::Decision, 0.6, r"决定|选择|采用"),
    (
        PatternType::Step,
        0.5,
        r"(?i)\b(?:first(?:ly)?|second(?:ly)?|third(?:ly)?|next|then|finally|after that|step \d+)\b",
    ),
    (PatternType::Step, 0.5, r"首先|其次|然后|接下来|最后"),
    (
        PatternType::Consideration,
        0.6,
        r"(?i)\b(?:however|although|on the other hand|alternatively|trade-?offs?|edge cases?|keep in mind|it depends|unless|but what if)\b",
    ),
    (PatternType::Consideration, 0.5, r"但是|不过|另一方面|需要注意"),
    (
        PatternType::Conclusion,
        0.8,
        r"(?i)\b(?:therefore|thus|hence|in conclusion|as a result|this means|which means|so the (?:answer|solution|result)|overall)\b",
    ),
    (PatternType::Conclusion, 0.7, r"因此|所以|总之|综上"),
];

pub fn reasoning_rules() -> &'static [ReasoningRule] {
    static RULES: OnceLock<Vec<ReasoningRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        RULE_TABLE
            .iter()
            .map(|(kind, weight, pattern)| ReasoningRule {
                kind: *kind,
                weight: *weight,
                matcher: Regex::new(pattern).expect("reasoning rule regex"),
            })
            .collect()
    })
}

/// Distinct rule types that match anywhere in `text`.
pub fn matched_types(text: &str) -> HashSet<PatternType> {
    reasoning_rules()
        .iter()
        .filter(|rule| rule.matcher.is_match(text))
        .map(|rule| rule.kind)
        .collect()
}

// ============ Explicit Markers ============

/// A family of synonymous open/close delimiters around reasoning content.
#[derive(Debug)]
pub struct MarkerFamily {
    pub name: &'static str,
    pub open: Regex,
    pub close: Regex,
    /// `open (content) close`, lazy, across lines.
    pub block: Regex,
}

const MARKER_TABLE: &[(&str, &str, &str)] = &[
    ("thinking", r"<thinking(?:\s[^>]*)?>", r"</thinking\s*>"),
    ("think", r"<think(?:\s[^>]*)?>", r"</think\s*>"),
    ("reasoning", r"<reasoning(?:\s[^>]*)?>", r"</reasoning\s*>"),
    ("thought", r"<thought(?:\s[^>]*)?>", r"</thought\s*>"),
    ("reflection", r"<reflection(?:\s[^>]*)?>", r"</reflection\s*>"),
    ("bracket", r"\[(?:thinking|reasoning)\]", r"\[/(?:thinking|reasoning)\]"),
    ("fenced", r"```(?:thinking|reasoning)[ \t]*\n", r"\n?```"),
];

pub fn marker_families() -> &'static [MarkerFamily] {
    static FAMILIES: OnceLock<Vec<MarkerFamily>> = OnceLock::new();
    FAMILIES.get_or_init(|| {
        MARKER_TABLE
            .iter()
            .map(|(name, open, close)| MarkerFamily {
                name,
                open: Regex::new(&format!("(?i){}", open)).expect("marker open regex"),
                close: Regex::new(&format!("(?i){}", close)).expect("marker close regex"),
                block: Regex::new(&format!("(?is){}(.*?){}", open, close))
                    .expect("marker block regex"),
            })
            .collect()
    })
}

pub fn marker_family(name: &str) -> Option<&'static MarkerFamily> {
    marker_families().iter().find(|f| f.name == name)
}

/// Any distinctive explicit marker token, opening or closing. The bare fence
/// that closes a fenced block is not distinctive and is left out.
pub fn marker_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let mut alternatives: Vec<String> = Vec::new();
        for (name, open, close) in MARKER_TABLE {
            alternatives.push(open.to_string());
            if *name != "fenced" {
                alternatives.push(close.to_string());
            }
        }
        Regex::new(&format!("(?i){}", alternatives.join("|"))).expect("marker token regex")
    })
}

// ============ Structural Cues ============

/// Heading or bold label whose title is reasoning vocabulary. Group `rest`
/// holds any inline text after a bold label.
pub fn reasoning_heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(?:#{1,6}\s*|\*\*\s*)(?:my\s+)?(?:thinking|thoughts?|thought process|reasoning|analysis|reflection|internal monologue|思考过程|思考|推理过程|推理|分析)\b(?:\s+process)?\s*[:：]?\s*(?:\*\*)?\s*[:：]?\s*(?P<rest>.*)$",
        )
        .expect("reasoning heading regex")
    })
}

/// Any markdown heading or bold label line; ends a structural section.
pub fn section_boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:#{1,6}\s+\S|\*\*[^*\n]+\*\*\s*[:：]?)").expect("section boundary regex")
    })
}

/// Lines that open the final answer.
pub fn final_answer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(?:\*\*)?\s*(?:here(?:'s|’s| is| are)\b|final answer|the answer\b|answer\s*[:：]|in summary\b|to summarize\b|in conclusion\b|summary\s*[:：]|so,? the answer\b|solution\s*[:：]|综上所述|总之|答案|最终答案|结论[:：])",
        )
        .expect("final answer regex")
    })
}

/// Fences, numbered or bulleted list items, markdown headings.
pub fn structured_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:```|~~~|\d+[.)]\s|[-*+]\s|#{1,6}\s)").expect("structured line regex")
    })
}

/// Existing heading or emphasis structure in a block of text.
pub fn existing_structure_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*#{1,6}\s|\*\*[^*\n]+\*\*|__[^_\n]+__").expect("structure regex")
    })
}

// ============ Quality Indicators ============

pub fn reasoning_verb_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:think|thinking|consider|considering|analy[sz]e|wonder|figure out|determine|evaluate|suppose|assume|realize|need to|let me|i should|i need|let's see|hmm)\b|让我|我需要|考虑|想想",
        )
        .expect("reasoning verb regex")
    })
}

pub fn connective_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:because|since|therefore|thus|hence|however|so that|which means|as a result|otherwise|consequently)\b|因为|所以|因此|但是",
        )
        .expect("connective regex")
    })
}

pub fn causal_family_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:because|since|therefore|thus|hence|so|as a result|consequently|due to)\b|因为|所以|因此|由于",
        )
        .expect("causal regex")
    })
}

pub fn sequential_family_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:first|then|next|finally|afterwards|after that|before|subsequently)\b|首先|然后|接着|最后",
        )
        .expect("sequential regex")
    })
}

/// Fenced code markers and function/class keywords.
pub fn code_like_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"```|\bfunction\b|\bclass\b|\bdef\s+\w+\s*\(|\bfn\s+\w+\s*\(").expect("code regex")
    })
}

// ============ Re-sectioning Cues ============

pub fn step_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:first|second|then|next|step|finally)\b|首先|然后|步骤").expect("step word regex")
    })
}

pub fn option_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:option|options|alternatively|either|instead|approach|choose|versus|vs)\b|选项|方案")
            .expect("option word regex")
    })
}

// ============ Stop Words ============

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "have", "this", "that", "with", "from", "they", "will", "would",
    "there", "their", "what", "which", "when", "where", "who", "how", "why", "about", "into",
    "than", "then", "them", "these", "those", "some", "such", "its", "also", "just", "very",
    "been", "being", "were", "does", "did", "doing", "should", "could", "may", "might", "must",
    "shall", "let", "lets", "let's", "i'm", "it's", "don't", "here", "more", "most", "other",
    "only", "own", "same", "too", "each", "both", "few", "because", "while", "of", "over",
    "under", "again", "further", "once",
    "的", "了", "是", "在", "和", "与", "也", "就", "都", "而", "及", "或", "这个", "那个", "我们",
    "你们", "他们", "一个", "没有", "什么", "因为", "所以", "但是", "如果", "这样", "可以",
];

pub fn stop_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| STOP_WORDS.iter().copied().collect())
}
