//! Response parser - normalizes untrusted model output
//!
//! The remote model is asked for a strict JSON object but routinely returns
//! it wrapped in markdown fences, double-encoded inside a JSON string, or as
//! plain prose. Parsing is an ordered chain of strategies; each either
//! produces a result or declines, and the raw-text tail always produces one.
//! Parsing never fails on non-empty input: confidence is the quality signal.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Default confidence when the payload parsed cleanly but omitted the field
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Confidence assigned when the entire payload is taken as raw text
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Summary note attached when the payload carried no usable summary
const GENERIC_SUMMARY_NOTE: &str = "Enhanced for clarity and impact";

/// Summary note attached on the raw-text fallback path
const FALLBACK_SUMMARY_NOTE: &str = "Response was not valid JSON; applied best-effort parsing";

/// Normalized result of one successful enhancement. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementResult {
    pub enhanced_content: String,
    pub improvements_summary: Vec<String>,
    pub confidence: f64,
}

/// Which strategy in the chain produced the result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    StrictJson,
    FencedJson,
    DoubleEncodedJson,
    RawText,
}

impl std::fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StrictJson => write!(f, "strict-json"),
            Self::FencedJson => write!(f, "fenced-json"),
            Self::DoubleEncodedJson => write!(f, "double-encoded-json"),
            Self::RawText => write!(f, "raw-text"),
        }
    }
}

/// Parse an arbitrary non-empty payload into an EnhancementResult.
///
/// Tries each strategy in order; the raw-text tail cannot decline, so this
/// always returns a result. Empty payloads are rejected upstream by the
/// orchestrator and are not a parser concern.
pub fn parse_response(raw: &str) -> EnhancementResult {
    let (result, strategy) = parse_response_with_strategy(raw);
    debug!("Parsed enhancement response via {} strategy", strategy);
    result
}

/// Parse and report which strategy handled the payload
pub fn parse_response_with_strategy(raw: &str) -> (EnhancementResult, ParseStrategy) {
    if let Some(result) = try_strict_json(raw) {
        return (result, ParseStrategy::StrictJson);
    }
    if let Some(result) = try_fenced_json(raw) {
        return (result, ParseStrategy::FencedJson);
    }
    if let Some(result) = try_double_encoded_json(raw) {
        return (result, ParseStrategy::DoubleEncodedJson);
    }
    (raw_text_fallback(raw), ParseStrategy::RawText)
}

/// Strategy 1: the payload is the required JSON object as-is
fn try_strict_json(raw: &str) -> Option<EnhancementResult> {
    let value: Value = serde_json::from_str(raw.trim()).ok()?;
    result_from_value(&value)
}

/// Strategy 2: the object is wrapped in markdown code fences
fn try_fenced_json(raw: &str) -> Option<EnhancementResult> {
    let inner = strip_code_fences(raw)?;
    let value: Value = serde_json::from_str(&inner).ok()?;
    result_from_value(&value)
}

/// Strategy 3: the payload parses to a JSON string that itself contains the object
fn try_double_encoded_json(raw: &str) -> Option<EnhancementResult> {
    let outer: Value = serde_json::from_str(raw.trim()).ok()?;
    let inner_text = outer.as_str()?;
    let inner: Value = serde_json::from_str(inner_text.trim()).ok()?;
    result_from_value(&inner)
}

/// Strategy 4: treat the whole payload as the enhanced content
fn raw_text_fallback(raw: &str) -> EnhancementResult {
    EnhancementResult {
        enhanced_content: normalize_text(raw),
        improvements_summary: vec![FALLBACK_SUMMARY_NOTE.to_string()],
        confidence: FALLBACK_CONFIDENCE,
    }
}

/// Extract a result from a parsed JSON value exposing `enhancedContent`
fn result_from_value(value: &Value) -> Option<EnhancementResult> {
    let object = value.as_object()?;
    let content = object.get("enhancedContent")?.as_str()?;

    let summary = coerce_summary(object.get("improvementsSummary"));
    let confidence = coerce_confidence(object.get("confidence"));

    Some(EnhancementResult {
        enhanced_content: normalize_text(content),
        improvements_summary: summary,
        confidence,
    })
}

/// Coerce the summary field to an ordered list of strings.
/// A bare string becomes a one-element list; anything else unusable
/// degrades to a single generic note.
fn coerce_summary(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => {
            let summary: Vec<String> = items
                .iter()
                .filter_map(|item| item.as_str().map(|s| s.to_string()))
                .collect();
            if summary.is_empty() && !items.is_empty() {
                vec![GENERIC_SUMMARY_NOTE.to_string()]
            } else {
                summary
            }
        }
        Some(Value::String(single)) => vec![single.clone()],
        _ => vec![GENERIC_SUMMARY_NOTE.to_string()],
    }
}

/// Clamp confidence into [0, 1], defaulting when absent or non-numeric
fn coerce_confidence(value: Option<&Value>) -> f64 {
    match value.and_then(|v| v.as_f64()) {
        Some(n) => n.clamp(0.0, 1.0),
        None => DEFAULT_CONFIDENCE,
    }
}

/// Strip surrounding markdown code-fence markers, returning the inner text
fn strip_code_fences(raw: &str) -> Option<String> {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)^\s*```[a-zA-Z0-9_-]*\s*\n?(.*?)\n?\s*```\s*$").unwrap()
    });

    FENCE_RE.captures(raw).and_then(|caps| {
        let inner = caps.get(1)?.as_str().trim();
        if inner.is_empty() {
            None
        } else {
            Some(inner.to_string())
        }
    })
}

/// Normalize extracted text into stable, display-ready form.
///
/// Un-escapes literal `\n` sequences, collapses runs of spaces and tabs,
/// trims line ends, limits consecutive blank lines to one, and trims the
/// whole string. The transform is a fixed point: applying it to its own
/// output yields an identical string.
pub fn normalize_text(text: &str) -> String {
    static HORIZONTAL_WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());
    static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

    let unescaped = text.replace("\\n", "\n").replace("\r\n", "\n");

    let collapsed: String = unescaped
        .lines()
        .map(|line| HORIZONTAL_WS_RE.replace_all(line, " ").trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n");

    BLANK_LINES_RE
        .replace_all(&collapsed, "\n\n")
        .trim()
        .to_string()
}
