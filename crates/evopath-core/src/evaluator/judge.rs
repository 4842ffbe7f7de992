//! LLM judges for the four quality dimensions

use crate::candidate::ExecutionTrace;
use crate::scores::{clamp_stars, Dimension};
use regex::Regex;
use std::sync::LazyLock;

static STARS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)STARS:\s*(\d+(?:\.\d+)?)").expect("STARS_PATTERN is a compile-time constant")
});

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)").expect("LEADING_NUMBER is a compile-time constant")
});

const TRUNCATION_MARKER: &str = "...[truncated]";

/// Parse a judge reply into clamped stars.
///
/// Looks for `STARS: n` anywhere, then for a number at the start of the
/// trimmed reply.
#[must_use]
pub fn parse_star_rating(response: &str) -> Option<f64> {
    let captured = STARS_PATTERN
        .captures(response)
        .or_else(|| LEADING_NUMBER.captures(response.trim()))?;
    captured
        .get(1)?
        .as_str()
        .parse::<f64>()
        .ok()
        .map(clamp_stars)
}

/// Keep at most `max_chars` characters, marking the cut
#[must_use]
pub fn truncate_for_prompt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
    }
}

/// Successful tool outputs, numbered by their position in the trace
#[must_use]
pub fn format_tool_outputs(trace: &ExecutionTrace) -> String {
    let mut out = String::new();
    for (i, call) in trace.tool_calls.iter().enumerate() {
        if !call.success || call.result.is_null() {
            continue;
        }
        let rendered = match &call.result {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let rendered = match rendered.char_indices().nth(500) {
            Some((byte_idx, _)) => format!("{}...", &rendered[..byte_idx]),
            None => rendered,
        };
        out.push_str(&format!("[Tool {}: {}]\n{}\n\n", i + 1, call.tool_name, rendered));
    }
    out
}

const SCALE_FOOTER: &str = "Reply with a single line in the form STARS: <1-5>.";

/// Judge prompt for one dimension; `None` for heuristic dimensions
#[must_use]
pub fn judge_prompt(dimension: Dimension, query: &str, trace: &ExecutionTrace) -> Option<String> {
    let prompt = match dimension {
        Dimension::Effectiveness => format!(
            "Judge how well the response answers the question.\n\n\
             QUESTION:\n{query}\n\nRESPONSE:\n{answer}\n\n\
             1 = no answer or off topic, 3 = partly answered, 5 = fully and correctly answered.\n\
             {SCALE_FOOTER}",
            answer = truncate_for_prompt(&trace.final_answer, 1500),
        ),
        Dimension::AnswerQuality => format!(
            "Judge the clarity, organisation and helpfulness of the answer.\n\n\
             QUESTION:\n{query}\n\nANSWER:\n{answer}\n\n\
             1 = incoherent or unhelpful, 3 = understandable but uneven, 5 = exceptionally clear.\n\
             {SCALE_FOOTER}",
            answer = truncate_for_prompt(&trace.final_answer, 1500),
        ),
        Dimension::Hallucination => format!(
            "Judge whether every claim in the answer is supported by the tool outputs, \
             which are the only source of truth.\n\n\
             TOOL OUTPUTS:\n{outputs}\nANSWER:\n{answer}\n\n\
             1 = invents or contradicts facts, 3 = a few unsupported details, 5 = fully supported.\n\
             {SCALE_FOOTER}",
            outputs = truncate_for_prompt(&format_tool_outputs(trace), 2000),
            answer = truncate_for_prompt(&trace.final_answer, 1000),
        ),
        Dimension::Specificity => format!(
            "Judge whether the answer's level of detail fits what the question needs.\n\n\
             QUESTION:\n{query}\n\nANSWER:\n{answer}\n\n\
             1 = far too vague or far too detailed, 3 = roughly right, 5 = exactly right.\n\
             {SCALE_FOOTER}",
            answer = truncate_for_prompt(&trace.final_answer, 1000),
        ),
        Dimension::TokenCost | Dimension::Latency => return None,
    };
    Some(prompt)
}
