//! Turning the model's text reply into an [`AnalysisResult`].
//!
//! Models often wrap the JSON object in a Markdown fence or a sentence of
//! prose, so the first complete `{...}` value is located and only that slice
//! is deserialized. Prose after the object may contain braces of its own.

use nitrilens_core::{AnalysisError, AnalysisResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde::de::IgnoredAny;

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").unwrap());
static OBJECT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

#[derive(Deserialize)]
struct RawAnalysis {
    predicted_level: Numeric,
    confidence: Numeric,
    explanation: String,
    tube_description: String,
    matched_reference: String,
}

/// Some models quote their numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn value(self, field: &str) -> Result<f64, AnalysisError> {
        match self {
            Numeric::Number(n) => Ok(n),
            Numeric::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                AnalysisError::MalformedResponse(format!("{field} is not a number: {s:?}"))
            }),
        }
    }
}

/// Locate the JSON object inside a model reply.
pub fn extract_json(text: &str) -> Option<&str> {
    let body = FENCE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str());
    first_object(body).or_else(|| OBJECT_RE.find(body).map(|m| m.as_str()))
}

/// The first `{` that starts a complete JSON value, cut at the value's end.
fn first_object(body: &str) -> Option<&str> {
    body.match_indices('{').find_map(|(start, _)| {
        let rest = &body[start..];
        let mut values = serde_json::Deserializer::from_str(rest).into_iter::<IgnoredAny>();
        match values.next() {
            Some(Ok(_)) => Some(&rest[..values.byte_offset()]),
            _ => None,
        }
    })
}

/// Parse and normalize a model reply.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let json = extract_json(text).ok_or_else(|| {
        AnalysisError::MalformedResponse(format!("no JSON object in reply: {}", preview(text)))
    })?;

    let raw: RawAnalysis = serde_json::from_str(json)
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

    AnalysisResult::new(
        raw.predicted_level.value("predicted_level")?,
        raw.confidence.value("confidence")?,
        raw.explanation,
        raw.tube_description,
        raw.matched_reference,
    )
}

fn preview(text: &str) -> String {
    const MAX: usize = 120;
    let trimmed = text.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
