use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AnalysisError;

/// Interpretation of one test-kit photo, as returned by the AI service.
///
/// Only constructed through [`AnalysisResult::new`], which normalizes the
/// numeric fields, so every value in circulation satisfies
/// `0 <= confidence <= 100` and `predicted_level >= 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    predicted_level: f64,
    confidence: u8,
    explanation: String,
    tube_description: String,
    matched_reference: String,
}

impl AnalysisResult {
    /// Build a result from raw model output.
    ///
    /// Confidence is rounded and clamped to [0, 100]; a negative level is
    /// clamped to zero. Non-finite numbers are rejected.
    pub fn new(
        predicted_level: f64,
        confidence: f64,
        explanation: impl Into<String>,
        tube_description: impl Into<String>,
        matched_reference: impl Into<String>,
    ) -> Result<Self, AnalysisError> {
        if !predicted_level.is_finite() {
            return Err(AnalysisError::MalformedResponse(format!(
                "predicted_level is not a finite number: {predicted_level}"
            )));
        }
        if !confidence.is_finite() {
            return Err(AnalysisError::MalformedResponse(format!(
                "confidence is not a finite number: {confidence}"
            )));
        }

        Ok(Self {
            predicted_level: predicted_level.max(0.0),
            confidence: confidence.round().clamp(0.0, 100.0) as u8,
            explanation: explanation.into(),
            tube_description: tube_description.into(),
            matched_reference: matched_reference.into(),
        })
    }

    pub fn predicted_level(&self) -> f64 {
        self.predicted_level
    }

    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn tube_description(&self) -> &str {
        &self.tube_description
    }

    pub fn matched_reference(&self) -> &str {
        &self.matched_reference
    }

    pub fn band(&self) -> ConfidenceBand {
        ConfidenceBand::from_confidence(self.confidence)
    }
}

/// Unit the concentration is reported in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcentrationUnit {
    #[default]
    #[serde(rename = "mg/L")]
    MgPerL,
    #[serde(rename = "ppm")]
    Ppm,
}

impl ConcentrationUnit {
    pub fn label(&self) -> &'static str {
        match self {
            Self::MgPerL => "mg/L",
            Self::Ppm => "ppm",
        }
    }
}

impl fmt::Display for ConcentrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ConcentrationUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mg/l" | "mgl" | "mg_per_l" => Ok(Self::MgPerL),
            "ppm" => Ok(Self::Ppm),
            other => Err(format!("unknown unit '{other}', expected mg/L or ppm")),
        }
    }
}

/// Swatch levels printed on the kit's reference chart.
pub struct ReferenceScale;

impl ReferenceScale {
    pub const LEVELS: [f64; 6] = [0.0, 0.5, 1.0, 2.0, 3.0, 5.0];

    /// Closest reference swatch to `level`.
    pub fn nearest(level: f64) -> f64 {
        Self::LEVELS
            .iter()
            .copied()
            .min_by(|a, b| (a - level).abs().total_cmp(&(b - level).abs()))
            .unwrap_or(0.0)
    }

    /// Comma-separated list used in the prompt, e.g. `0.0, 0.5, ..., 5.0`.
    pub fn describe() -> String {
        Self::LEVELS
            .iter()
            .map(|l| format!("{l:.1}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// How much to trust a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    VeryHigh,
    High,
    Moderate,
    Low,
}

impl ConfidenceBand {
    pub fn from_confidence(confidence: u8) -> Self {
        match confidence {
            90..=u8::MAX => Self::VeryHigh,
            75..=89 => Self::High,
            60..=74 => Self::Moderate,
            _ => Self::Low,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::VeryHigh => "Very High Confidence - Excellent match!",
            Self::High => "High Confidence - Good match",
            Self::Moderate => "Moderate Confidence - Consider retaking image",
            Self::Low => "Low Confidence - Please check image quality",
        }
    }
}

/// One successful analysis kept for the current session.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub predicted_level: f64,
    pub confidence: u8,
    pub unit: ConcentrationUnit,
    pub explanation: String,
}

impl HistoryEntry {
    pub fn from_result(result: &AnalysisResult, unit: ConcentrationUnit) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            predicted_level: result.predicted_level(),
            confidence: result.confidence(),
            unit,
            explanation: result.explanation().to_string(),
        }
    }
}

/// Aggregates over a session's history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryStats {
    pub total: usize,
    pub average_level: f64,
    pub average_confidence: f64,
}

impl HistoryStats {
    pub fn compute(entries: &[HistoryEntry]) -> Self {
        let total = entries.len();
        if total == 0 {
            return Self {
                total,
                average_level: 0.0,
                average_confidence: 0.0,
            };
        }
        let n = total as f64;
        Self {
            total,
            average_level: entries.iter().map(|e| e.predicted_level).sum::<f64>() / n,
            average_confidence: entries.iter().map(|e| f64::from(e.confidence)).sum::<f64>() / n,
        }
    }
}
