//! Analysis Event Logger
//!
//! Structured per-request events (requested, completed, failed) emitted under
//! the `analysis_events` target so they land in the NDJSON log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum AnalysisEvent {
    Requested {
        backend: String,
        model: String,
        image_bytes: usize,
        unit: String,
    },
    Completed {
        predicted_level: f64,
        confidence: u8,
        elapsed_ms: u64,
    },
    Failed {
        kind: String,
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: AnalysisEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Redact and emit one event, returning the entry that was logged.
    pub fn log_event(request_id: &Uuid, mut event: AnalysisEvent) -> EventLogEntry {
        if let AnalysisEvent::Failed { error_msg, .. } = &mut event {
            *error_msg = redact_sensitive_data(error_msg);
        }

        let entry = EventLogEntry {
            request_id: *request_id,
            timestamp: Utc::now(),
            event,
        };

        let payload = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: "analysis_events", request_id = %entry.request_id, event = %payload, "Analysis event");
        entry
    }
}
