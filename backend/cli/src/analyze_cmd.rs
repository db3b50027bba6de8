//! `nitrilens analyze`: read test-kit photos from disk and print the readings.

use std::path::PathBuf;

use anyhow::Result;
use nitrilens_core::{AnalysisError, ConcentrationUnit};
use nitrilens_media::ImagePayload;
use nitrilens_understanding::Analyzer;
use serde_json::json;
use tracing::warn;

use crate::history::SessionHistory;
use crate::shell::{Shell, ShellState};
use crate::terminal_output::{
    note_error, note_info, note_success, note_warn, render_error, render_history, render_result,
    render_stats,
};

pub struct AnalyzeOptions {
    pub images: Vec<PathBuf>,
    pub api_key: Option<String>,
    pub unit: ConcentrationUnit,
    pub json: bool,
}

/// Analyze each image in turn. Returns `true` when every image succeeded.
pub async fn run(analyzer: Analyzer, options: AnalyzeOptions) -> Result<bool> {
    let mut shell = Shell::new(analyzer);
    let mut history = SessionHistory::new();
    let mut failures = 0usize;

    for path in &options.images {
        let source = path.display().to_string();

        let image = match ImagePayload::load(path).await {
            Ok(image) => image,
            Err(e) => {
                warn!(path = %source, error = %e, "Could not load image");
                match e.downcast_ref::<AnalysisError>() {
                    Some(err) => report_failure(&source, err, options.json),
                    None => note_error(&format!("{source}: {e:#}")),
                }
                failures += 1;
                continue;
            }
        };

        if !options.json {
            note_info(&format!("AI is analyzing {source}..."));
        }

        match shell
            .submit(&image, options.api_key.as_deref(), options.unit)
            .await
        {
            ShellState::Done(result) => {
                history.record(result, options.unit);
                if options.json {
                    let line = json!({
                        "source": source,
                        "unit": options.unit,
                        "band": result.band(),
                        "result": result,
                    });
                    println!("{line}");
                } else {
                    note_success("AI Analysis Complete!");
                    println!("{}", render_result(&source, result, options.unit));
                }
            }
            ShellState::Error(err) => {
                report_failure(&source, err, options.json);
                failures += 1;
            }
            ShellState::Idle | ShellState::Waiting => {}
        }
    }

    if !options.json {
        if history.len() > 1 {
            println!("{}", render_history(history.recent(10)));
            println!("{}", render_stats(&history.stats(), options.unit));
        } else if history.is_empty() {
            note_warn("No analyses completed.");
        }
    }

    Ok(failures == 0)
}

/// Failures always go to stderr.
fn report_failure(source: &str, err: &AnalysisError, as_json: bool) {
    if as_json {
        eprintln!("{}", failure_line(source, err));
    } else {
        note_error(&render_error(source, err));
    }
}

fn failure_line(source: &str, err: &AnalysisError) -> serde_json::Value {
    json!({
        "source": source,
        "error": err.to_string(),
        "kind": err.kind(),
        "hint": err.hint(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    use nitrilens_understanding::MockBackend;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
    const REPLY: &str = r#"{"predicted_level": 2.0, "confidence": 85, "explanation": "...",
        "tube_description": "...", "matched_reference": "2.0 mg/L reference block"}"#;

    fn write_png(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(PNG).unwrap();
        path
    }

    fn options(images: Vec<PathBuf>) -> AnalyzeOptions {
        AnalyzeOptions {
            images,
            api_key: Some("key".into()),
            unit: ConcentrationUnit::MgPerL,
            json: true,
        }
    }

    #[tokio::test]
    async fn all_images_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![write_png(&dir, "a.png"), write_png(&dir, "b.png")];
        let analyzer = Analyzer::new(Arc::new(MockBackend::replying(REPLY)));

        assert!(run(analyzer, options(images)).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_reply_reports_failure_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![write_png(&dir, "a.png"), dir.path().join("missing.png")];
        let analyzer = Analyzer::new(Arc::new(MockBackend::replying("not json")));

        assert!(!run(analyzer, options(images)).await.unwrap());
    }

    #[test]
    fn failure_line_carries_kind_and_hint() {
        let err = AnalysisError::QuotaExceeded("limit".into());
        let line = failure_line("kit.png", &err);
        assert_eq!(line["source"], "kit.png");
        assert_eq!(line["kind"], "quota_exceeded");
        assert_eq!(line["hint"], err.hint());
    }

    #[tokio::test]
    async fn unsupported_extension_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = Analyzer::new(Arc::new(MockBackend::replying(REPLY)));

        let ok = run(analyzer, options(vec![dir.path().join("kit.gif")]))
            .await
            .unwrap();
        assert!(!ok);
    }
}
