//! Presentation shell state: one image in flight at a time.

use nitrilens_core::{AnalysisError, AnalysisResult, ConcentrationUnit};
use nitrilens_media::ImagePayload;
use nitrilens_understanding::Analyzer;
use tracing::debug;

pub const MISSING_KEY: &str = "Please provide a Gemini API key";

#[derive(Debug, Clone, PartialEq)]
pub enum ShellState {
    Idle,
    Waiting,
    Done(AnalysisResult),
    Error(AnalysisError),
}

impl ShellState {
    fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Waiting => "waiting",
            Self::Done(_) => "done",
            Self::Error(_) => "error",
        }
    }
}

pub struct Shell {
    analyzer: Analyzer,
    state: ShellState,
}

impl Shell {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer,
            state: ShellState::Idle,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &ShellState {
        &self.state
    }

    /// Run one analysis. Without a credential the request is refused
    /// before reaching the analyzer.
    pub async fn submit(
        &mut self,
        image: &ImagePayload,
        credential: Option<&str>,
        unit: ConcentrationUnit,
    ) -> &ShellState {
        let credential = match credential.map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) => c,
            None => {
                self.transition(ShellState::Error(AnalysisError::InvalidCredential(
                    MISSING_KEY.to_string(),
                )));
                return &self.state;
            }
        };

        self.transition(ShellState::Waiting);
        let next = match self.analyzer.analyze(&image.data, credential, unit).await {
            Ok(result) => ShellState::Done(result),
            Err(e) => ShellState::Error(e),
        };
        self.transition(next);
        &self.state
    }

    fn transition(&mut self, next: ShellState) {
        debug!(from = self.state.label(), to = next.label(), "Shell state change");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use nitrilens_understanding::MockBackend;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    fn shell(backend: MockBackend) -> Shell {
        Shell::new(Analyzer::new(Arc::new(backend)))
    }

    fn image() -> ImagePayload {
        ImagePayload::from_bytes("test.png", PNG.to_vec(), None).unwrap()
    }

    #[tokio::test]
    async fn missing_key_is_refused() {
        let mut shell = shell(MockBackend::replying("{}"));
        assert_eq!(shell.state(), &ShellState::Idle);

        let state = shell.submit(&image(), None, ConcentrationUnit::MgPerL).await;
        assert_eq!(
            state,
            &ShellState::Error(AnalysisError::InvalidCredential(MISSING_KEY.into()))
        );
    }

    #[tokio::test]
    async fn non_json_reply_ends_in_error_state() {
        let mut shell = shell(MockBackend::replying("no idea"));
        let state = shell
            .submit(&image(), Some("key"), ConcentrationUnit::MgPerL)
            .await;
        assert!(matches!(
            state,
            ShellState::Error(AnalysisError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn success_ends_in_done_state() {
        let reply = r#"{"predicted_level": 0.5, "confidence": 92, "explanation": "pale pink",
            "tube_description": "pale", "matched_reference": "0.5 mg/L"}"#;
        let mut shell = shell(MockBackend::replying(reply));
        match shell
            .submit(&image(), Some("key"), ConcentrationUnit::MgPerL)
            .await
        {
            ShellState::Done(result) => assert_eq!(result.confidence(), 92),
            other => panic!("unexpected state {other:?}"),
        }
    }
}
