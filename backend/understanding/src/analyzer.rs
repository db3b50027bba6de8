use std::sync::Arc;
use std::time::Instant;

use tracing::info;
use uuid::Uuid;

use nitrilens_core::{
    AnalysisError, AnalysisResult, ConcentrationUnit, VisionBackend, VisionRequest,
};
use nitrilens_logging::{AnalysisEvent, EventLogger};
use nitrilens_media::sniff_image_type;

use crate::backends::gemini::DEFAULT_MODEL;
use crate::parse::parse_analysis;
use crate::prompt::PromptTemplate;

/// Analyze one test-kit photo with the default model, reporting in mg/L.
///
/// One backend call, no retries. A blank credential fails before any
/// network traffic.
pub async fn analyze(
    backend: &dyn VisionBackend,
    image_bytes: &[u8],
    credential: &str,
    template: &PromptTemplate,
) -> Result<AnalysisResult, AnalysisError> {
    run(
        backend,
        DEFAULT_MODEL,
        template,
        ConcentrationUnit::default(),
        image_bytes,
        credential,
    )
    .await
}

/// Analysis client bound to a backend, model and prompt.
#[derive(Clone)]
pub struct Analyzer {
    backend: Arc<dyn VisionBackend>,
    model: String,
    template: PromptTemplate,
}

impl Analyzer {
    pub fn new(backend: Arc<dyn VisionBackend>) -> Self {
        Self {
            backend,
            model: DEFAULT_MODEL.to_string(),
            template: PromptTemplate::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn analyze(
        &self,
        image_bytes: &[u8],
        credential: &str,
        unit: ConcentrationUnit,
    ) -> Result<AnalysisResult, AnalysisError> {
        run(
            self.backend.as_ref(),
            &self.model,
            &self.template,
            unit,
            image_bytes,
            credential,
        )
        .await
    }
}

async fn run(
    backend: &dyn VisionBackend,
    model: &str,
    template: &PromptTemplate,
    unit: ConcentrationUnit,
    image_bytes: &[u8],
    credential: &str,
) -> Result<AnalysisResult, AnalysisError> {
    let request_id = Uuid::new_v4();
    let start = Instant::now();

    let outcome = async {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(AnalysisError::InvalidCredential(
                "no API key provided".to_string(),
            ));
        }
        let mime_type = sniff_image_type(image_bytes)?;

        EventLogger::log_event(
            &request_id,
            AnalysisEvent::Requested {
                backend: backend.name().to_string(),
                model: model.to_string(),
                image_bytes: image_bytes.len(),
                unit: unit.label().to_string(),
            },
        );

        let request = VisionRequest {
            credential: credential.to_string(),
            model: model.to_string(),
            prompt: template.render(unit),
            image: image_bytes.to_vec(),
            mime_type: mime_type.to_string(),
        };

        let text = backend.generate(&request).await?;
        parse_analysis(&text)
    }
    .await;

    let elapsed_ms = start.elapsed().as_millis() as u64;
    match &outcome {
        Ok(result) => {
            info!(
                %request_id,
                level = result.predicted_level(),
                confidence = result.confidence(),
                elapsed_ms,
                "Analysis complete"
            );
            EventLogger::log_event(
                &request_id,
                AnalysisEvent::Completed {
                    predicted_level: result.predicted_level(),
                    confidence: result.confidence(),
                    elapsed_ms,
                },
            );
        }
        Err(e) => {
            EventLogger::log_event(
                &request_id,
                AnalysisEvent::Failed {
                    kind: e.kind().to_string(),
                    error_msg: e.to_string(),
                },
            );
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockBackend;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    const SAMPLE: &str = r#"{
        "predicted_level": 2.0,
        "confidence": 85,
        "explanation": "...",
        "tube_description": "...",
        "matched_reference": "2.0 mg/L reference block"
    }"#;

    #[tokio::test]
    async fn returns_result_for_sample_reply() {
        let backend = MockBackend::replying(SAMPLE);
        let result = analyze(&backend, PNG, "key", &PromptTemplate::default())
            .await
            .unwrap();

        assert_eq!(result.predicted_level(), 2.0);
        assert_eq!(result.confidence(), 85);
        assert_eq!(result.explanation(), "...");
        assert_eq!(result.tube_description(), "...");
        assert_eq!(result.matched_reference(), "2.0 mg/L reference block");

        let sent = backend.last_request().unwrap();
        assert_eq!(sent.credential, "key");
        assert_eq!(sent.mime_type, "image/png");
        assert_eq!(sent.model, DEFAULT_MODEL);
        assert!(sent.prompt.contains("mg/L"));
    }

    #[tokio::test]
    async fn non_json_reply_is_malformed() {
        let backend = MockBackend::replying("Sorry, I can't help with that.");
        let err = analyze(&backend, PNG, "key", &PromptTemplate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn backend_errors_pass_through() {
        let backend = MockBackend::failing(AnalysisError::QuotaExceeded("429".into()));
        let err = analyze(&backend, PNG, "key", &PromptTemplate::default())
            .await
            .unwrap_err();
        assert_eq!(err, AnalysisError::QuotaExceeded("429".into()));
    }

    #[tokio::test]
    async fn blank_credential_skips_backend() {
        let backend = MockBackend::replying(SAMPLE);
        let err = analyze(&backend, PNG, "   ", &PromptTemplate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidCredential(_)));
        assert!(backend.last_request().is_none());
    }

    #[tokio::test]
    async fn non_image_bytes_are_rejected() {
        let backend = MockBackend::replying(SAMPLE);
        let err = analyze(&backend, b"GIF89a....", "key", &PromptTemplate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedImage(_)));
        assert!(backend.last_request().is_none());
    }

    #[tokio::test]
    async fn analyzer_uses_configured_model_and_unit() {
        let backend = Arc::new(MockBackend::replying(SAMPLE));
        let analyzer = Analyzer::new(backend.clone())
            .with_model("gemini-1.5-pro")
            .with_template(PromptTemplate::new("Level in {unit}?"));

        analyzer
            .analyze(PNG, "key", ConcentrationUnit::Ppm)
            .await
            .unwrap();

        let sent = backend.last_request().unwrap();
        assert_eq!(sent.model, "gemini-1.5-pro");
        assert_eq!(sent.prompt, "Level in ppm?");
    }
}
