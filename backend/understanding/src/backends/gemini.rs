use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use nitrilens_core::{AnalysisError, VisionBackend, VisionRequest};
use nitrilens_logging::redact_sensitive_data;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Google Gemini `generateContent` backend.
pub struct GeminiBackend {
    client: Client,
    base_url: String,
}

impl GeminiBackend {
    pub fn new() -> Self {
        Self {
            client: build_client(DEFAULT_TIMEOUT),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

impl Default for GeminiBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            Client::new()
        })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Map a non-success HTTP reply onto the error taxonomy.
///
/// Rate limiting wins over everything else, server faults are transport
/// problems, and any other rejection is treated as a credential failure.
pub fn classify_failure(status: StatusCode, body: &str) -> AnalysisError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.trim().to_string(), String::new()),
    };
    let detail = if message.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {}", redact_sensitive_data(&message))
    };

    if status == StatusCode::TOO_MANY_REQUESTS || api_status == "RESOURCE_EXHAUSTED" {
        AnalysisError::QuotaExceeded(detail)
    } else if status.is_server_error() {
        AnalysisError::TransportError(detail)
    } else {
        AnalysisError::InvalidCredential(detail)
    }
}

fn transport_error(e: reqwest::Error) -> AnalysisError {
    let kind = if e.is_timeout() {
        "request timed out"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    AnalysisError::TransportError(format!("{kind}: {}", redact_sensitive_data(&e.to_string())))
}

#[async_trait]
impl VisionBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &VisionRequest) -> Result<String, AnalysisError> {
        let start = Instant::now();

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: &request.prompt,
                    },
                    Part::Image {
                        inline_data: InlineData {
                            mime_type: &request.mime_type,
                            data: STANDARD.encode(&request.image),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.0,
            },
        };

        debug!(
            model = %request.model,
            image_bytes = request.image.len(),
            mime = %request.mime_type,
            "Sending request to Gemini"
        );

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &request.credential)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let err = classify_failure(status, &error_body);
            warn!(status = %status, kind = err.kind(), "Gemini rejected request");
            return Err(err);
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        let parsed: GenerateResponse = serde_json::from_slice(&bytes).map_err(|e| {
            AnalysisError::MalformedResponse(format!("unexpected Gemini envelope: {e}"))
        })?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AnalysisError::MalformedResponse(
                "Gemini returned no candidate text".to_string(),
            ));
        }

        debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            chars = text.len(),
            "Gemini responded"
        );

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/v1beta/models/gemini-2.0-flash-exp:generateContent";

    fn request() -> VisionRequest {
        VisionRequest {
            credential: "test-key".into(),
            model: DEFAULT_MODEL.into(),
            prompt: "Describe the tube".into(),
            image: vec![0x89, b'P', b'N', b'G'],
            mime_type: "image/png".into(),
        }
    }

    fn reply(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] }
            }]
        })
    }

    #[tokio::test]
    async fn sends_key_prompt_and_inline_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{ "parts": [
                    { "text": "Describe the tube" },
                    { "inlineData": { "mimeType": "image/png", "data": "iVBORw==" } }
                ]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("{\"ok\":true}")))
            .expect(1)
            .mount(&server)
            .await;

        let backend = GeminiBackend::new().with_base_url(server.uri());
        let text = backend.generate(&request()).await.unwrap();
        assert_eq!(text, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn concatenates_text_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } }]
            })))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new().with_base_url(server.uri());
        assert_eq!(backend.generate(&request()).await.unwrap(), "{\"a\":1}");
    }

    #[tokio::test]
    async fn auth_rejection_is_invalid_credential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": 400,
                    "message": "API key not valid. Please pass a valid API key.",
                    "status": "INVALID_ARGUMENT"
                }
            })))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new().with_base_url(server.uri());
        let err = backend.generate(&request()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidCredential(ref m) if m.contains("API key not valid")));
    }

    #[tokio::test]
    async fn rate_limit_is_quota_exceeded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" }
            })))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new().with_base_url(server.uri());
        let err = backend.generate(&request()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::QuotaExceeded(_)));
    }

    #[tokio::test]
    async fn empty_candidates_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new().with_base_url(server.uri());
        let err = backend.generate(&request()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        // Nothing listens on port 9 on the loopback interface.
        let backend = GeminiBackend::new()
            .with_base_url("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(2));
        let err = backend.generate(&request()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::TransportError(_)));
    }

    #[test]
    fn classify_failure_mapping() {
        assert!(matches!(
            classify_failure(StatusCode::UNAUTHORIZED, ""),
            AnalysisError::InvalidCredential(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::FORBIDDEN, "{\"error\":{\"message\":\"denied\",\"status\":\"PERMISSION_DENIED\"}}"),
            AnalysisError::InvalidCredential(_)
        ));
        assert!(matches!(
            classify_failure(
                StatusCode::FORBIDDEN,
                "{\"error\":{\"message\":\"quota\",\"status\":\"RESOURCE_EXHAUSTED\"}}"
            ),
            AnalysisError::QuotaExceeded(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::SERVICE_UNAVAILABLE, "overloaded"),
            AnalysisError::TransportError(_)
        ));
    }
}
