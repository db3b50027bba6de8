use async_trait::async_trait;

use crate::error::AnalysisError;

/// A hosted multimodal model that can answer a text prompt about an image.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Backend name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Submit the prompt and image, returning the model's raw text reply.
    async fn generate(&self, request: &VisionRequest) -> Result<String, AnalysisError>;
}

/// One prompt-plus-image submission.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub credential: String,
    pub model: String,
    pub prompt: String,
    pub image: Vec<u8>,
    pub mime_type: String,
}
