use thiserror::Error;

/// Failure of a single analysis request. Every variant is terminal for the
/// request that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("the AI service rejected the API key: {0}")]
    InvalidCredential(String),

    #[error("API quota or rate limit exceeded: {0}")]
    QuotaExceeded(String),

    #[error("the AI service returned an unreadable response: {0}")]
    MalformedResponse(String),

    #[error("could not reach the AI service: {0}")]
    TransportError(String),

    #[error("unsupported image type: {0}")]
    UnsupportedImage(String),
}

impl AnalysisError {
    /// Stable tag used in logs and HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredential(_) => "invalid_credential",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::MalformedResponse(_) => "malformed_response",
            Self::TransportError(_) => "transport_error",
            Self::UnsupportedImage(_) => "unsupported_image",
        }
    }

    /// Short hint shown to the user under the error message.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::InvalidCredential(_) => "Check the Gemini API key and try again.",
            Self::QuotaExceeded(_) => "Wait a moment before submitting another image.",
            Self::MalformedResponse(_) => "The model reply could not be interpreted. Try another photo.",
            Self::TransportError(_) => "Check your network connection.",
            Self::UnsupportedImage(_) => "Upload a JPG or PNG image.",
        }
    }
}
