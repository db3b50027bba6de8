use std::sync::Mutex;

use async_trait::async_trait;
use nitrilens_core::{AnalysisError, VisionBackend, VisionRequest};

/// A backend that returns a canned reply and remembers the last request.
pub struct MockBackend {
    reply: Result<String, AnalysisError>,
    last_request: Mutex<Option<VisionRequest>>,
}

impl MockBackend {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing(error: AnalysisError) -> Self {
        Self {
            reply: Err(error),
            last_request: Mutex::new(None),
        }
    }

    pub fn last_request(&self) -> Option<VisionRequest> {
        self.last_request.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl VisionBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &VisionRequest) -> Result<String, AnalysisError> {
        if let Ok(mut guard) = self.last_request.lock() {
            *guard = Some(request.clone());
        }
        self.reply.clone()
    }
}
