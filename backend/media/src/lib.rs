use std::path::Path;

use bytes::Bytes;
use nitrilens_core::AnalysisError;
use tracing::debug;

pub mod mime_detect;

pub use mime_detect::{detect_mime_type, is_supported, sniff_image_type, IMAGE_JPEG, IMAGE_PNG};

/// A user-supplied test-kit photo, validated as JPEG or PNG.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub source: String,
    pub mime_type: &'static str,
    pub data: Bytes,
}

impl ImagePayload {
    /// Validate raw bytes. The declared type, when given, must be an accepted
    /// image type; the content itself must carry a JPEG or PNG signature.
    pub fn from_bytes(
        source: impl Into<String>,
        data: impl Into<Bytes>,
        declared_mime: Option<&str>,
    ) -> Result<Self, AnalysisError> {
        if let Some(declared) = declared_mime {
            if !is_supported(declared) {
                return Err(AnalysisError::UnsupportedImage(declared.to_string()));
            }
        }
        let data = data.into();
        let mime_type = sniff_image_type(&data)?;
        Ok(Self {
            source: source.into(),
            mime_type,
            data,
        })
    }

    /// Load a photo from disk, checking the extension first.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let source = path.display().to_string();
        if detect_mime_type(path).is_none() {
            return Err(AnalysisError::UnsupportedImage(format!(
                "{source}: expected a .jpg, .jpeg or .png file"
            ))
            .into());
        }
        let data = tokio::fs::read(path).await?;
        debug!(path = %source, bytes = data.len(), "Loaded image");
        Ok(Self::from_bytes(source, data, None)?)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
