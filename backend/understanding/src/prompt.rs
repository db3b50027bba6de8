//! Instruction text sent alongside the test-kit photo.

use std::path::Path;

use nitrilens_core::{ConcentrationUnit, ReferenceScale};

const UNIT_PLACEHOLDER: &str = "{unit}";
const LEVELS_PLACEHOLDER: &str = "{levels}";

const DEFAULT_TEMPLATE: &str = r#"You are an expert at analyzing water test kit results. Please analyze this nitrite test kit image.

The image shows a test tube with colored liquid and a reference color chart. Please:

1. Identify the test tube in the image (usually a clear glass tube with pink or clear liquid)
2. Compare the color of the liquid in the test tube to the reference color chart shown in the image
3. Determine which reference color ({levels} {unit}) best matches the test tube liquid
4. Provide a confidence level (0-100) for your assessment

Respond with only a JSON object in the following format:
{
    "predicted_level": <number>,
    "confidence": <integer 0-100>,
    "explanation": "<brief explanation of what you observed>",
    "tube_description": "<description of the test tube liquid color>",
    "matched_reference": "<description of the matching reference color>"
}

Be very precise in your color matching. Look carefully at the liquid inside the test tube and compare it to each reference color block."#;

/// Instruction template with `{unit}` and `{levels}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Read a custom template from disk.
    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        std::fs::read_to_string(path).map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Fill in the placeholders for one request.
    pub fn render(&self, unit: ConcentrationUnit) -> String {
        self.text
            .replace(UNIT_PLACEHOLDER, unit.label())
            .replace(LEVELS_PLACEHOLDER, &ReferenceScale::describe())
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}
