//! Test-kit understanding: ask a vision model to read a nitrite test photo.

pub mod analyzer;
pub mod backends;
pub mod parse;
pub mod prompt;

pub use analyzer::{Analyzer, analyze};
pub use backends::{GeminiBackend, MockBackend};
pub use parse::{extract_json, parse_analysis};
pub use prompt::PromptTemplate;
