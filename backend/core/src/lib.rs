pub mod error;
pub mod traits;
pub mod types;

pub use error::AnalysisError;
pub use traits::{VisionBackend, VisionRequest};
pub use types::{
    AnalysisResult, ConcentrationUnit, ConfidenceBand, HistoryEntry, HistoryStats, ReferenceScale,
};
