pub mod gemini;
pub mod mock;

pub use gemini::GeminiBackend;
pub use mock::MockBackend;
