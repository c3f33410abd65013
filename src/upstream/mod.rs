//! The external multimodal model that performs the actual analysis.

pub mod gemini;
pub mod parse;
pub mod prompt;
pub mod schema;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AnalysisResult, Language};

pub use gemini::GeminiClient;
pub use parse::parse_analysis;

/// Everything the model needs for one analysis
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub video_base64: String,
    pub mime_type: String,
    pub language: Language,
    /// Request vocal and image analysis as well
    pub premium: bool,
    pub topic: Option<String>,
    pub audience: Option<String>,
    pub goal: Option<String>,
}

/// A service that turns a recording into structured feedback
///
/// Implementations make a single attempt; failures are reported to the
/// caller and never retried here.
#[async_trait]
pub trait SpeechAnalyzer: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult>;
}
