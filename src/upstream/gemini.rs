use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

use super::parse::{excerpt, parse_analysis};
use super::prompt::build_prompt;
use super::schema::analysis_schema;
use super::{AnalysisRequest, SpeechAnalyzer};
use crate::config::Config;
use crate::constants::{ANALYSIS_TEMPERATURE, RAW_RESPONSE_EXCERPT_CHARS};
use crate::error::{AppError, Result};
use crate::models::AnalysisResult;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Client for the Gemini `generateContent` endpoint
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_base: &str, model: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.gemini_api_base,
            &config.gemini_model,
            &config.gemini_api_key,
            Duration::from_secs(config.upstream_timeout_secs),
        )
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl SpeechAnalyzer for GeminiClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: &request.mime_type,
                            data: &request.video_base64,
                        },
                    },
                    Part::Text {
                        text: build_prompt(request),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: analysis_schema(request.premium),
                temperature: ANALYSIS_TEMPERATURE,
            },
        };

        tracing::info!(
            "Calling {} ({} bytes of base64, premium: {})",
            self.model,
            request.video_base64.len(),
            request.premium
        );
        let start_time = Instant::now();

        let res = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Upstream(format!("Request to analysis service timed out: {}", e))
                } else {
                    AppError::Upstream(format!("Request to analysis service failed: {}", e))
                }
            })?;

        let status = res.status();
        let raw_response = res
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("Error reading response body: {}", e)))?;

        tracing::info!(
            "Analysis service responded {} in {:?}",
            status,
            start_time.elapsed()
        );

        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::warn!("Analysis service is rate limited: {}", status);
            return Err(AppError::UpstreamRateLimited);
        }

        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "Analysis service returned {}: {}",
                status,
                excerpt(&raw_response, RAW_RESPONSE_EXCERPT_CHARS)
            )));
        }

        let response: GenerateContentResponse =
            serde_json::from_str(&raw_response).map_err(|e| {
                tracing::warn!("Unreadable analysis service envelope: {}", e);
                AppError::UpstreamMalformedResponse {
                    excerpt: excerpt(&raw_response, RAW_RESPONSE_EXCERPT_CHARS),
                }
            })?;

        let text = response.text();
        if text.trim().is_empty() {
            return Err(AppError::UpstreamMalformedResponse {
                excerpt: excerpt(&raw_response, RAW_RESPONSE_EXCERPT_CHARS),
            });
        }

        parse_analysis(&text)
    }
}
