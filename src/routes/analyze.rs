use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::CONTENT_LENGTH},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::AppState;
use crate::error::{AppError, Result};
use crate::media::validate_media;
use crate::models::{Allowance, AnalysisRecord, AnalysisResult, Language, Tier};
use crate::upstream::AnalysisRequest;
use crate::usage::Admission;

fn default_mime_type() -> String {
    "video/webm".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub video_base64: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    #[serde(default)]
    pub language: Language,
    pub topic: Option<String>,
    pub audience: Option<String>,
    pub goal: Option<String>,
    pub video_duration: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub tier: Tier,
    pub remaining_this_month: Allowance,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub analysis: AnalysisResult,
    pub usage: UsageSummary,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Turn a body rejection into the same error `validate_media` reports, so
/// uploads past the body ceiling get a 400 rather than the framework's 413
fn rejected_payload(rejection: JsonRejection, headers: &HeaderMap, state: &AppState) -> AppError {
    if rejection.status() != StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::InvalidInput(rejection.body_text());
    }

    let body_bytes = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or_else(|| state.config.request_body_limit());

    AppError::MediaTooLarge {
        // Decoded size of a base64 body
        size: body_bytes / 4 * 3,
        max: state.config.max_media_bytes,
    }
}

/// Analyze a recorded presentation
///
/// POST /api/analyze
///
/// 1. Check the caller's quota (read-only)
/// 2. Validate the media against the tier's limits
/// 3. Consume one unit of quota atomically
/// 4. Forward the media to the analysis service and parse its JSON
/// 5. Append the result to history (failures are logged, not returned)
///
/// Quota is not refunded if the analysis service fails after step 3.
pub async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    auth: AuthUser,
    payload: std::result::Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>> {
    let now = state.clock.now();
    let tier = auth.tier;

    let usage = state.usage.clone();
    let user_id = auth.user_id.clone();
    let snapshot =
        tokio::task::spawn_blocking(move || usage.peek(&user_id, tier, now)).await??;

    if !snapshot.can_analyze() {
        tracing::warn!(
            "Analysis denied for user {}: {}/{:?} used in {}",
            auth.user_id,
            snapshot.used,
            snapshot.limits.analyses_per_period,
            snapshot.period
        );
        return Err(snapshot.quota_exceeded());
    }

    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            let error = rejected_payload(rejection, &headers, &state);
            tracing::warn!("Rejected analysis upload from user {}: {}", auth.user_id, error);
            return Err(error);
        }
    };

    let media = validate_media(
        &payload.video_base64,
        &payload.mime_type,
        payload.video_duration,
        &snapshot.limits,
        state.config.max_media_bytes,
    )?;

    let usage = state.usage.clone();
    let user_id = auth.user_id.clone();
    let admission =
        tokio::task::spawn_blocking(move || usage.check_and_consume(&user_id, tier, now))
            .await??;

    let consumed = match admission {
        Admission::Allowed(snapshot) => snapshot,
        Admission::Denied(snapshot) => {
            tracing::warn!("User {} lost the race for the last analysis", auth.user_id);
            return Err(snapshot.quota_exceeded());
        }
    };

    let request = AnalysisRequest {
        video_base64: media.base64,
        mime_type: media.mime_type,
        language: payload.language,
        premium: tier == Tier::Premium,
        topic: non_empty(payload.topic),
        audience: non_empty(payload.audience),
        goal: non_empty(payload.goal),
    };

    let analysis = state.analyzer.analyze(&request).await.map_err(|e| {
        tracing::error!("Analysis failed for user {}: {}", auth.user_id, e);
        e
    })?;

    tracing::info!(
        "Analysis completed for user {} ({}, {} bytes, score {})",
        auth.user_id,
        tier,
        media.size,
        analysis.overall_score
    );

    match serde_json::to_string(&analysis) {
        Ok(analysis_json) => {
            let record = AnalysisRecord {
                id: Uuid::new_v4().to_string(),
                user_id: Some(auth.user_id.clone()),
                language: request.language,
                topic: request.topic,
                audience: request.audience,
                goal: request.goal,
                video_duration: payload.video_duration,
                tier,
                created_at: now.timestamp(),
                analysis_json,
            };

            let history = state.history.clone();
            let persisted = tokio::task::spawn_blocking(move || history.append(&record))
                .await
                .map_err(AppError::from)
                .and_then(|result| result);

            if let Err(e) = persisted {
                tracing::error!("Failed to save analysis for user {}: {}", auth.user_id, e);
            }
        }
        Err(e) => tracing::error!("Failed to encode analysis for history: {}", e),
    }

    Ok(Json(AnalyzeResponse {
        success: true,
        analysis,
        usage: UsageSummary {
            tier,
            remaining_this_month: consumed.remaining(),
        },
    }))
}
