use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::auth::AuthUser;
use super::validation::timestamp_to_rfc3339;
use crate::AppState;
use crate::constants::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
use crate::error::Result;
use crate::models::{AnalysisRecord, Language, Tier};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub created_at: String,
    pub tier: Tier,
    pub language: Language,
    pub topic: Option<String>,
    pub audience: Option<String>,
    pub goal: Option<String>,
    pub video_duration: Option<f64>,
    pub analysis: Value,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub analyses: Vec<HistoryItem>,
}

impl From<AnalysisRecord> for HistoryItem {
    fn from(record: AnalysisRecord) -> Self {
        let analysis = serde_json::from_str(&record.analysis_json).unwrap_or_else(|e| {
            tracing::warn!("Stored analysis {} is not valid JSON: {}", record.id, e);
            Value::Null
        });

        Self {
            created_at: timestamp_to_rfc3339(record.created_at),
            id: record.id,
            tier: record.tier,
            language: record.language,
            topic: record.topic,
            audience: record.audience,
            goal: record.goal,
            video_duration: record.video_duration,
            analysis,
        }
    }
}

/// List the caller's past analyses, newest first
///
/// GET /api/history?limit=N (default 50, capped at 100)
pub async fn list_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let history = state.history.clone();
    let records =
        tokio::task::spawn_blocking(move || history.list_for_user(&auth.user_id, limit))
            .await??;

    Ok(Json(HistoryResponse {
        success: true,
        analyses: records.into_iter().map(HistoryItem::from).collect(),
    }))
}
