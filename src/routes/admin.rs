use axum::{
    Json,
    extract::{Path, Query, State},
};
use redb::{ReadableDatabase, ReadableTableMetadata};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::db::{accounts, tables};
use crate::error::Result;
use crate::models::{Tier, User};
use crate::{AppError, AppState};

/// Query parameters for admin endpoints
#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    /// Admin secret key for authentication
    pub key: String,
}

/// Database statistics response
#[derive(Debug, Serialize)]
pub struct AdminStatsResponse {
    pub user_count: u64,
    pub analysis_count: u64,
    pub usage_row_count: u64,
    pub database_size_bytes: u64,
    pub database_size_human: String,
}

#[derive(Debug, Deserialize)]
pub struct SetTierRequest {
    pub tier: String,
}

#[derive(Debug, Serialize)]
pub struct SetTierResponse {
    pub success: bool,
    pub user: User,
}

/// Format bytes into human-readable string
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Admin endpoints are disabled unless `ADMIN_SECRET_KEY` is set
fn authorize(state: &AppState, params: &AdminQuery) -> Result<()> {
    let admin_key = state
        .config
        .admin_secret_key
        .as_ref()
        .ok_or(AppError::Unauthorized)?;

    if params.key != *admin_key {
        tracing::warn!("Invalid admin key attempt");
        return Err(AppError::Unauthorized);
    }

    Ok(())
}

/// Admin stats endpoint
///
/// GET /admin/stats?key=<admin_secret_key>
pub async fn admin_stats(
    State(state): State<AppState>,
    Query(params): Query<AdminQuery>,
) -> Result<Json<AdminStatsResponse>> {
    authorize(&state, &params)?;

    let database_size_bytes = fs::metadata(&state.config.database_path)
        .map(|m| m.len())
        .unwrap_or(0);

    let db = state.db.clone();
    let usage = state.usage.clone();
    let (user_count, analysis_count, usage_row_count) =
        tokio::task::spawn_blocking(move || -> Result<(u64, u64, u64)> {
            let read_txn = db.begin_read()?;
            let user_count = read_txn.open_table(tables::USERS)?.len()?;
            let analysis_count = read_txn.open_table(tables::ANALYSES)?.len()?;
            Ok((user_count, analysis_count, usage.row_count()?))
        })
        .await??;

    tracing::info!(
        "Admin stats requested: {} users, {} analyses, {} usage rows, {} database",
        user_count,
        analysis_count,
        usage_row_count,
        format_bytes(database_size_bytes)
    );

    Ok(Json(AdminStatsResponse {
        user_count,
        analysis_count,
        usage_row_count,
        database_size_bytes,
        database_size_human: format_bytes(database_size_bytes),
    }))
}

/// Set a user's tier by hand
///
/// PUT /admin/users/{id}/tier?key=<admin_secret_key> with `{"tier": "pro"}`.
/// Unknown tier names fall back to free.
pub async fn set_user_tier(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<AdminQuery>,
    Json(payload): Json<SetTierRequest>,
) -> Result<Json<SetTierResponse>> {
    authorize(&state, &params)?;

    if !User::validate_id(&user_id) {
        return Err(AppError::InvalidInput("User ID must be a UUID".to_string()));
    }

    let tier = Tier::parse_or_free(&payload.tier);
    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || accounts::set_tier(&db, &user_id, tier)).await??;

    tracing::info!("Admin set tier of user {} to {}", user.id, tier);

    Ok(Json(SetTierResponse {
        success: true,
        user,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }
}
