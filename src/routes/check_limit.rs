use axum::{Json, extract::State};

use super::auth::AuthUser;
use crate::AppState;
use crate::error::Result;
use crate::models::UsageStatus;

/// Report the caller's quota for the current period without consuming it
///
/// GET /api/check-limit
pub async fn check_limit(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UsageStatus>> {
    let usage = state.usage.clone();
    let now = state.clock.now();

    let snapshot =
        tokio::task::spawn_blocking(move || usage.peek(&auth.user_id, auth.tier, now)).await??;

    Ok(Json(snapshot.to_status()))
}
