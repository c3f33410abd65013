use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use serde::{Deserialize, Serialize};

use super::validation::validate_registration;
use crate::AppState;
use crate::db::accounts::{self, NewUser};
use crate::error::{AppError, Result};
use crate::models::{Tier, User};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Authenticated caller, resolved from `Authorization: Bearer <token>`
///
/// The tier is read from the user record on every request so billing
/// changes take effect immediately.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub tier: Tier,
    pub token: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or(AppError::Unauthorized)?
            .to_string();

        let db = state.db.clone();
        let now = state.clock.now().timestamp();
        let lookup_token = token.clone();

        let (user_id, record) = tokio::task::spawn_blocking(move || {
            let user_id = accounts::resolve_session(&db, &lookup_token, now)?
                .ok_or(AppError::Unauthorized)?;
            let record = accounts::find_user(&db, &user_id)?;
            Ok::<_, AppError>((user_id, record))
        })
        .await??;

        let Some(record) = record else {
            tracing::warn!("Session for user {} has no profile", user_id);
            return Err(AppError::ProfileNotFound);
        };

        Ok(AuthUser {
            user_id,
            tier: record.tier,
            token,
        })
    }
}

/// Create an account on the free tier and sign it in
///
/// Returns 409 Conflict if the email is already registered.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let registration = validate_registration(&payload.email, &payload.password, &payload.name)?;

    let db = state.db.clone();
    let pepper = state.config.password_pepper.clone();
    let ttl = state.config.session_ttl_secs;
    let now = state.clock.now().timestamp();

    let (user, token) = tokio::task::spawn_blocking(move || {
        let user = accounts::create_user(
            &db,
            NewUser {
                email: &registration.email,
                name: &registration.name,
                password: &payload.password,
            },
            &pepper,
            now,
        )?;
        let token = accounts::create_session(&db, &user.id, now, ttl)?;
        Ok::<_, AppError>((user, token))
    })
    .await??;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user,
        }),
    ))
}

/// Exchange email and password for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let db = state.db.clone();
    let pepper = state.config.password_pepper.clone();
    let ttl = state.config.session_ttl_secs;
    let now = state.clock.now().timestamp();

    let (user, token) = tokio::task::spawn_blocking(move || {
        let user = accounts::verify_credentials(&db, &payload.email, &payload.password, &pepper)?;
        let token = accounts::create_session(&db, &user.id, now, ttl)?;
        Ok::<_, AppError>((user, token))
    })
    .await??;

    tracing::info!("User {} signed in", user.id);

    Ok(Json(AuthResponse {
        success: true,
        token,
        user,
    }))
}

/// Revoke the presented session token
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> Result<Json<LogoutResponse>> {
    let db = state.db.clone();
    let token = auth.token;
    tokio::task::spawn_blocking(move || accounts::revoke_session(&db, &token)).await??;

    tracing::info!("User {} signed out", auth.user_id);

    Ok(Json(LogoutResponse { success: true }))
}
