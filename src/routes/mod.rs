pub mod admin;
pub mod analyze;
pub mod auth;
pub mod check_limit;
pub mod health;
pub mod history;
pub mod paypal;
pub mod validation;
pub mod webhooks;

pub use admin::{admin_stats, set_user_tier};
pub use analyze::analyze;
pub use auth::{AuthUser, login, logout, register};
pub use check_limit::check_limit;
pub use health::health_check;
pub use history::list_history;
pub use paypal::verify_paypal_subscription;
pub use validation::{timestamp_to_rfc3339, validate_registration};
pub use webhooks::stripe_webhook;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Assemble the application router with its layers and state
pub fn build_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any);

    let body_limit = state.config.request_body_limit();

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/analyze", post(analyze))
        .route("/api/check-limit", get(check_limit))
        .route("/api/history", get(list_history))
        .route("/api/webhooks/stripe", post(stripe_webhook))
        .route(
            "/api/paypal/verify-subscription",
            post(verify_paypal_subscription),
        )
        .route("/admin/stats", get(admin_stats))
        .route("/admin/users/{id}/tier", put(set_user_tier))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
