//! Client-side usage display: fetches the caller's quota status and caches
//! it per signed-in identity.

use async_trait::async_trait;
use std::time::Duration;

use crate::models::{Allowance, UsageStatus};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// The signed-in user as seen by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub token: String,
}

/// Anything that can produce the current quota status for a session
#[async_trait]
pub trait UsageSource: Send + Sync {
    async fn fetch(&self, session: &Session) -> Result<UsageStatus, ClientError>;
}

/// `GET /api/check-limit` over HTTP
#[derive(Debug, Clone)]
pub struct HttpUsageSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpUsageSource {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl UsageSource for HttpUsageSource {
    async fn fetch(&self, session: &Session) -> Result<UsageStatus, ClientError> {
        let res = self
            .http
            .get(format!("{}/api/check-limit", self.base_url))
            .bearer_auth(&session.token)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        Ok(res.json::<UsageStatus>().await?)
    }
}

/// Cached quota status for the usage indicator and the record button
pub struct UsageDisplay<S> {
    source: S,
    cached: Option<(String, UsageStatus)>,
}

impl<S: UsageSource> UsageDisplay<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cached: None,
        }
    }

    fn cached_for(&self, user_id: &str) -> Option<&UsageStatus> {
        self.cached
            .as_ref()
            .filter(|(cached_id, _)| cached_id == user_id)
            .map(|(_, status)| status)
    }

    async fn refresh(&mut self, session: &Session) -> Result<UsageStatus, ClientError> {
        match self.source.fetch(session).await {
            Ok(status) => {
                self.cached = Some((session.user_id.clone(), status.clone()));
                Ok(status)
            }
            Err(e) => {
                tracing::warn!("Failed to refresh usage for {}: {}", session.user_id, e);
                // A stale value for another identity must not survive
                if self.cached_for(&session.user_id).is_none() {
                    self.cached = None;
                }
                Err(e)
            }
        }
    }

    /// Fetch on sign-in unless this identity's status is already cached
    pub async fn on_session_start(
        &mut self,
        session: &Session,
    ) -> Result<UsageStatus, ClientError> {
        self.status(session).await
    }

    /// Current status; a different identity invalidates the cache
    pub async fn status(&mut self, session: &Session) -> Result<UsageStatus, ClientError> {
        if let Some(status) = self.cached_for(&session.user_id) {
            return Ok(status.clone());
        }
        self.refresh(session).await
    }

    /// Refetch after every analysis attempt, whether it succeeded or not
    pub async fn after_analysis_attempt(
        &mut self,
        session: &Session,
    ) -> Result<UsageStatus, ClientError> {
        self.refresh(session).await
    }

    /// Drop the cached value, e.g. on sign-out
    pub fn clear(&mut self) {
        self.cached = None;
    }

    /// Whether the record button should be enabled for `session`. The server
    /// remains authoritative, so an unknown status does not block recording.
    pub fn can_record(&self, session: &Session) -> bool {
        self.cached_for(&session.user_id)
            .map(|status| status.can_analyze)
            .unwrap_or(true)
    }

    /// Fraction of the period's quota used by `session`, `None` for
    /// unlimited tiers or when no status is cached for that identity
    pub fn progress(&self, session: &Session) -> Option<f64> {
        let status = self.cached_for(&session.user_id)?;
        match status.limit {
            Allowance::Unlimited => None,
            Allowance::Limited(0) => Some(1.0),
            Allowance::Limited(limit) => Some((f64::from(status.used) / f64::from(limit)).min(1.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tier;
    use axum::{Json, Router, http::HeaderMap, http::StatusCode};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn status(used: u32, limit: Allowance) -> UsageStatus {
        UsageStatus {
            success: true,
            tier: Tier::Free,
            limit,
            used,
            remaining: match limit {
                Allowance::Limited(n) => Allowance::Limited(n.saturating_sub(used)),
                Allowance::Unlimited => Allowance::Unlimited,
            },
            can_analyze: match limit {
                Allowance::Limited(n) => used < n,
                Allowance::Unlimited => true,
            },
            current_month: "2025-10".to_string(),
            resets_at: Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap(),
            video_duration_limit: 60,
        }
    }

    /// Returns `used = number of calls so far`
    #[derive(Clone, Default)]
    struct CountingSource {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl UsageSource for CountingSource {
        async fn fetch(&self, _session: &Session) -> Result<UsageStatus, ClientError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as u32;
            Ok(status(n, Allowance::Limited(3)))
        }
    }

    fn session(user_id: &str) -> Session {
        Session {
            user_id: user_id.to_string(),
            token: format!("token-{}", user_id),
        }
    }

    #[tokio::test]
    async fn test_cached_per_identity() {
        let source = CountingSource::default();
        let calls = source.calls.clone();
        let mut display = UsageDisplay::new(source);

        display.on_session_start(&session("ada")).await.unwrap();
        display.on_session_start(&session("ada")).await.unwrap();
        display.status(&session("ada")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Identity change invalidates
        display.status(&session("grace")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        display.status(&session("ada")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_analysis_attempt_always_refetches() {
        let source = CountingSource::default();
        let calls = source.calls.clone();
        let mut display = UsageDisplay::new(source);

        display.on_session_start(&session("ada")).await.unwrap();
        let after = display.after_analysis_attempt(&session("ada")).await.unwrap();
        assert_eq!(after.used, 1);
        let after = display.after_analysis_attempt(&session("ada")).await.unwrap();
        assert_eq!(after.used, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_record_button_and_progress() {
        let source = CountingSource::default();
        let mut display = UsageDisplay::new(source);
        let me = session("ada");
        assert!(display.can_record(&me));
        assert_eq!(display.progress(&me), None);

        for _ in 0..4 {
            display.after_analysis_attempt(&me).await.unwrap();
        }
        // Fourth fetch reports used = 3 of 3
        assert!(!display.can_record(&me));
        assert_eq!(display.progress(&me), Some(1.0));

        display.clear();
        assert!(display.can_record(&me));
    }

    #[tokio::test]
    async fn test_exhausted_status_does_not_leak_to_next_user() {
        /// Ada has used her quota; fetches for anyone else fail
        struct OnlyAda;

        #[async_trait]
        impl UsageSource for OnlyAda {
            async fn fetch(&self, session: &Session) -> Result<UsageStatus, ClientError> {
                if session.user_id == "ada" {
                    Ok(status(3, Allowance::Limited(3)))
                } else {
                    Err(ClientError::Status {
                        status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                        body: String::new(),
                    })
                }
            }
        }

        let mut display = UsageDisplay::new(OnlyAda);
        let ada = session("ada");
        let grace = session("grace");

        display.on_session_start(&ada).await.unwrap();
        assert!(!display.can_record(&ada));
        assert_eq!(display.progress(&ada), Some(1.0));

        // Before Grace's first fetch
        assert!(display.can_record(&grace));
        assert_eq!(display.progress(&grace), None);

        // Grace's fetch fails; Ada's status must not be shown to her
        assert!(display.on_session_start(&grace).await.is_err());
        assert!(display.can_record(&grace));
        assert_eq!(display.progress(&grace), None);
    }

    #[tokio::test]
    async fn test_unlimited_has_no_progress() {
        struct Unlimited;

        #[async_trait]
        impl UsageSource for Unlimited {
            async fn fetch(&self, _session: &Session) -> Result<UsageStatus, ClientError> {
                Ok(status(42, Allowance::Unlimited))
            }
        }

        let mut display = UsageDisplay::new(Unlimited);
        let me = session("ada");
        display.on_session_start(&me).await.unwrap();
        assert!(display.can_record(&me));
        assert_eq!(display.progress(&me), None);
    }

    #[tokio::test]
    async fn test_http_source_sends_bearer_token() {
        let router = Router::new().fallback(|headers: HeaderMap| async move {
            if headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some("Bearer token-ada")
            {
                Ok(Json(status(1, Allowance::Limited(3))))
            } else {
                Err(StatusCode::UNAUTHORIZED)
            }
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let source = HttpUsageSource::new(&format!("http://{}", addr)).unwrap();
        let fetched = source.fetch(&session("ada")).await.unwrap();
        assert_eq!(fetched.used, 1);
        assert_eq!(fetched.remaining, Allowance::Limited(2));

        let denied = source.fetch(&session("grace")).await;
        assert!(matches!(
            denied,
            Err(ClientError::Status {
                status: reqwest::StatusCode::UNAUTHORIZED,
                ..
            })
        ));
    }
}
