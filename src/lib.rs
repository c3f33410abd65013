//! OratoriaAI server library
//!
//! Speech-coaching backend: accounts, tier-based quota accounting, video
//! analysis through an external multimodal model, analysis history and
//! billing webhooks. Exported for the binary and for integration tests.

pub mod billing;
pub mod client;
pub mod clock;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod media;
pub mod models;
pub mod routes;
pub mod security;
pub mod tiers;
pub mod upstream;
pub mod usage;

pub use config::Config;
pub use db::{Db, open_database};
pub use error::{AppError, Result};
pub use routes::build_router;

use std::sync::Arc;

use billing::PayPalClient;
use clock::{Clock, SystemClock};
use db::{HistoryStore, RedbHistory};
use upstream::SpeechAnalyzer;
use usage::UsageLedger;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Config,
    pub usage: UsageLedger,
    pub analyzer: Arc<dyn SpeechAnalyzer>,
    pub history: Arc<dyn HistoryStore>,
    pub clock: Arc<dyn Clock>,
    /// Present only when PayPal credentials are configured
    pub paypal: Option<Arc<PayPalClient>>,
}

impl AppState {
    /// Create state backed by the given database, with redb history and the
    /// system clock
    pub fn new(db: Db, config: Config, analyzer: Arc<dyn SpeechAnalyzer>) -> Self {
        Self {
            usage: UsageLedger::new(db.clone(), config.usage_period),
            history: Arc::new(RedbHistory::new(db.clone())),
            clock: Arc::new(SystemClock),
            paypal: None,
            db,
            config,
            analyzer,
        }
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = history;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_paypal(mut self, paypal: Arc<PayPalClient>) -> Self {
        self.paypal = Some(paypal);
        self
    }
}
