use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oratoria_server::{
    AppState, Config, billing::PayPalClient, build_router, open_database, upstream::GeminiClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oratoria_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OratoriaAI server...");

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "Environment: {}, Server: {}, Usage period: {:?}",
        config.environment,
        config.server_address(),
        config.usage_period
    );

    if config.stripe_webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set; billing webhooks will be rejected");
    }

    // Open (or create) the embedded database
    let db_path = config.database_path.clone();
    let db = tokio::task::spawn_blocking(move || open_database(db_path)).await??;

    let analyzer = GeminiClient::from_config(&config).map_err(|e| anyhow::anyhow!(e))?;
    let mut state = AppState::new(db, config.clone(), Arc::new(analyzer));

    match &config.paypal {
        Some(paypal) => {
            let client = PayPalClient::new(paypal, Duration::from_secs(config.upstream_timeout_secs))
                .map_err(|e| anyhow::anyhow!(e))?;
            tracing::info!(
                "PayPal verification enabled against {} ({} plans)",
                paypal.api_base,
                paypal.plans.len()
            );
            state = state.with_paypal(Arc::new(client));
        }
        None => tracing::warn!("PAYPAL_CLIENT_ID/PAYPAL_CLIENT_SECRET not set; PayPal verification disabled"),
    }

    let app = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
