use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use anyhow::Context;
use dotenvy as dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod config;
mod error;
mod ledger;
mod middleware;
mod momo;

use config::Config;
use ledger::{LedgerPolicy, VaultLedger};
use middleware::RateLimitLayer;
use momo::MomoClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // trying multiple .env locations since working directory differs between dev and prod
    let _ = dotenv::from_filename_override(".env");
    let _ = dotenv::from_filename_override(concat!(env!("CARGO_MANIFEST_DIR"), "/.env"));
    let _ = dotenv::dotenv_override();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mopocket_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Mo Pocket Vault Service");

    tracing::info!("Loading configuration from environment");
    let config = Config::from_env().context("error with configuration")?;
    tracing::info!("Configuration loaded successfully");

    tracing::info!("Initializing MoMo gateway client...");
    let momo_client = MomoClient::new(&config).context("Failed to initialize MoMo client")?;
    tracing::info!("MoMo gateway client initialized");

    let policy = LedgerPolicy {
        allow_early_withdrawal: config.allow_early_withdrawal,
        ..LedgerPolicy::default()
    };
    let vault_ledger = Arc::new(VaultLedger::new(policy));

    // spawning as background task so server startup isn't blocked by the stats schedule
    let stats_ledger = vault_ledger.clone();
    tokio::spawn(async move {
        tracing::info!("Starting periodic ledger stats task");
        loop {
            stats_ledger.log_stats().await;
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
        }
    });

    let app_state = Arc::new(AppState {
        ledger: vault_ledger,
        momo: Arc::new(momo_client),
    });

    let rate_limit_default = Arc::new(RateLimitLayer::with_defaults());
    let rate_limit_read = Arc::new(RateLimitLayer::read_heavy());
    let rate_limit_write = Arc::new(RateLimitLayer::write_heavy());
    let rate_limit_expensive = Arc::new(RateLimitLayer::expensive());

    // grouping routes by rate limit tier to avoid repeating the middleware closure pattern everywhere
    let app = Router::new()
        .route("/health", get(api::health::health_check))
        .route("/config/public", get(api::health::public_config))
        .route("/momo/token", post(api::momo::momo_token))
        .route_layer({
            let limiter = rate_limit_default.clone();
            axum_middleware::from_fn(move |headers, req, next| {
                let limiter = limiter.clone();
                async move { limiter.middleware(headers, req, next).await }
            })
        })

        .route("/momo/money-collect", post(api::momo::money_collect))
        .route("/api/withdraw", post(api::vault::withdraw))
        .route_layer({
            let limiter = rate_limit_write.clone();
            axum_middleware::from_fn(move |headers, req, next| {
                let limiter = limiter.clone();
                async move { limiter.middleware(headers, req, next).await }
            })
        })

        .route("/api/vault-info", get(api::vault::vault_info))
        .route("/api/withdrawable-deposits", get(api::vault::withdrawable_deposits))
        .route_layer({
            let limiter = rate_limit_read.clone();
            axum_middleware::from_fn(move |headers, req, next| {
                let limiter = limiter.clone();
                async move { limiter.middleware(headers, req, next).await }
            })
        })

        .route("/api/admin/revenue", get(api::admin::revenue))
        .route("/api/admin/transaction", get(api::admin::transactions))
        .route("/api/admin/vault", get(api::admin::vaults))
        .route_layer({
            let limiter = rate_limit_expensive.clone();
            axum_middleware::from_fn(move |headers, req, next| {
                let limiter = limiter.clone();
                async move { limiter.middleware(headers, req, next).await }
            })
        })

        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // in case the configured port is taken, try a few more before giving up
    let mut port = config.port;
    let mut listener = None;

    for _ in 0..10u16 {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(l) => {
                listener = Some((addr, l));
                break;
            }
            Err(e) => {
                tracing::warn!("Failed to bind to {}: {} (trying next port)", addr, e);
                port = port.saturating_add(1);
            }
        }
    }

    let (addr, listener) = listener.ok_or_else(|| anyhow::anyhow!(
        "Failed to bind to any port in range {}..{}",
        config.port,
        config.port.saturating_add(9)
    ))?;

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<VaultLedger>,
    pub momo: Arc<MomoClient>,
}
