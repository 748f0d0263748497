use anyhow::Context;
use pix_relay::config::{AppConfig, GatewayMode, StoreBackend};
use pix_relay::gateways::http::HttpGateway;
use pix_relay::gateways::mock::MockGateway;
use pix_relay::gateways::{GatewayRegistry, Provider};
use pix_relay::http::middleware::admin_auth::AdminKey;
use pix_relay::http::middleware::rate_limit::RateLimitState;
use pix_relay::integrations::IntegrationCatalog;
use pix_relay::repo::ledger::SalesLedger;
use pix_relay::repo::memory_repo::MemoryLedger;
use pix_relay::repo::sales_repo::SalesRepo;
use pix_relay::{build_router, AppState};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = AppConfig::from_env()?;

    let ledger: Arc<dyn SalesLedger> = match cfg.store_backend {
        StoreBackend::Postgres => {
            let url = cfg
                .database_url
                .as_deref()
                .context("DATABASE_URL is required when STORE_BACKEND=postgres")?;
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            Arc::new(SalesRepo { pool })
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, sales are lost on restart");
            Arc::new(MemoryLedger::new())
        }
    };

    let mut gateways = GatewayRegistry::new();
    let http_client = reqwest::Client::new();
    for provider in Provider::ALL {
        match cfg.gateway_mode {
            GatewayMode::Live => {
                let base_url = cfg
                    .base_urls
                    .get(&provider)
                    .cloned()
                    .unwrap_or_else(|| provider.default_base_url().to_string());
                gateways.register(Arc::new(HttpGateway {
                    provider,
                    base_url,
                    timeout_ms: cfg.gateway_timeout_ms,
                    client: http_client.clone(),
                }));
            }
            GatewayMode::Mock => gateways.register(Arc::new(MockGateway::approving(provider))),
        }
    }
    if cfg.gateway_mode == GatewayMode::Mock {
        tracing::warn!("GATEWAY_MODE=mock, no charge leaves this process");
    }

    let integrations = IntegrationCatalog::from_config(&cfg)?;
    if integrations.is_empty() {
        tracing::warn!("no integration has a routing cycle configured, every charge will be refused");
    }
    for view in integrations.views() {
        tracing::info!(
            integration = view.slug,
            client = view.client_provider,
            operator = view.operator_provider,
            cycle = %view.cycle,
            "integration enabled"
        );
    }

    let redis_client = redis::Client::open(cfg.redis_url.clone())?;
    let state = AppState::new(ledger, gateways, integrations, Some(redis_client.clone()));

    let app = build_router(
        state,
        cfg.internal_api_key.as_ref().map(|k| AdminKey(k.expose().to_string())),
        Some(RateLimitState {
            redis_client,
            max_per_minute: cfg.rate_limit_per_minute,
        }),
    );

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
