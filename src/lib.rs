pub mod config;
pub mod domain {
    pub mod charge;
    pub mod document;
    pub mod sale;
    pub mod webhook;
}
pub mod error;
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod charges;
        pub mod offers;
        pub mod ops;
        pub mod webhooks;
    }
    pub mod middleware {
        pub mod admin_auth;
        pub mod rate_limit;
    }
}
pub mod integrations;
pub mod repo {
    pub mod ledger;
    pub mod memory_repo;
    pub mod sales_repo;
}
pub mod router {
    pub mod cycle;
}
pub mod service {
    pub mod charge_service;
    pub mod webhook_service;
}

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use crate::http::handlers::{charges, offers, ops, webhooks};
use crate::http::middleware::admin_auth::{require_internal_api_key, AdminKey};
use crate::http::middleware::rate_limit::{enforce, RateLimitState};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub charge_service: service::charge_service::ChargeService,
    pub webhook_service: service::webhook_service::WebhookService,
    pub ledger: Arc<dyn repo::ledger::SalesLedger>,
    pub integrations: Arc<integrations::IntegrationCatalog>,
    pub redis_client: Option<redis::Client>,
}

impl AppState {
    pub fn new(
        ledger: Arc<dyn repo::ledger::SalesLedger>,
        gateways: gateways::GatewayRegistry,
        integrations: integrations::IntegrationCatalog,
        redis_client: Option<redis::Client>,
    ) -> Self {
        let integrations = Arc::new(integrations);
        Self {
            charge_service: service::charge_service::ChargeService {
                ledger: ledger.clone(),
                gateways,
                integrations: integrations.clone(),
            },
            webhook_service: service::webhook_service::WebhookService {
                ledger: ledger.clone(),
            },
            ledger,
            integrations,
            redis_client,
        }
    }
}

/// Full HTTP surface. Admin routes are only mounted when a key is given.
pub fn build_router(state: AppState, admin_key: Option<AdminKey>, limits: Option<RateLimitState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(ops::health))
        .route("/ops/liveness", get(ops::liveness))
        .route("/ops/readiness", get(ops::readiness))
        .route("/pix/:integration", post(charges::create_pix))
        .route("/webhooks/:provider", post(webhooks::receive))
        .route("/ghostpay", post(charges::create_ghostpay))
        .route("/skale-blackcat", post(charges::create_skale_blackcat))
        .route("/brazapay-4mpagamentos", post(charges::create_brazapay_4m))
        .route("/webhook/ghostpay", post(webhooks::receive_ghostpay))
        .route("/webhook/blackcat", post(webhooks::receive_blackcat));

    match admin_key {
        Some(key) => {
            let admin_routes = Router::new()
                .route("/admin/offers/:offer_id", get(offers::get_offer).patch(offers::update_offer))
                .route("/admin/integrations", get(offers::list_integrations))
                .route("/admin/integrations/:slug/preview", get(offers::preview_routes))
                .layer(from_fn_with_state(key, require_internal_api_key));
            app = app.merge(admin_routes);
        }
        None => tracing::warn!("INTERNAL_API_KEY not set, admin routes disabled"),
    }

    if let Some(limits) = limits {
        app = app.layer(from_fn_with_state(limits, enforce));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}
