#![allow(dead_code)]

use pix_relay::domain::charge::CreatePixRequest;
use pix_relay::gateways::mock::{MockBehavior, MockGateway};
use pix_relay::gateways::{GatewayCredentials, GatewayRegistry, Provider};
use pix_relay::integrations::{IntegrationCatalog, CATALOG};
use pix_relay::repo::ledger::SalesLedger;
use pix_relay::repo::memory_repo::MemoryLedger;
use pix_relay::AppState;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub const CLIENT_TOKEN: &str = "tok_client";
pub const CLIENT_PUBLIC_KEY: &str = "pk_client";
pub const OPERATOR_SECRET: &str = "sk_operator";
pub const OPERATOR_PUBLIC_KEY: &str = "pk_operator";

pub struct Harness {
    pub ledger: Arc<MemoryLedger>,
    pub state: AppState,
    pub mocks: HashMap<Provider, Arc<MockGateway>>,
}

impl Harness {
    pub fn mock(&self, provider: Provider) -> &MockGateway {
        &self.mocks[&provider]
    }
}

/// Memory ledger, approving mocks for every provider, and `slug` enabled
/// with `cycle`. `overrides` replaces the mock behavior of some providers.
pub fn harness_with(slug: &str, cycle: &str, overrides: &[(Provider, MockBehavior)]) -> Harness {
    let ledger = Arc::new(MemoryLedger::new());

    let mut registry = GatewayRegistry::new();
    let mut mocks = HashMap::new();
    for provider in Provider::ALL {
        let behavior = overrides
            .iter()
            .find(|(p, _)| *p == provider)
            .map(|(_, b)| b.clone())
            .unwrap_or(MockBehavior::AlwaysApprove);
        let mock = Arc::new(MockGateway::new(provider, behavior));
        registry.register(mock.clone());
        mocks.insert(provider, mock);
    }

    let spec = CATALOG.iter().find(|s| s.slug == slug).copied().unwrap();
    let mut catalog = IntegrationCatalog::default();
    catalog.insert(
        spec,
        cycle.parse().unwrap(),
        GatewayCredentials {
            secret: OPERATOR_SECRET.to_string(),
            public_key: Some(OPERATOR_PUBLIC_KEY.to_string()),
        },
    );

    let shared: Arc<dyn SalesLedger> = ledger.clone();
    let state = AppState::new(shared, registry, catalog, None);
    Harness { ledger, state, mocks }
}

pub fn harness(slug: &str, cycle: &str) -> Harness {
    harness_with(slug, cycle, &[])
}

pub fn charge_body(offer_id: &str, use_tax: bool) -> Value {
    json!({
        "credentials": {
            "token": CLIENT_TOKEN,
            "name": "Loja Centro",
            "publicKey": CLIENT_PUBLIC_KEY,
            "offer": {"id": offer_id, "name": "Kit verao"},
            "useTax": use_tax
        },
        "amount": 4990,
        "amountUnit": "cents",
        "customer": {
            "name": "Maria Souza",
            "email": "maria@example.com",
            "phone": "11988887777",
            "document": {"type": "CPF", "number": "529.982.247-25"}
        },
        "product": {"title": "Kit verao"}
    })
}

pub fn charge_request(offer_id: &str, use_tax: bool) -> CreatePixRequest {
    serde_json::from_value(charge_body(offer_id, use_tax)).unwrap()
}
