use crate::domain::charge::{Customer, LineItem};
use crate::error::RelayError;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

pub mod http;
pub mod mock;
pub mod providers;
pub mod schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    GhostPay,
    BlackCat,
    SkalePay,
    FourM,
    BrazaPay,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::GhostPay,
        Provider::BlackCat,
        Provider::SkalePay,
        Provider::FourM,
        Provider::BrazaPay,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::GhostPay => "ghostpay",
            Provider::BlackCat => "blackcat",
            Provider::SkalePay => "skalepay",
            Provider::FourM => "4mpagamentos",
            Provider::BrazaPay => "brazapay",
        }
    }

    pub fn env_prefix(self) -> &'static str {
        match self {
            Provider::GhostPay => "GHOSTPAY",
            Provider::BlackCat => "BLACKCAT",
            Provider::SkalePay => "SKALEPAY",
            Provider::FourM => "FOURM",
            Provider::BrazaPay => "BRAZAPAY",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::GhostPay => "https://api.ghostspaysv2.com",
            Provider::BlackCat => "https://api.blackcatpagamentos.com",
            Provider::SkalePay => "https://api.conta.skalepay.com.br",
            Provider::FourM => "https://app.4mpagamentos.com",
            Provider::BrazaPay => "https://api.brazapay.co",
        }
    }

    pub fn charge_path(self) -> &'static str {
        match self {
            Provider::GhostPay => "/functions/v1/transactions",
            Provider::FourM => "/api/v1/payments",
            Provider::BlackCat | Provider::SkalePay | Provider::BrazaPay => "/v1/transactions",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RelayError::NotFound(format!("unknown provider '{s}'")))
    }
}

/// Account credentials for one call. `secret` is the API key or token.
#[derive(Clone)]
pub struct GatewayCredentials {
    pub secret: String,
    pub public_key: Option<String>,
}

impl fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("secret", &"***")
            .field("public_key", &self.public_key)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub reference: Uuid,
    pub offer_id: String,
    pub amount_minor: i64,
    pub description: String,
    pub customer: Customer,
    pub items: Vec<LineItem>,
}

/// Raw 2xx answer from a provider, already parsed as JSON.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub provider: Provider,
    pub status: u16,
    pub body: serde_json::Value,
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn provider(&self) -> Provider;

    async fn create_pix_charge(
        &self,
        credentials: &GatewayCredentials,
        request: &GatewayRequest,
    ) -> Result<UpstreamReply, RelayError>;
}

#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<Provider, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, gateway: Arc<dyn PaymentGateway>) {
        self.gateways.insert(gateway.provider(), gateway);
    }

    pub fn with(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.register(gateway);
        self
    }

    pub fn get(&self, provider: Provider) -> Result<Arc<dyn PaymentGateway>, RelayError> {
        self.gateways
            .get(&provider)
            .cloned()
            .ok_or_else(|| RelayError::Internal(anyhow::anyhow!("no adapter registered for {provider}")))
    }
}
