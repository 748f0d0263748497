use crate::error::RelayError;
use crate::gateways::providers::auth_scheme;
use crate::gateways::schema::interpret_reply;
use crate::gateways::{GatewayCredentials, GatewayRequest, PaymentGateway, Provider, UpstreamReply};
use serde_json::{json, Value};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Accept every charge with a fresh transaction id.
    AlwaysApprove,
    /// Accept every charge, always answering with the same transaction id.
    FixedTransactionId(String),
    /// Answer with this status and raw body.
    Reply { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub secret: String,
    pub public_key: Option<String>,
    pub amount_minor: i64,
}

/// Offline stand-in for a provider. Answers in the provider's own response
/// shape so the normal mapping path is exercised.
pub struct MockGateway {
    pub provider: Provider,
    pub behavior: MockBehavior,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockGateway {
    pub fn new(provider: Provider, behavior: MockBehavior) -> Self {
        Self {
            provider,
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn approving(provider: Provider) -> Self {
        Self::new(provider, MockBehavior::AlwaysApprove)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

/// A plausible success body for `provider` carrying `id`.
pub fn canned_body(provider: Provider, id: &str, amount_minor: i64) -> Value {
    let emv = format!("00020126580014br.gov.bcb.pix0136{id}5204000053039865802BR6304ABCD");
    match provider {
        Provider::BlackCat | Provider::BrazaPay => json!({
            "id": id,
            "status": "waiting_payment",
            "amount": amount_minor,
            "pix": {"qrcode": emv},
        }),
        Provider::GhostPay => json!({
            "id": id,
            "status": "waiting_payment",
            "amount": amount_minor,
            "pix": {"qrcode": emv, "copiaECola": emv},
        }),
        Provider::SkalePay => json!({
            "success": true,
            "id": id,
            "status": "waiting_payment",
            "pix_code": emv,
            "pix_qr_code": format!("data:image/png;base64,{id}"),
        }),
        Provider::FourM => json!({
            "id": id,
            "status": "pending",
            "amount": amount_minor.to_string(),
            "pix_code": emv,
        }),
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn create_pix_charge(
        &self,
        credentials: &GatewayCredentials,
        request: &GatewayRequest,
    ) -> Result<UpstreamReply, RelayError> {
        auth_scheme(self.provider, credentials)?;
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                secret: credentials.secret.clone(),
                public_key: credentials.public_key.clone(),
                amount_minor: request.amount_minor,
            });
        }

        let (status, text) = match &self.behavior {
            MockBehavior::AlwaysApprove => {
                let id = format!("mock_{}", uuid::Uuid::new_v4().simple());
                (200, canned_body(self.provider, &id, request.amount_minor).to_string())
            }
            MockBehavior::FixedTransactionId(id) => {
                (200, canned_body(self.provider, id, request.amount_minor).to_string())
            }
            MockBehavior::Reply { status, body } => (*status, body.clone()),
        };

        let body = interpret_reply(self.provider, status, &text)?;
        Ok(UpstreamReply {
            provider: self.provider,
            status,
            body,
        })
    }
}
