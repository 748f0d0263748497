use crate::gateways::{GatewayCredentials, GatewayRequest, Provider};
use crate::error::RelayError;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthScheme {
    Basic { username: String, password: String },
    Bearer(String),
}

impl AuthScheme {
    pub fn apply(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            AuthScheme::Basic { username, password } => builder.basic_auth(username, Some(password)),
            AuthScheme::Bearer(token) => builder.bearer_auth(token),
        }
    }
}

fn public_key(provider: Provider, creds: &GatewayCredentials) -> Result<String, RelayError> {
    creds
        .public_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| RelayError::validation(format!("credentials.publicKey is required for {provider}")))
}

pub fn auth_scheme(provider: Provider, creds: &GatewayCredentials) -> Result<AuthScheme, RelayError> {
    Ok(match provider {
        Provider::GhostPay => AuthScheme::Basic {
            username: creds.secret.clone(),
            password: public_key(provider, creds)?,
        },
        Provider::BlackCat => AuthScheme::Basic {
            username: public_key(provider, creds)?,
            password: creds.secret.clone(),
        },
        Provider::SkalePay | Provider::BrazaPay => AuthScheme::Basic {
            username: creds.secret.clone(),
            password: "x".to_string(),
        },
        Provider::FourM => AuthScheme::Bearer(creds.secret.clone()),
    })
}

fn nested_customer(req: &GatewayRequest) -> Value {
    json!({
        "name": req.customer.name,
        "email": req.customer.email,
        "document": {
            "type": req.customer.document.kind.as_str(),
            "number": req.customer.document.number,
        },
        "phone": req.customer.phone,
    })
}

fn titled_items(req: &GatewayRequest) -> Value {
    req.items
        .iter()
        .map(|i| {
            json!({
                "title": i.title,
                "unitPrice": i.unit_amount_minor,
                "quantity": i.quantity,
                "tangible": i.tangible,
            })
        })
        .collect()
}

/// Provider-specific request body. All amounts are cents.
pub fn build_payload(provider: Provider, req: &GatewayRequest) -> Value {
    match provider {
        Provider::BlackCat | Provider::BrazaPay => json!({
            "amount": req.amount_minor,
            "paymentMethod": "pix",
            "customer": nested_customer(req),
            "items": titled_items(req),
        }),
        Provider::SkalePay => json!({
            "amount": req.amount_minor,
            "paymentMethod": "pix",
            "description": req.description,
            "external_id": req.offer_id,
            "customer": nested_customer(req),
            "items": titled_items(req),
        }),
        Provider::GhostPay => json!({
            "customer": {
                "name": req.customer.name,
                "email": req.customer.email,
                "document": req.customer.document.number,
                "phone": req.customer.phone,
            },
            "paymentMethod": "PIX",
            "amount": req.amount_minor,
            "description": req.description,
            "items": req.items.iter().map(|i| json!({
                "name": i.title,
                "price": i.unit_amount_minor,
                "quantity": i.quantity,
            })).collect::<Vec<_>>(),
        }),
        Provider::FourM => json!({
            "amount": req.amount_minor.to_string(),
            "payment_method": "pix",
            "customer_name": req.customer.name,
            "customer_email": req.customer.email,
            "customer_cpf": req.customer.document.number,
            "description": req.description,
            "phone": req.customer.phone,
            "currency": "BRL",
            "reference": format!("ref_{}", req.reference.simple()),
        }),
    }
}
