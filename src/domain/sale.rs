use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub public_key: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct NewClient {
    pub token: String,
    pub name: String,
    pub public_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: String,
    pub client_id: Uuid,
    pub name: String,
    pub use_tax: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    pub offer_id: String,
    pub client_id: Uuid,
    pub gateway_transaction_id: String,
    pub integration: String,
    pub provider: String,
    pub to_client: bool,
    pub routing_reason: String,
    pub amount_minor: i64,
    pub customer_name: String,
    pub product_name: String,
    /// Unset until a webhook reports a terminal status.
    pub approved: Option<bool>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSale {
    pub id: Uuid,
    pub offer_id: String,
    pub client_id: Uuid,
    pub gateway_transaction_id: String,
    pub integration: String,
    pub provider: String,
    pub to_client: bool,
    pub routing_reason: String,
    pub amount_minor: i64,
    pub customer_name: String,
    pub product_name: String,
}

impl NewSale {
    pub fn into_sale(self, created_at: chrono::DateTime<chrono::Utc>) -> Sale {
        Sale {
            id: self.id,
            offer_id: self.offer_id,
            client_id: self.client_id,
            gateway_transaction_id: self.gateway_transaction_id,
            integration: self.integration,
            provider: self.provider,
            to_client: self.to_client,
            routing_reason: self.routing_reason,
            amount_minor: self.amount_minor,
            customer_name: self.customer_name,
            product_name: self.product_name,
            approved: None,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferStats {
    pub total: usize,
    pub to_client: usize,
    pub to_operator: usize,
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
}

impl OfferStats {
    pub fn from_sales(sales: &[Sale]) -> Self {
        sales.iter().fold(Self::default(), |mut acc, s| {
            acc.total += 1;
            if s.to_client {
                acc.to_client += 1;
            } else {
                acc.to_operator += 1;
            }
            match s.approved {
                Some(true) => acc.approved += 1,
                Some(false) => acc.rejected += 1,
                None => acc.pending += 1,
            }
            acc
        })
    }
}
