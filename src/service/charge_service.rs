use crate::domain::charge::{validate, ChargeResponse, CreatePixRequest};
use crate::domain::sale::{NewClient, NewSale};
use crate::error::RelayError;
use crate::gateways::providers::auth_scheme;
use crate::gateways::schema::normalize;
use crate::gateways::{GatewayCredentials, GatewayRegistry, GatewayRequest};
use crate::integrations::IntegrationCatalog;
use crate::repo::ledger::SalesLedger;
use crate::router::cycle::{RouteDecision, RouteTarget};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

pub const PREVIEW_DEFAULT: usize = 10;
pub const PREVIEW_MAX: usize = 100;

#[derive(Clone)]
pub struct ChargeService {
    pub ledger: Arc<dyn SalesLedger>,
    pub gateways: GatewayRegistry,
    pub integrations: Arc<IntegrationCatalog>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePreview {
    pub integration: &'static str,
    pub offer_id: String,
    pub use_tax: bool,
    pub prior_sales: u64,
    pub decisions: Vec<PreviewEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewEntry {
    pub ordinal: u64,
    pub position: u32,
    pub target: RouteTarget,
    pub provider: &'static str,
    pub reason: String,
}

impl ChargeService {
    /// Validate, route, submit upstream and record the sale.
    ///
    /// The offer stays locked from the sale count until the sale row is
    /// written, so concurrent charges for one offer see distinct counts.
    #[tracing::instrument(skip_all, fields(integration = %slug))]
    pub async fn submit(&self, slug: &str, req: CreatePixRequest) -> Result<ChargeResponse, RelayError> {
        let integration = self.integrations.get(slug)?;
        let charge = validate(&req)?;

        let client_credentials = GatewayCredentials {
            secret: charge.client_token.clone(),
            public_key: charge.client_public_key.clone(),
        };
        auth_scheme(integration.spec.client_provider, &client_credentials)?;

        let client = self
            .ledger
            .ensure_client(&NewClient {
                token: charge.client_token.clone(),
                name: charge.client_name.clone(),
                public_key: charge.client_public_key.clone(),
            })
            .await?;
        let offer = self
            .ledger
            .ensure_offer(&client, &charge.offer, charge.use_tax)
            .await?;
        if offer.client_id != client.id {
            return Err(RelayError::NotFound(format!("offer '{}' not found", offer.id)));
        }

        let mut slot = self.ledger.begin_charge(&offer.id).await?;
        let decision = integration.selector.select(slot.prior_sales(), offer.use_tax);
        let provider = integration.provider_for(decision.target);
        let credentials = match decision.target {
            RouteTarget::ClientGateway => &client_credentials,
            RouteTarget::OperatorGateway => &integration.operator_credentials,
        };
        tracing::info!(
            offer_id = %offer.id,
            provider = %provider,
            ordinal = decision.ordinal,
            position = decision.position,
            use_tax = offer.use_tax,
            reason = %decision.reason,
            "charge routed"
        );

        let gateway = self.gateways.get(provider)?;
        let request = GatewayRequest {
            reference: Uuid::new_v4(),
            offer_id: offer.id.clone(),
            amount_minor: charge.amount_minor,
            description: charge.description.clone(),
            customer: charge.customer.clone(),
            items: charge.items.clone(),
        };
        let reply = gateway.create_pix_charge(credentials, &request).await?;
        let response = normalize(&reply, &charge)?;

        let sale = NewSale {
            id: request.reference,
            offer_id: offer.id.clone(),
            client_id: client.id,
            gateway_transaction_id: response.id.clone(),
            integration: integration.slug().to_string(),
            provider: provider.to_string(),
            to_client: decision.target.to_client(),
            routing_reason: decision.reason.clone(),
            amount_minor: charge.amount_minor,
            customer_name: charge.customer.name.clone(),
            product_name: charge.product_title().to_string(),
        };
        if slot.record(&sale).await? {
            tracing::info!(
                sale_id = %sale.id,
                transaction_id = %sale.gateway_transaction_id,
                status = %response.status,
                "sale recorded"
            );
        } else {
            tracing::warn!(
                transaction_id = %sale.gateway_transaction_id,
                "sale for this transaction already exists, not recorded again"
            );
        }

        Ok(response)
    }

    /// The next decisions the selector would take for an offer.
    pub async fn preview(&self, slug: &str, offer_id: &str, count: usize) -> Result<RoutePreview, RelayError> {
        let integration = self.integrations.get(slug)?;
        let offer = self
            .ledger
            .find_offer(offer_id)
            .await?
            .ok_or_else(|| RelayError::NotFound(format!("offer '{offer_id}' not found")))?;
        let prior_sales = self.ledger.count_sales(&offer.id).await?;

        let decisions = integration
            .selector
            .schedule(prior_sales, offer.use_tax, count.clamp(1, PREVIEW_MAX))
            .into_iter()
            .map(|d: RouteDecision| PreviewEntry {
                ordinal: d.ordinal,
                position: d.position,
                target: d.target,
                provider: integration.provider_for(d.target).as_str(),
                reason: d.reason,
            })
            .collect();

        Ok(RoutePreview {
            integration: integration.slug(),
            offer_id: offer.id,
            use_tax: offer.use_tax,
            prior_sales,
            decisions,
        })
    }
}
