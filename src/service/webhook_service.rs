use crate::domain::webhook::{normalize_status, parse_notification, SettlementOutcome};
use crate::error::RelayError;
use crate::gateways::Provider;
use crate::repo::ledger::SalesLedger;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
}

#[derive(Clone)]
pub struct WebhookService {
    pub ledger: Arc<dyn SalesLedger>,
}

impl WebhookService {
    #[tracing::instrument(skip_all, fields(provider = %provider))]
    pub async fn reconcile(&self, provider: &str, body: &Value) -> Result<WebhookAck, RelayError> {
        let provider: Provider = provider.parse()?;
        let notification = parse_notification(body)?;
        let outcome = normalize_status(notification.status.as_deref());

        let sale = self
            .ledger
            .find_sale_by_transaction(&notification.transaction_id)
            .await?
            .ok_or_else(|| {
                RelayError::NotFound(format!(
                    "no sale for transaction '{}'",
                    notification.transaction_id
                ))
            })?;

        if outcome == SettlementOutcome::Indeterminate {
            tracing::info!(
                transaction_id = %notification.transaction_id,
                status = ?notification.status,
                "non-terminal status, sale left untouched"
            );
            return Ok(WebhookAck {
                success: true,
                skipped: Some(true),
            });
        }

        if sale.provider != provider.as_str() {
            tracing::debug!(
                sale_provider = %sale.provider,
                "notification arrived on a different provider route"
            );
        }

        let changed = self.ledger.apply_settlement(sale.id, outcome).await?;
        tracing::info!(
            sale_id = %sale.id,
            transaction_id = %notification.transaction_id,
            outcome = ?outcome,
            changed,
            "settlement applied"
        );
        Ok(WebhookAck {
            success: true,
            skipped: None,
        })
    }
}
