use crate::domain::charge::OfferLookup;
use crate::domain::sale::{Client, NewClient, NewSale, Offer, OfferStats, Sale};
use crate::domain::webhook::SettlementOutcome;
use anyhow::Result;
use uuid::Uuid;

/// An open "count, route, insert" unit for one offer. While it is alive no
/// other charge for the same offer can read the sale count.
#[async_trait::async_trait]
pub trait ChargeSlot: Send {
    fn prior_sales(&self) -> u64;

    /// Insert the sale unless one with the same upstream transaction id
    /// exists, then release the offer. Returns whether a row was written.
    async fn record(&mut self, sale: &NewSale) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait SalesLedger: Send + Sync {
    async fn ensure_client(&self, client: &NewClient) -> Result<Client>;

    /// Find the offer, creating it with `use_tax` on first sight.
    async fn ensure_offer(&self, client: &Client, lookup: &OfferLookup, use_tax: bool) -> Result<Offer>;

    async fn find_offer(&self, offer_id: &str) -> Result<Option<Offer>>;

    async fn set_offer_use_tax(&self, offer_id: &str, use_tax: bool) -> Result<Option<Offer>>;

    async fn begin_charge(&self, offer_id: &str) -> Result<Box<dyn ChargeSlot>>;

    async fn count_sales(&self, offer_id: &str) -> Result<u64>;

    async fn find_sale_by_transaction(&self, gateway_transaction_id: &str) -> Result<Option<Sale>>;

    /// Apply a webhook outcome with the sticky-approval rule. Returns whether
    /// the stored value changed.
    async fn apply_settlement(&self, sale_id: Uuid, outcome: SettlementOutcome) -> Result<bool>;

    /// Most recent first.
    async fn list_sales(&self, offer_id: &str, limit: i64) -> Result<Vec<Sale>>;

    async fn offer_stats(&self, offer_id: &str) -> Result<OfferStats>;

    async fn ping(&self) -> Result<()>;
}
