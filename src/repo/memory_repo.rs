use crate::domain::charge::OfferLookup;
use crate::domain::sale::{Client, NewClient, NewSale, Offer, OfferStats, Sale};
use crate::domain::webhook::{settle, SettlementOutcome};
use crate::repo::ledger::{ChargeSlot, SalesLedger};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    clients_by_token: HashMap<String, Client>,
    offers: HashMap<String, Offer>,
    /// Insertion order.
    sales: Vec<Sale>,
}

/// Process-local ledger with the same semantics as the Postgres one.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<MemoryState>>,
    offer_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks nobody holds or waits on are dropped before a new one is handed out.
    async fn offer_lock(&self, offer_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.offer_locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(offer_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

pub struct MemoryChargeSlot {
    state: Arc<Mutex<MemoryState>>,
    guard: Option<OwnedMutexGuard<()>>,
    prior_sales: u64,
}

#[async_trait::async_trait]
impl ChargeSlot for MemoryChargeSlot {
    fn prior_sales(&self) -> u64 {
        self.prior_sales
    }

    async fn record(&mut self, sale: &NewSale) -> Result<bool> {
        let guard = self
            .guard
            .take()
            .ok_or_else(|| anyhow!("charge slot already used"))?;

        let mut state = self.state.lock().await;
        let duplicate = state
            .sales
            .iter()
            .any(|s| s.gateway_transaction_id == sale.gateway_transaction_id);
        if !duplicate {
            state.sales.push(sale.clone().into_sale(chrono::Utc::now()));
        }
        drop(state);
        drop(guard);
        Ok(!duplicate)
    }
}

#[async_trait::async_trait]
impl SalesLedger for MemoryLedger {
    async fn ensure_client(&self, client: &NewClient) -> Result<Client> {
        let mut state = self.state.lock().await;
        let found = state
            .clients_by_token
            .entry(client.token.clone())
            .or_insert_with(|| Client {
                id: Uuid::new_v4(),
                name: client.name.clone(),
                token: client.token.clone(),
                public_key: client.public_key.clone(),
                created_at: chrono::Utc::now(),
            });
        Ok(found.clone())
    }

    async fn ensure_offer(&self, client: &Client, lookup: &OfferLookup, use_tax: bool) -> Result<Offer> {
        let mut state = self.state.lock().await;
        let (id, name) = match lookup {
            OfferLookup::ById { id, name } => {
                if let Some(offer) = state.offers.get(id) {
                    return Ok(offer.clone());
                }
                // Names are unique per client; a taken name falls back to the id.
                let name = name
                    .clone()
                    .filter(|n| !state.offers.values().any(|o| o.client_id == client.id && &o.name == n))
                    .unwrap_or_else(|| id.clone());
                (id.clone(), name)
            }
            OfferLookup::ByName(name) => {
                let existing = state
                    .offers
                    .values()
                    .find(|o| o.client_id == client.id && &o.name == name);
                if let Some(offer) = existing {
                    return Ok(offer.clone());
                }
                (Uuid::new_v4().to_string(), name.clone())
            }
        };

        let offer = Offer {
            id: id.clone(),
            client_id: client.id,
            name,
            use_tax,
            created_at: chrono::Utc::now(),
        };
        state.offers.insert(id, offer.clone());
        Ok(offer)
    }

    async fn find_offer(&self, offer_id: &str) -> Result<Option<Offer>> {
        Ok(self.state.lock().await.offers.get(offer_id).cloned())
    }

    async fn set_offer_use_tax(&self, offer_id: &str, use_tax: bool) -> Result<Option<Offer>> {
        let mut state = self.state.lock().await;
        Ok(state.offers.get_mut(offer_id).map(|offer| {
            offer.use_tax = use_tax;
            offer.clone()
        }))
    }

    async fn begin_charge(&self, offer_id: &str) -> Result<Box<dyn ChargeSlot>> {
        let guard = self.offer_lock(offer_id).await.lock_owned().await;

        let state = self.state.lock().await;
        if !state.offers.contains_key(offer_id) {
            return Err(anyhow!("offer {offer_id} not found"));
        }
        let prior_sales = state.sales.iter().filter(|s| s.offer_id == offer_id).count() as u64;
        drop(state);

        Ok(Box::new(MemoryChargeSlot {
            state: self.state.clone(),
            guard: Some(guard),
            prior_sales,
        }))
    }

    async fn count_sales(&self, offer_id: &str) -> Result<u64> {
        let state = self.state.lock().await;
        Ok(state.sales.iter().filter(|s| s.offer_id == offer_id).count() as u64)
    }

    async fn find_sale_by_transaction(&self, gateway_transaction_id: &str) -> Result<Option<Sale>> {
        let state = self.state.lock().await;
        Ok(state
            .sales
            .iter()
            .find(|s| s.gateway_transaction_id == gateway_transaction_id)
            .cloned())
    }

    async fn apply_settlement(&self, sale_id: Uuid, outcome: SettlementOutcome) -> Result<bool> {
        let mut state = self.state.lock().await;
        let sale = state
            .sales
            .iter_mut()
            .find(|s| s.id == sale_id)
            .ok_or_else(|| anyhow!("sale {sale_id} not found"))?;
        match settle(sale.approved, outcome) {
            Some(next) => {
                sale.approved = Some(next);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_sales(&self, offer_id: &str, limit: i64) -> Result<Vec<Sale>> {
        let state = self.state.lock().await;
        Ok(state
            .sales
            .iter()
            .rev()
            .filter(|s| s.offer_id == offer_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn offer_stats(&self, offer_id: &str) -> Result<OfferStats> {
        let state = self.state.lock().await;
        let sales: Vec<Sale> = state
            .sales
            .iter()
            .filter(|s| s.offer_id == offer_id)
            .cloned()
            .collect();
        Ok(OfferStats::from_sales(&sales))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
