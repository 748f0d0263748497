use crate::domain::charge::OfferLookup;
use crate::domain::sale::{Client, NewClient, NewSale, Offer, OfferStats, Sale};
use crate::domain::webhook::SettlementOutcome;
use crate::repo::ledger::{ChargeSlot, SalesLedger};
use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

const SALE_COLUMNS: &str = "id, offer_id, client_id, gateway_transaction_id, integration, provider, \
     to_client, routing_reason, amount_minor, customer_name, product_name, approved, created_at";

#[derive(Clone)]
pub struct SalesRepo {
    pub pool: PgPool,
}

fn client_from_row(r: &PgRow) -> Client {
    Client {
        id: r.get("id"),
        name: r.get("name"),
        token: r.get("token"),
        public_key: r.get("public_key"),
        created_at: r.get("created_at"),
    }
}

fn offer_from_row(r: &PgRow) -> Offer {
    Offer {
        id: r.get("id"),
        client_id: r.get("client_id"),
        name: r.get("name"),
        use_tax: r.get("use_tax"),
        created_at: r.get("created_at"),
    }
}

fn sale_from_row(r: &PgRow) -> Sale {
    Sale {
        id: r.get("id"),
        offer_id: r.get("offer_id"),
        client_id: r.get("client_id"),
        gateway_transaction_id: r.get("gateway_transaction_id"),
        integration: r.get("integration"),
        provider: r.get("provider"),
        to_client: r.get("to_client"),
        routing_reason: r.get("routing_reason"),
        amount_minor: r.get("amount_minor"),
        customer_name: r.get("customer_name"),
        product_name: r.get("product_name"),
        approved: r.get("approved"),
        created_at: r.get("created_at"),
    }
}

impl SalesRepo {
    async fn offer_by_id(&self, offer_id: &str) -> Result<Option<Offer>> {
        let row = sqlx::query("SELECT id, client_id, name, use_tax, created_at FROM offers WHERE id = $1")
            .bind(offer_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(offer_from_row))
    }
}

/// Holds the offer row lock until `record` commits or the slot is dropped.
pub struct PgChargeSlot {
    tx: Option<Transaction<'static, Postgres>>,
    prior_sales: u64,
}

#[async_trait::async_trait]
impl ChargeSlot for PgChargeSlot {
    fn prior_sales(&self) -> u64 {
        self.prior_sales
    }

    async fn record(&mut self, sale: &NewSale) -> Result<bool> {
        let mut tx = self
            .tx
            .take()
            .ok_or_else(|| anyhow!("charge slot already used"))?;

        let existing = sqlx::query("SELECT 1 FROM sales WHERE gateway_transaction_id = $1")
            .bind(&sale.gateway_transaction_id)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            tx.commit().await?;
            return Ok(false);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO sales (
                id, offer_id, client_id, gateway_transaction_id, integration, provider,
                to_client, routing_reason, amount_minor, customer_name, product_name
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (gateway_transaction_id) DO NOTHING
            "#,
        )
        .bind(sale.id)
        .bind(&sale.offer_id)
        .bind(sale.client_id)
        .bind(&sale.gateway_transaction_id)
        .bind(&sale.integration)
        .bind(&sale.provider)
        .bind(sale.to_client)
        .bind(&sale.routing_reason)
        .bind(sale.amount_minor)
        .bind(&sale.customer_name)
        .bind(&sale.product_name)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(inserted == 1)
    }
}

#[async_trait::async_trait]
impl SalesLedger for SalesRepo {
    async fn ensure_client(&self, client: &NewClient) -> Result<Client> {
        let row = sqlx::query(
            r#"
            INSERT INTO clients (id, name, token, public_key)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (token) DO UPDATE SET token = EXCLUDED.token
            RETURNING id, name, token, public_key, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&client.name)
        .bind(&client.token)
        .bind(&client.public_key)
        .fetch_one(&self.pool)
        .await?;
        Ok(client_from_row(&row))
    }

    async fn ensure_offer(&self, client: &Client, lookup: &OfferLookup, use_tax: bool) -> Result<Offer> {
        match lookup {
            OfferLookup::ById { id, name } => {
                // Names are unique per client; a taken name falls back to the id.
                let requested = name.as_deref().unwrap_or(id);
                for candidate in [requested, id.as_str()] {
                    sqlx::query(
                        "INSERT INTO offers (id, client_id, name, use_tax) VALUES ($1, $2, $3, $4) ON CONFLICT DO NOTHING",
                    )
                    .bind(id)
                    .bind(client.id)
                    .bind(candidate)
                    .bind(use_tax)
                    .execute(&self.pool)
                    .await?;
                    if let Some(offer) = self.offer_by_id(id).await? {
                        return Ok(offer);
                    }
                }
                Err(anyhow!("offer {id} could not be stored: name already in use"))
            }
            OfferLookup::ByName(name) => {
                sqlx::query(
                    r#"
                    INSERT INTO offers (id, client_id, name, use_tax)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (client_id, name) DO NOTHING
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(client.id)
                .bind(name)
                .bind(use_tax)
                .execute(&self.pool)
                .await?;

                let row = sqlx::query(
                    "SELECT id, client_id, name, use_tax, created_at FROM offers WHERE client_id = $1 AND name = $2",
                )
                .bind(client.id)
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
                Ok(offer_from_row(&row))
            }
        }
    }

    async fn find_offer(&self, offer_id: &str) -> Result<Option<Offer>> {
        self.offer_by_id(offer_id).await
    }

    async fn set_offer_use_tax(&self, offer_id: &str, use_tax: bool) -> Result<Option<Offer>> {
        let row = sqlx::query(
            "UPDATE offers SET use_tax = $2 WHERE id = $1 RETURNING id, client_id, name, use_tax, created_at",
        )
        .bind(offer_id)
        .bind(use_tax)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(offer_from_row))
    }

    async fn begin_charge(&self, offer_id: &str) -> Result<Box<dyn ChargeSlot>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM offers WHERE id = $1 FOR UPDATE")
            .bind(offer_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| anyhow!("offer {offer_id} not found"))?;

        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM sales WHERE offer_id = $1")
            .bind(offer_id)
            .fetch_one(&mut *tx)
            .await?
            .get("n");

        Ok(Box::new(PgChargeSlot {
            tx: Some(tx),
            prior_sales: count.max(0) as u64,
        }))
    }

    async fn count_sales(&self, offer_id: &str) -> Result<u64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM sales WHERE offer_id = $1")
            .bind(offer_id)
            .fetch_one(&self.pool)
            .await?
            .get("n");
        Ok(count.max(0) as u64)
    }

    async fn find_sale_by_transaction(&self, gateway_transaction_id: &str) -> Result<Option<Sale>> {
        let row = sqlx::query(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE gateway_transaction_id = $1"
        ))
        .bind(gateway_transaction_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(sale_from_row))
    }

    async fn apply_settlement(&self, sale_id: Uuid, outcome: SettlementOutcome) -> Result<bool> {
        // Guards mirror domain::webhook::settle so concurrent deliveries stay monotonic.
        let sql = match outcome {
            SettlementOutcome::Approved => {
                "UPDATE sales SET approved = true, updated_at = now() WHERE id = $1 AND approved IS DISTINCT FROM true"
            }
            SettlementOutcome::Rejected => {
                "UPDATE sales SET approved = false, updated_at = now() WHERE id = $1 AND approved IS NULL"
            }
            SettlementOutcome::Indeterminate => return Ok(false),
        };
        let affected = sqlx::query(sql)
            .bind(sale_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn list_sales(&self, offer_id: &str, limit: i64) -> Result<Vec<Sale>> {
        let rows = sqlx::query(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE offer_id = $1 ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(offer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(sale_from_row).collect())
    }

    async fn offer_stats(&self, offer_id: &str) -> Result<OfferStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE to_client) AS to_client,
                COUNT(*) FILTER (WHERE NOT to_client) AS to_operator,
                COUNT(*) FILTER (WHERE approved = true) AS approved,
                COUNT(*) FILTER (WHERE approved = false) AS rejected,
                COUNT(*) FILTER (WHERE approved IS NULL) AS pending
            FROM sales WHERE offer_id = $1
            "#,
        )
        .bind(offer_id)
        .fetch_one(&self.pool)
        .await?;

        let n = |col: &str| -> usize { row.get::<i64, _>(col).max(0) as usize };
        Ok(OfferStats {
            total: n("total"),
            to_client: n("to_client"),
            to_operator: n("to_operator"),
            approved: n("approved"),
            rejected: n("rejected"),
            pending: n("pending"),
        })
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
