//! Runs against a real Postgres when `TEST_DATABASE_URL` is set; every test
//! returns early otherwise. Each test uses its own client token and offer ids.

use pix_relay::domain::charge::OfferLookup;
use pix_relay::domain::sale::{Client, NewClient, NewSale, Offer};
use pix_relay::domain::webhook::SettlementOutcome;
use pix_relay::repo::ledger::SalesLedger;
use pix_relay::repo::sales_repo::SalesRepo;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use uuid::Uuid;

async fn repo() -> Option<SalesRepo> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new().max_connections(8).connect(&url).await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    Some(SalesRepo { pool })
}

async fn client(repo: &SalesRepo) -> Client {
    repo.ensure_client(&NewClient {
        token: format!("tok_{}", Uuid::new_v4()),
        name: "Loja".into(),
        public_key: None,
    })
    .await
    .unwrap()
}

async fn offer(repo: &SalesRepo, client: &Client) -> Offer {
    repo.ensure_offer(
        client,
        &OfferLookup::ById {
            id: format!("offer-{}", Uuid::new_v4()),
            name: None,
        },
        true,
    )
    .await
    .unwrap()
}

fn new_sale(offer: &Offer, tx: &str) -> NewSale {
    NewSale {
        id: Uuid::new_v4(),
        offer_id: offer.id.clone(),
        client_id: offer.client_id,
        gateway_transaction_id: tx.to_string(),
        integration: "ghostpay".into(),
        provider: "ghostpay".into(),
        to_client: true,
        routing_reason: "client_slot".into(),
        amount_minor: 1000,
        customer_name: "Ana".into(),
        product_name: "Ebook".into(),
    }
}

async fn recorded(repo: &SalesRepo, offer: &Offer) -> NewSale {
    let sale = new_sale(offer, &format!("tx_{}", Uuid::new_v4()));
    let mut slot = repo.begin_charge(&offer.id).await.unwrap();
    assert!(slot.record(&sale).await.unwrap());
    sale
}

#[tokio::test]
async fn settlement_is_monotonic_in_both_orders() {
    let Some(repo) = repo().await else { return };
    let client = client(&repo).await;
    let offer = offer(&repo, &client).await;

    let first = recorded(&repo, &offer).await;
    assert!(repo.apply_settlement(first.id, SettlementOutcome::Approved).await.unwrap());
    assert!(!repo.apply_settlement(first.id, SettlementOutcome::Rejected).await.unwrap());
    let stored = repo
        .find_sale_by_transaction(&first.gateway_transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.approved, Some(true));

    let second = recorded(&repo, &offer).await;
    assert!(repo.apply_settlement(second.id, SettlementOutcome::Rejected).await.unwrap());
    assert!(!repo.apply_settlement(second.id, SettlementOutcome::Rejected).await.unwrap());
    assert!(repo.apply_settlement(second.id, SettlementOutcome::Approved).await.unwrap());
    let stored = repo
        .find_sale_by_transaction(&second.gateway_transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.approved, Some(true));
}

#[tokio::test]
async fn duplicate_transaction_records_one_sale() {
    let Some(repo) = repo().await else { return };
    let client = client(&repo).await;
    let offer = offer(&repo, &client).await;
    let tx = format!("tx_{}", Uuid::new_v4());

    let mut slot = repo.begin_charge(&offer.id).await.unwrap();
    assert!(slot.record(&new_sale(&offer, &tx)).await.unwrap());
    let mut slot = repo.begin_charge(&offer.id).await.unwrap();
    assert_eq!(slot.prior_sales(), 1);
    assert!(!slot.record(&new_sale(&offer, &tx)).await.unwrap());

    assert_eq!(repo.count_sales(&offer.id).await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_lookups_by_name_create_one_offer() {
    let Some(repo) = repo().await else { return };
    let client = client(&repo).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let repo = repo.clone();
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            repo.ensure_offer(&client, &OfferLookup::ByName("default".into()), true)
                .await
                .map(|o| o.id)
                .map_err(|e| e.to_string())
        }));
    }
    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1, "{ids:?}");
}

#[tokio::test]
async fn offer_id_with_a_taken_name_keeps_its_id_as_name() {
    let Some(repo) = repo().await else { return };
    let client = client(&repo).await;
    let named = repo
        .ensure_offer(&client, &OfferLookup::ByName("Crocs".into()), false)
        .await
        .unwrap();

    let id = format!("offer-{}", Uuid::new_v4());
    let by_id = repo
        .ensure_offer(
            &client,
            &OfferLookup::ById {
                id: id.clone(),
                name: Some("Crocs".into()),
            },
            false,
        )
        .await
        .unwrap();
    assert_eq!(by_id.name, id);
    assert_ne!(by_id.id, named.id);
}

#[tokio::test]
async fn open_slot_blocks_the_next_count() {
    let Some(repo) = repo().await else { return };
    let client = client(&repo).await;
    let offer = offer(&repo, &client).await;

    let mut first = repo.begin_charge(&offer.id).await.unwrap();
    assert_eq!(first.prior_sales(), 0);

    let waiting = {
        let repo = repo.clone();
        let offer_id = offer.id.clone();
        tokio::spawn(async move {
            let slot = repo.begin_charge(&offer_id).await.unwrap();
            slot.prior_sales()
        })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!waiting.is_finished());

    assert!(first
        .record(&new_sale(&offer, &format!("tx_{}", Uuid::new_v4())))
        .await
        .unwrap());
    assert_eq!(waiting.await.unwrap(), 1);
}
