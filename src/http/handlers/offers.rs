use crate::domain::sale::{Offer, OfferStats, Sale};
use crate::error::RelayError;
use crate::integrations::IntegrationView;
use crate::service::charge_service::{RoutePreview, PREVIEW_DEFAULT};
use crate::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

const RECENT_SALES: i64 = 50;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferDetails {
    pub offer: Offer,
    pub stats: OfferStats,
    pub recent_sales: Vec<Sale>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOfferRequest {
    pub use_tax: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewQuery {
    pub offer_id: String,
    pub count: Option<usize>,
}

pub async fn get_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<String>,
) -> Result<Json<OfferDetails>, RelayError> {
    let offer = state
        .ledger
        .find_offer(&offer_id)
        .await?
        .ok_or_else(|| RelayError::NotFound(format!("offer '{offer_id}' not found")))?;
    let stats = state.ledger.offer_stats(&offer.id).await?;
    let recent_sales = state.ledger.list_sales(&offer.id, RECENT_SALES).await?;
    Ok(Json(OfferDetails {
        offer,
        stats,
        recent_sales,
    }))
}

pub async fn update_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<String>,
    body: Result<Json<UpdateOfferRequest>, JsonRejection>,
) -> Result<Json<Offer>, RelayError> {
    let Json(req) = body.map_err(|e| RelayError::validation(e.body_text()))?;
    let offer = state
        .ledger
        .set_offer_use_tax(&offer_id, req.use_tax)
        .await?
        .ok_or_else(|| RelayError::NotFound(format!("offer '{offer_id}' not found")))?;
    tracing::info!(offer_id = %offer.id, use_tax = offer.use_tax, "offer updated");
    Ok(Json(offer))
}

pub async fn list_integrations(State(state): State<AppState>) -> Json<Vec<IntegrationView>> {
    Json(state.integrations.views())
}

pub async fn preview_routes(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    query: Result<Query<PreviewQuery>, QueryRejection>,
) -> Result<Json<RoutePreview>, RelayError> {
    let Query(q) = query.map_err(|e| RelayError::validation(e.body_text()))?;
    let preview = state
        .charge_service
        .preview(&slug, &q.offer_id, q.count.unwrap_or(PREVIEW_DEFAULT))
        .await?;
    Ok(Json(preview))
}
