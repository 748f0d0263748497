use crate::domain::charge::{ChargeResponse, CreatePixRequest};
use crate::error::RelayError;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;

pub async fn create_pix(
    State(state): State<AppState>,
    Path(integration): Path<String>,
    body: Result<Json<CreatePixRequest>, JsonRejection>,
) -> Result<Json<ChargeResponse>, RelayError> {
    submit(&state, &integration, body).await
}

pub async fn create_ghostpay(
    State(state): State<AppState>,
    body: Result<Json<CreatePixRequest>, JsonRejection>,
) -> Result<Json<ChargeResponse>, RelayError> {
    submit(&state, "ghostpay", body).await
}

pub async fn create_skale_blackcat(
    State(state): State<AppState>,
    body: Result<Json<CreatePixRequest>, JsonRejection>,
) -> Result<Json<ChargeResponse>, RelayError> {
    submit(&state, "skale-blackcat", body).await
}

pub async fn create_brazapay_4m(
    State(state): State<AppState>,
    body: Result<Json<CreatePixRequest>, JsonRejection>,
) -> Result<Json<ChargeResponse>, RelayError> {
    submit(&state, "brazapay-4mpagamentos", body).await
}

async fn submit(
    state: &AppState,
    integration: &str,
    body: Result<Json<CreatePixRequest>, JsonRejection>,
) -> Result<Json<ChargeResponse>, RelayError> {
    let Json(req) = body.map_err(|e| RelayError::validation(e.body_text()))?;
    let resp = state.charge_service.submit(integration, req).await?;
    Ok(Json(resp))
}
