use crate::error::RelayError;
use crate::service::webhook_service::WebhookAck;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;

pub async fn receive(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<WebhookAck>, RelayError> {
    reconcile(&state, &provider, body).await
}

pub async fn receive_ghostpay(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<WebhookAck>, RelayError> {
    reconcile(&state, "ghostpay", body).await
}

pub async fn receive_blackcat(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<WebhookAck>, RelayError> {
    reconcile(&state, "blackcat", body).await
}

async fn reconcile(
    state: &AppState,
    provider: &str,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<WebhookAck>, RelayError> {
    let Json(payload) = body.map_err(|e| RelayError::validation(e.body_text()))?;
    let ack = state.webhook_service.reconcile(provider, &payload).await?;
    Ok(Json(ack))
}
