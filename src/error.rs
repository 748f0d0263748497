use crate::gateways::Provider;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{provider} gateway error: {message}")]
    UpstreamGateway {
        provider: Provider,
        status: Option<u16>,
        message: String,
        timed_out: bool,
    },

    #[error("{provider} returned a response that is not valid JSON: {reason}")]
    UpstreamParse { provider: Provider, reason: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl RelayError {
    pub fn validation(message: impl Into<String>) -> Self {
        RelayError::Validation(message.into())
    }

    pub fn upstream(provider: Provider, status: Option<u16>, message: impl Into<String>) -> Self {
        RelayError::UpstreamGateway {
            provider,
            status,
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::NotFound(_) => StatusCode::NOT_FOUND,
            RelayError::UpstreamGateway { timed_out: true, .. } => StatusCode::GATEWAY_TIMEOUT,
            RelayError::UpstreamGateway { status, .. } => status
                .filter(|s| (400..500).contains(s))
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            RelayError::UpstreamParse { .. } => StatusCode::BAD_GATEWAY,
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            RelayError::Validation(msg) => ErrorBody {
                error: "validation failed".to_string(),
                details: Some(msg.clone()),
                status: None,
            },
            RelayError::NotFound(msg) => ErrorBody {
                error: msg.clone(),
                details: None,
                status: None,
            },
            RelayError::UpstreamGateway {
                provider,
                status,
                message,
                ..
            } => ErrorBody {
                error: format!("{provider} gateway error"),
                details: Some(message.clone()),
                status: *status,
            },
            RelayError::UpstreamParse { provider, .. } => ErrorBody {
                error: format!("{provider} gateway error"),
                details: Some("response is not valid JSON".to_string()),
                status: None,
            },
            RelayError::Internal(_) => ErrorBody {
                error: "internal error".to_string(),
                details: None,
                status: None,
            },
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            RelayError::Internal(e) => tracing::error!(error = ?e, "request failed"),
            RelayError::UpstreamGateway { .. } | RelayError::UpstreamParse { .. } => {
                tracing::warn!(error = %self, status = status.as_u16(), "upstream failure")
            }
            _ => tracing::debug!(error = %self, status = status.as_u16(), "request rejected"),
        }
        (status, Json(self.body())).into_response()
    }
}
