use crate::error::ErrorBody;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

pub const ADMIN_KEY_HEADER: &str = "X-Internal-Api-Key";

/// Key the admin routes are guarded with.
#[derive(Clone)]
pub struct AdminKey(pub String);

pub async fn require_internal_api_key(
    State(expected): State<AdminKey>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if provided.is_empty() || provided != expected.0 {
        tracing::warn!(path = %request.uri().path(), "admin request without a valid key");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody {
                error: "unauthorized".to_string(),
                details: None,
                status: None,
            }),
        )
            .into_response();
    }

    next.run(request).await
}
