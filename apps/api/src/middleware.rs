use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ErrorResponse;
use crate::state::AppState;

const FUNCTION_KEY_HEADER: &str = "x-functions-key";

/// Rejects requests that do not present the configured function key.
pub async fn require_function_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if presented_key(request.headers()) != Some(state.function_key.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                message: "a valid function key is required".to_owned(),
            }),
        )
            .into_response();
    }

    next.run(request).await
}

fn presented_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(FUNCTION_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
}
