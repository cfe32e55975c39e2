//! Route handlers: health and the in-progress-forms resource.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use formwork_interchange::wire::SaveRequest;
use formwork_storage::ApiResponse;

use super::json_error;
use super::middleware::bearer_token;
use super::state::AppState;

/// Records of requests without a token belong to this user.
const ANONYMOUS_USER: &str = "anonymous";

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// GET /v0/in_progress_forms/{formId}
pub(crate) async fn handle_get_form(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let user = user_of(&headers);
    let response = state.api.get(user, &form_id).await;
    tracing::debug!(user, form_id = %form_id, status = response.status, "GET in-progress form");
    reply(response)
}

/// PUT /v0/in_progress_forms/{formId}
pub(crate) async fn handle_put_form(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<String>,
    headers: HeaderMap,
    Json(parsed): Json<serde_json::Value>,
) -> Response {
    let request: SaveRequest = match serde_json::from_value(parsed) {
        Ok(r) => r,
        Err(e) => {
            return json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                &format!("invalid save request: {}", e),
            )
            .into_response()
        }
    };

    let user = user_of(&headers);
    let response = state.api.put(user, &form_id, request).await;
    tracing::debug!(user, form_id = %form_id, status = response.status, "PUT in-progress form");
    reply(response)
}

/// DELETE /v0/in_progress_forms/{formId}
pub(crate) async fn handle_delete_form(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let user = user_of(&headers);
    let response = state.api.delete(user, &form_id).await;
    tracing::debug!(user, form_id = %form_id, status = response.status, "DELETE in-progress form");
    reply(response)
}

fn user_of(headers: &HeaderMap) -> &str {
    bearer_token(headers).unwrap_or(ANONYMOUS_USER)
}

fn reply(response: ApiResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body)).into_response()
}
