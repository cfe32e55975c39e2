//! `formwork serve` -- mock in-progress-forms API.
//!
//! Serves the save-in-progress endpoints over `axum` + `tokio`, backed by
//! an in-memory store. Records are kept per user; the user is the bearer
//! token of the request, or `anonymous` without one.
//!
//! Endpoints:
//! - GET    /health                        - Server status (exempt from auth)
//! - GET    /v0/in_progress_forms/{formId} - Saved form, or prefill
//! - PUT    /v0/in_progress_forms/{formId} - Save form data and metadata
//! - DELETE /v0/in_progress_forms/{formId} - Discard the saved form
//!
//! With `--token`, every other request must carry
//! `Authorization: Bearer <token>`: 401 without it, 403 with another token.
//! With `--prefill <dir>`, `<dir>/<formId>.json` is returned with
//! `metadata.prefill = true` when nothing is saved for that form.

mod handlers;
mod middleware;
mod state;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{middleware as axum_middleware, Json, Router};
use formwork_storage::{InProgressApi, MemoryStore};
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{
    handle_delete_form, handle_get_form, handle_health, handle_not_found, handle_put_form,
};
use self::middleware::auth_middleware;
use self::state::AppState;

/// Maximum request body size: 10 MB.
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Build the router over `state`.
pub(crate) fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/v0/in_progress_forms/{form_id}",
            get(handle_get_form)
                .put(handle_put_form)
                .delete(handle_delete_form),
        )
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Start the mock API on the given port.
pub async fn start_server(
    port: u16,
    token: Option<String>,
    prefill_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut api = InProgressApi::new(Arc::new(MemoryStore::new()));
    if let Some(dir) = &prefill_dir {
        for (form_id, data) in load_prefill(dir)? {
            eprintln!("Loaded prefill: {} (from {})", form_id, dir.display());
            api = api.with_prefill(form_id, data);
        }
    }

    let token = token.filter(|t| !t.is_empty());
    if token.is_some() {
        eprintln!("Bearer token authentication enabled");
    }

    let state = Arc::new(AppState { api, token });
    let router = app(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("formwork mock API listening on http://0.0.0.0:{}", port);
    tracing::info!(port, "mock API started");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    eprintln!("\nServer shut down.");
    Ok(())
}

/// Every `*.json` file in `dir`, keyed by file stem.
fn load_prefill(dir: &Path) -> Result<Vec<(String, serde_json::Value)>, Box<dyn std::error::Error>> {
    let mut docs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(form_id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let src = std::fs::read_to_string(&path)?;
        let data: serde_json::Value = serde_json::from_str(&src)
            .map_err(|e| format!("invalid prefill '{}': {}", path.display(), e))?;
        docs.push((form_id.to_string(), data));
    }
    docs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(docs)
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl+C, running until killed");
        std::future::pending::<()>().await;
    }
    eprintln!("\nReceived shutdown signal...");
}
