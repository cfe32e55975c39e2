//! The in-progress-forms API over a [`FormStore`].
//!
//! Maps GET/PUT/DELETE on `/v0/in_progress_forms/{formId}` to store calls
//! and renders the camelCase wire bodies. Transport-agnostic: the mock
//! HTTP server and the in-process SIP transport both call into this.

use std::collections::HashMap;
use std::sync::Arc;

use formwork_interchange::wire::{
    LoadResponse, SaveRequest, SaveResponse, SaveResponseAttributes, SaveResponseData,
    SavedMetadata,
};
use serde_json::{json, Value};

use crate::error::StoreError;
use crate::record::{InProgressRecord, NewRecord};
use crate::traits::FormStore;

/// Resource type reported in save responses.
pub const RECORD_KIND: &str = "in_progress_forms";

/// Status code and JSON body of one API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        ApiResponse { status: 200, body }
    }

    fn error(status: u16, title: &str, detail: impl Into<String>) -> Self {
        ApiResponse {
            status,
            body: json!({ "errors": [{ "title": title, "detail": detail.into(), "status": status.to_string() }] }),
        }
    }

    fn from_store_error(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::error(404, "Record not found", err.to_string()),
            StoreError::InvalidRecord { .. } => {
                Self::error(422, "Unprocessable Entity", err.to_string())
            }
            StoreError::Backend(_) => Self::error(500, "Internal server error", err.to_string()),
        }
    }
}

/// Request handling shared by every front end of the store.
#[derive(Clone)]
pub struct InProgressApi {
    store: Arc<dyn FormStore>,
    /// Profile prefill documents keyed by form id.
    prefill: HashMap<String, Value>,
}

impl InProgressApi {
    pub fn new(store: Arc<dyn FormStore>) -> Self {
        InProgressApi {
            store,
            prefill: HashMap::new(),
        }
    }

    /// Serve `data` with `metadata.prefill = true` when `form_id` has no
    /// saved record.
    pub fn with_prefill(mut self, form_id: impl Into<String>, data: Value) -> Self {
        self.prefill.insert(form_id.into(), data);
        self
    }

    pub fn store(&self) -> &Arc<dyn FormStore> {
        &self.store
    }

    pub async fn get(&self, user_id: &str, form_id: &str) -> ApiResponse {
        match self.store.get(user_id, form_id).await {
            Ok(record) => render(&load_response(&record)),
            Err(StoreError::NotFound { .. }) => match self.prefill.get(form_id) {
                Some(data) => render(&prefill_response(data.clone())),
                None => ApiResponse::error(
                    404,
                    "Record not found",
                    format!("no in-progress form '{form_id}'"),
                ),
            },
            Err(e) => ApiResponse::from_store_error(e),
        }
    }

    pub async fn put(&self, user_id: &str, form_id: &str, request: SaveRequest) -> ApiResponse {
        let form_data: Value = match serde_json::from_str(&request.form_data) {
            Ok(v) => v,
            Err(e) => {
                return ApiResponse::error(
                    422,
                    "Unprocessable Entity",
                    format!("formData is not valid JSON: {e}"),
                )
            }
        };
        let record = NewRecord {
            form_data,
            version: request.metadata.version,
            return_url: request.metadata.return_url,
            submission: request.metadata.submission,
        };
        match self.store.put(user_id, form_id, record).await {
            Ok(stored) => render(&save_response(&stored)),
            Err(e) => ApiResponse::from_store_error(e),
        }
    }

    pub async fn delete(&self, user_id: &str, form_id: &str) -> ApiResponse {
        match self.store.delete(user_id, form_id).await {
            Ok(()) => ApiResponse::ok(json!({})),
            Err(e) => ApiResponse::from_store_error(e),
        }
    }
}

fn render<T: serde::Serialize>(body: &T) -> ApiResponse {
    match serde_json::to_value(body) {
        Ok(v) => ApiResponse::ok(v),
        Err(e) => ApiResponse::error(500, "Internal server error", e.to_string()),
    }
}

fn metadata_of(record: &InProgressRecord) -> SavedMetadata {
    SavedMetadata {
        version: record.version,
        prefill: false,
        return_url: record.return_url.clone(),
        expires_at: Some(record.expires_at),
        last_updated: Some(record.updated_at),
        in_progress_form_id: Some(record.id),
        submission: record.submission.clone(),
    }
}

/// GET body for a saved record.
pub fn load_response(record: &InProgressRecord) -> LoadResponse {
    LoadResponse {
        form_data: Some(record.form_data.clone()),
        metadata: metadata_of(record),
    }
}

/// GET body for a prefill document.
pub fn prefill_response(data: Value) -> LoadResponse {
    LoadResponse {
        form_data: Some(data),
        metadata: SavedMetadata {
            prefill: true,
            ..SavedMetadata::default()
        },
    }
}

/// PUT body for a stored record.
pub fn save_response(record: &InProgressRecord) -> SaveResponse {
    SaveResponse {
        data: SaveResponseData {
            id: record.id.to_string(),
            kind: RECORD_KIND.to_string(),
            attributes: SaveResponseAttributes {
                form_id: record.form_id.clone(),
                metadata: metadata_of(record),
            },
        },
    }
}
