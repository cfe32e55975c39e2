//! Request and response bodies of the in-progress-forms API.
//!
//! All keys are camelCase; clients send `X-Key-Inflection: camel` so the
//! server answers in the same inflection.

use serde::{Deserialize, Serialize};

/// Header name clients send to request camelCase keys.
pub const KEY_INFLECTION_HEADER: &str = "X-Key-Inflection";

/// Value of [`KEY_INFLECTION_HEADER`].
pub const KEY_INFLECTION_CAMEL: &str = "camel";

/// Path of the in-progress-forms collection, relative to the API base URL.
pub const IN_PROGRESS_FORMS_PATH: &str = "/v0/in_progress_forms";

/// Metadata persisted next to saved form data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMetadata {
    #[serde(default)]
    pub version: u32,
    /// True when the record was produced from profile prefill, not saved by the user.
    #[serde(default)]
    pub prefill: bool,
    #[serde(default)]
    pub return_url: String,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_progress_form_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<serde_json::Value>,
}

/// Metadata sent with a save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequestMetadata {
    pub version: u32,
    pub return_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<serde_json::Value>,
}

/// PUT body. `form_data` is the JSON-encoded form data document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub form_data: String,
    pub metadata: SaveRequestMetadata,
}

/// PUT 200 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveResponse {
    pub data: SaveResponseData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveResponseData {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub attributes: SaveResponseAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponseAttributes {
    #[serde(default)]
    pub form_id: String,
    pub metadata: SavedMetadata,
}

/// GET 200 response. `form_data` is either an object or a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResponse {
    #[serde(default)]
    pub form_data: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: SavedMetadata,
}

/// Build the resource path for one form.
pub fn form_path(form_id: &str) -> String {
    format!("{}/{}", IN_PROGRESS_FORMS_PATH, form_id)
}
