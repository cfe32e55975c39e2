use serde::{Deserialize, Serialize};

/// A saved in-progress form as stored in the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InProgressRecord {
    /// Backend-assigned id, stable across overwrites of the same form.
    pub id: i64,
    pub user_id: String,
    pub form_id: String,
    pub form_data: serde_json::Value,
    pub version: u32,
    pub return_url: String,
    pub submission: Option<serde_json::Value>,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds.
    pub updated_at: i64,
    /// Unix seconds. Reads at or after this instant report `NotFound`.
    pub expires_at: i64,
}

/// The caller-supplied part of a save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub form_data: serde_json::Value,
    pub version: u32,
    pub return_url: String,
    pub submission: Option<serde_json::Value>,
}
