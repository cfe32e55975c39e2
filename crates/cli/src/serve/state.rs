//! Application state.

use formwork_storage::InProgressApi;

/// Application state shared across request handlers.
pub(crate) struct AppState {
    pub(crate) api: InProgressApi,
    /// Required bearer token (None = no auth).
    pub(crate) token: Option<String>,
}
