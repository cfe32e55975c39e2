use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::{InProgressRecord, NewRecord};

/// The storage trait for in-progress form backends.
///
/// A `FormStore` keeps at most one live record per `(user_id, form_id)`.
///
/// ## Overwrite Semantics
///
/// `put` replaces the record's data and metadata but keeps its `id` and
/// `created_at`. Every `put` refreshes `updated_at` and pushes
/// `expires_at` out by the backend's time-to-live.
///
/// ## Expiry
///
/// A record whose `expires_at` has passed is invisible: `get` and `delete`
/// return `Err(StoreError::NotFound)` and `list` omits it.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait FormStore: Send + Sync + 'static {
    /// Create or overwrite the record for `(user_id, form_id)`.
    ///
    /// Returns the stored record, including backend-assigned fields.
    async fn put(
        &self,
        user_id: &str,
        form_id: &str,
        record: NewRecord,
    ) -> Result<InProgressRecord, StoreError>;

    /// Read the live record for `(user_id, form_id)`.
    ///
    /// Returns `Err(StoreError::NotFound)` if there is none.
    async fn get(&self, user_id: &str, form_id: &str) -> Result<InProgressRecord, StoreError>;

    /// Delete the live record for `(user_id, form_id)`.
    ///
    /// Returns `Err(StoreError::NotFound)` if there is none.
    async fn delete(&self, user_id: &str, form_id: &str) -> Result<(), StoreError>;

    /// All live records of one user, ordered by `form_id`.
    async fn list(&self, user_id: &str) -> Result<Vec<InProgressRecord>, StoreError>;
}
