/// All errors that can be returned by a FormStore implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No live record for the given (user_id, form_id). Expired records
    /// report this too.
    #[error("in-progress form not found: {user_id}/{form_id}")]
    NotFound { user_id: String, form_id: String },

    /// The caller supplied a record the backend cannot store.
    #[error("invalid record for {form_id}: {message}")]
    InvalidRecord { form_id: String, message: String },

    /// A backend-specific storage error (connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
