//! formwork-storage: server-side persistence of in-progress forms.
//!
//! - [`FormStore`] -- the async storage trait, one live record per
//!   `(user_id, form_id)`
//! - [`MemoryStore`] -- in-memory backend with record expiry
//! - [`InProgressApi`] -- the in-progress-forms API rendered over any store
//! - [`conformance`] -- a backend-agnostic test suite for `FormStore`

pub mod api;
pub mod conformance;
mod error;
mod memory;
mod record;
mod traits;

pub use api::{ApiResponse, InProgressApi};
pub use error::StoreError;
pub use memory::{MemoryStore, DEFAULT_TTL};
pub use record::{InProgressRecord, NewRecord};
pub use traits::FormStore;
