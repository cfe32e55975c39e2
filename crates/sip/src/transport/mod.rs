//! Transports carry SIP requests to the in-progress-forms API.
//!
//! Two implementations:
//! - [`http::HttpTransport`] -- the real API over HTTP (feature `http`)
//! - [`StoreTransport`] -- in-process, straight into a [`FormStore`](formwork_storage::FormStore)
//!
//! A transport reports the status code and raw body of every response it
//! receives. Deciding what a status means is the client's job; transports
//! only fail when no response came back at all.

#[cfg(feature = "http")]
pub mod http;
mod store;

pub use store::StoreTransport;

use async_trait::async_trait;
use formwork_interchange::wire::SaveRequest;

/// Status code and raw body of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        TransportResponse {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// No response was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("request could not be built: {0}")]
    Request(String),
}

#[async_trait]
pub trait SipTransport: Send + Sync {
    /// `GET /v0/in_progress_forms/{form_id}`
    async fn get(&self, form_id: &str) -> Result<TransportResponse, TransportError>;

    /// `PUT /v0/in_progress_forms/{form_id}`
    async fn put(
        &self,
        form_id: &str,
        request: &SaveRequest,
    ) -> Result<TransportResponse, TransportError>;

    /// `DELETE /v0/in_progress_forms/{form_id}`
    async fn delete(&self, form_id: &str) -> Result<TransportResponse, TransportError>;

    /// Identifier used in logs (e.g. "http", "store").
    fn transport_id(&self) -> &str;
}
