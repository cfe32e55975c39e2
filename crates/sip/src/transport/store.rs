use std::sync::Arc;

use async_trait::async_trait;
use formwork_interchange::wire::SaveRequest;
use formwork_storage::{ApiResponse, FormStore, InProgressApi};

use super::{SipTransport, TransportError, TransportResponse};

/// Serves requests for one user from an in-process store.
#[derive(Clone)]
pub struct StoreTransport {
    api: InProgressApi,
    user_id: String,
}

impl StoreTransport {
    pub fn new(api: InProgressApi, user_id: impl Into<String>) -> Self {
        StoreTransport {
            api,
            user_id: user_id.into(),
        }
    }

    /// Transport over a bare store with no prefill documents.
    pub fn from_store(store: Arc<dyn FormStore>, user_id: impl Into<String>) -> Self {
        Self::new(InProgressApi::new(store), user_id)
    }

    fn respond(resp: ApiResponse) -> Result<TransportResponse, TransportError> {
        let body = serde_json::to_string(&resp.body)
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(TransportResponse::new(resp.status, body))
    }
}

#[async_trait]
impl SipTransport for StoreTransport {
    async fn get(&self, form_id: &str) -> Result<TransportResponse, TransportError> {
        Self::respond(self.api.get(&self.user_id, form_id).await)
    }

    async fn put(
        &self,
        form_id: &str,
        request: &SaveRequest,
    ) -> Result<TransportResponse, TransportError> {
        Self::respond(self.api.put(&self.user_id, form_id, request.clone()).await)
    }

    async fn delete(&self, form_id: &str) -> Result<TransportResponse, TransportError> {
        Self::respond(self.api.delete(&self.user_id, form_id).await)
    }

    fn transport_id(&self) -> &str {
        "store"
    }
}
