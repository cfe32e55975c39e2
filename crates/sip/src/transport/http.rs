//! HTTP transport for the in-progress-forms API.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking` to avoid
//! blocking the async runtime. Non-2xx statuses are returned as responses,
//! not errors.

use std::time::Duration;

use async_trait::async_trait;
use formwork_interchange::wire::{form_path, SaveRequest, KEY_INFLECTION_CAMEL, KEY_INFLECTION_HEADER};

use super::{SipTransport, TransportError, TransportResponse};
use crate::config::ClientConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Put,
    Delete,
}

/// Transport that talks to `{base_url}/v0/in_progress_forms/{form_id}`.
///
/// - `Authorization: Bearer <token>` when a token is configured
/// - `X-Key-Inflection: camel` on every request
/// - a global per-request timeout
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    auth_token: Option<String>,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Self {
        HttpTransport {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            timeout: config.timeout(),
        }
    }

    pub fn url_for(&self, form_id: &str) -> String {
        format!("{}{}", self.base_url, form_path(form_id))
    }

    async fn send(
        &self,
        method: Method,
        form_id: &str,
        body: Option<&SaveRequest>,
    ) -> Result<TransportResponse, TransportError> {
        let url = self.url_for(form_id);
        let auth_token = self.auth_token.clone();
        let timeout = self.timeout;
        let body = body.cloned();

        tracing::debug!(?method, %url, "sending in-progress form request");

        tokio::task::spawn_blocking(move || {
            let agent: ureq::Agent = ureq::Agent::config_builder()
                .timeout_global(Some(timeout))
                .http_status_as_error(false)
                .build()
                .into();

            let auth = auth_token.map(|t| format!("Bearer {}", t));
            let result = match (method, body) {
                (Method::Put, Some(body)) => {
                    let mut request = agent
                        .put(&url)
                        .header(KEY_INFLECTION_HEADER, KEY_INFLECTION_CAMEL);
                    if let Some(ref auth) = auth {
                        request = request.header("Authorization", auth);
                    }
                    request.send_json(&body)
                }
                (Method::Put, None) => {
                    return Err(TransportError::Request("PUT without a body".to_string()))
                }
                (Method::Get, _) => {
                    let mut request = agent
                        .get(&url)
                        .header(KEY_INFLECTION_HEADER, KEY_INFLECTION_CAMEL);
                    if let Some(ref auth) = auth {
                        request = request.header("Authorization", auth);
                    }
                    request.call()
                }
                (Method::Delete, _) => {
                    let mut request = agent
                        .delete(&url)
                        .header(KEY_INFLECTION_HEADER, KEY_INFLECTION_CAMEL);
                    if let Some(ref auth) = auth {
                        request = request.header("Authorization", auth);
                    }
                    request.call()
                }
            };

            let response = result.map_err(map_ureq_error)?;
            let status = response.status().as_u16();
            let text = response
                .into_body()
                .read_to_string()
                .map_err(map_ureq_error)?;
            Ok(TransportResponse::new(status, text))
        })
        .await
        .map_err(|e| TransportError::Network(format!("task join error: {}", e)))?
    }
}

fn map_ureq_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        other => TransportError::Network(other.to_string()),
    }
}

#[async_trait]
impl SipTransport for HttpTransport {
    async fn get(&self, form_id: &str) -> Result<TransportResponse, TransportError> {
        self.send(Method::Get, form_id, None).await
    }

    async fn put(
        &self,
        form_id: &str,
        request: &SaveRequest,
    ) -> Result<TransportResponse, TransportError> {
        self.send(Method::Put, form_id, Some(request)).await
    }

    async fn delete(&self, form_id: &str) -> Result<TransportResponse, TransportError> {
        self.send(Method::Delete, form_id, None).await
    }

    fn transport_id(&self) -> &str {
        "http"
    }
}
