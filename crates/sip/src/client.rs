//! The save-in-progress client.
//!
//! [`SipClient`] turns transport responses into state transitions and
//! analytics events:
//!
//! | response | save | load | load with prefill |
//! |----------|------|------|-------------------|
//! | 2xx | `success` | migrated data, `success` | migrated data, prefill `success` |
//! | 401 | logout, `no-auth` | logout, `no-auth` | logout, `no-auth` |
//! | 403 | `failure` | `forbidden` | `forbidden` |
//! | 404 | `failure` | `not-found` | prefill `unfilled` |
//! | other | `failure` | `failure` | prefill `unfilled` |
//! | no response | `clientFailure` | `failure` | prefill `unfilled` |
//! | bad body or migration | n/a | `invalid-data` | prefill `unfilled` |
//!
//! Saves are serialized per client. Each request draws a token from its
//! lane; a response that is no longer the latest is dropped, and a queued
//! save whose token is already stale is skipped without a request. A load
//! that completes after the user changed the form data is dropped too.

use std::sync::Arc;

use formwork_core::{migrate, FormData, Migration, SavedForm};
use formwork_interchange::wire::{
    LoadResponse, SaveRequest, SaveRequestMetadata, SaveResponse, SavedMetadata,
};
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::analytics::{AnalyticsEvent, AnalyticsSink, TracingSink};
use crate::error::SipError;
use crate::sequence::RequestSequence;
use crate::status::{LoadStatus, SaveKind, SaveStatus};
use crate::store::{Action, Store};
use crate::transport::{SipTransport, TransportResponse};

/// Log target for failures that need a human to look at them.
pub const ERROR_TRACKING_TARGET: &str = "formwork::error_tracking";

/// Adjusts freshly loaded data before it is published.
pub trait PrefillTransformer: Send + Sync {
    fn transform(&self, loaded: SavedForm) -> SavedForm;
}

impl<F> PrefillTransformer for F
where
    F: Fn(SavedForm) -> SavedForm + Send + Sync,
{
    fn transform(&self, loaded: SavedForm) -> SavedForm {
        self(loaded)
    }
}

/// Server-assigned metadata of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Unix seconds.
    pub last_saved_date: i64,
    pub expires_at: Option<i64>,
    pub in_progress_form_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Data was published to the store.
    Loaded(SavedForm),
    /// Prefill was requested but nothing usable came back. The store was
    /// reset to the form's initial data.
    PrefillUnfilled,
}

pub struct SipClient {
    transport: Arc<dyn SipTransport>,
    store: Store,
    analytics: Arc<dyn AnalyticsSink>,
    save_lock: Mutex<()>,
    save_sequence: RequestSequence,
    load_sequence: RequestSequence,
}

impl SipClient {
    pub fn new(transport: Arc<dyn SipTransport>, store: Store) -> Self {
        SipClient {
            transport,
            store,
            analytics: Arc::new(TracingSink),
            save_lock: Mutex::new(()),
            save_sequence: RequestSequence::new(),
            load_sequence: RequestSequence::new(),
        }
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn track(&self, event: AnalyticsEvent, form_id: &str) {
        self.analytics.record(event, form_id);
    }

    // ── Save ────────────────────────────────────────────────────────────────

    /// Persist `form_data` with its metadata.
    pub async fn save(
        &self,
        kind: SaveKind,
        form_id: &str,
        form_data: &FormData,
        version: u32,
        return_url: &str,
        submission: Option<Value>,
    ) -> Result<SaveOutcome, SipError> {
        let token = self.save_sequence.issue();
        let _guard = self.save_lock.lock().await;
        if !self.save_sequence.is_current(token) {
            tracing::debug!(form_id, token, "skipping save, a newer save is queued");
            return Err(SipError::Superseded);
        }
        self.store.dispatch(Action::SavePending(kind));

        let body = match serde_json::to_string(form_data) {
            Ok(body) => body,
            Err(e) => return Err(self.save_client_failure(kind, form_id, e.to_string())),
        };
        let request = SaveRequest {
            form_data: body,
            metadata: SaveRequestMetadata {
                version,
                return_url: return_url.to_string(),
                submission,
            },
        };

        tracing::debug!(
            form_id,
            ?kind,
            transport = self.transport.transport_id(),
            "saving in-progress form"
        );
        let response = match self.transport.put(form_id, &request).await {
            Ok(r) => r,
            Err(e) => return Err(self.save_client_failure(kind, form_id, e.to_string())),
        };

        if response.status == 401 {
            tracing::warn!(form_id, "save rejected: not signed in");
            self.store.dispatch(Action::LoggedOut);
            self.store.dispatch(Action::SaveFailed {
                kind,
                status: SaveStatus::NoAuth,
            });
            self.track(AnalyticsEvent::SaveFailed, form_id);
            return Err(SipError::Unauthenticated);
        }

        if !self.save_sequence.is_current(token) {
            tracing::warn!(form_id, token, "dropping save response superseded by a newer save");
            return Err(SipError::Superseded);
        }

        if !response.is_success() {
            tracing::warn!(form_id, status = response.status, "save failed");
            self.store.dispatch(Action::SaveFailed {
                kind,
                status: SaveStatus::Failure,
            });
            self.track(AnalyticsEvent::SaveFailed, form_id);
            return Err(SipError::ServerFailure {
                status: response.status,
            });
        }

        let metadata = match serde_json::from_str::<SaveResponse>(&response.body) {
            Ok(parsed) => parsed.data.attributes.metadata,
            Err(e) => {
                tracing::warn!(form_id, error = %e, "save response body unreadable, keeping local metadata");
                SavedMetadata::default()
            }
        };
        let outcome = SaveOutcome {
            last_saved_date: metadata
                .last_updated
                .unwrap_or_else(|| OffsetDateTime::now_utc().unix_timestamp()),
            expires_at: metadata.expires_at,
            in_progress_form_id: metadata.in_progress_form_id,
        };
        self.store.dispatch(Action::Saved {
            kind,
            last_saved_date: outcome.last_saved_date,
            expires_at: outcome.expires_at,
            in_progress_form_id: outcome.in_progress_form_id,
        });
        self.track(AnalyticsEvent::FormSaved, form_id);
        tracing::info!(form_id, ?kind, "in-progress form saved");
        Ok(outcome)
    }

    fn save_client_failure(&self, kind: SaveKind, form_id: &str, message: String) -> SipError {
        tracing::warn!(form_id, error = %message, "save did not complete");
        self.store.dispatch(Action::SaveFailed {
            kind,
            status: SaveStatus::ClientFailure,
        });
        self.track(AnalyticsEvent::SaveFailedClient, form_id);
        SipError::ClientFailure(message)
    }

    // ── Load ────────────────────────────────────────────────────────────────

    /// Fetch saved data, migrate it, and publish it to the store.
    ///
    /// With `prefill`, failures other than 401 and 403 mean "no prefill
    /// available": the store falls back to initial data and the call
    /// returns `Ok(LoadOutcome::PrefillUnfilled)`. Data edited while the
    /// request was in flight is never replaced. A 401 logs out even when a
    /// newer load has been issued.
    pub async fn load(
        &self,
        form_id: &str,
        migrations: &[Migration],
        prefill: bool,
        prefill_transformer: Option<&dyn PrefillTransformer>,
    ) -> Result<LoadOutcome, SipError> {
        let token = self.load_sequence.issue();
        let revision = self.store.data_revision();
        self.store.dispatch(Action::FetchPending { prefill });

        tracing::debug!(
            form_id,
            prefill,
            transport = self.transport.transport_id(),
            "loading in-progress form"
        );
        let result = self.transport.get(form_id).await;

        if matches!(&result, Ok(r) if r.status == 401) {
            tracing::warn!(form_id, "load rejected: not signed in");
            self.store.dispatch(Action::LoggedOut);
            self.store.dispatch(Action::FetchStatus(LoadStatus::NoAuth));
            self.track(AnalyticsEvent::LoadFailed, form_id);
            return Err(SipError::Unauthenticated);
        }

        if !self.load_sequence.is_current(token) {
            tracing::warn!(form_id, token, "dropping load response superseded by a newer load");
            return Err(SipError::Superseded);
        }

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                return self.load_failed(
                    form_id,
                    prefill,
                    revision,
                    LoadStatus::Failure,
                    SipError::ClientFailure(e.to_string()),
                )
            }
        };

        match response.status {
            403 => {
                self.store.dispatch(Action::FetchStatus(LoadStatus::Forbidden));
                self.track(AnalyticsEvent::LoadFailed, form_id);
                return Err(SipError::Forbidden);
            }
            404 => {
                return self.load_failed(
                    form_id,
                    prefill,
                    revision,
                    LoadStatus::NotFound,
                    SipError::NotFound {
                        form_id: form_id.to_string(),
                    },
                )
            }
            status if !(200..300).contains(&status) => {
                return self.load_failed(
                    form_id,
                    prefill,
                    revision,
                    LoadStatus::Failure,
                    SipError::ServerFailure { status },
                )
            }
            _ => {}
        }

        let loaded = match decode_and_migrate(&response, migrations) {
            Ok(loaded) => loaded,
            Err(message) => {
                tracing::error!(
                    target: ERROR_TRACKING_TARGET,
                    form_id,
                    prefill,
                    error = %message,
                    "saved form data could not be loaded"
                );
                return self.load_failed(
                    form_id,
                    prefill,
                    revision,
                    LoadStatus::InvalidData,
                    SipError::InvalidData(message),
                );
            }
        };

        let loaded = match (prefill, prefill_transformer) {
            (true, Some(transformer)) => transformer.transform(loaded),
            _ => loaded,
        };

        if self.store.data_revision() != revision {
            tracing::warn!(form_id, "form data changed while loading, dropping loaded data");
            self.store.dispatch(Action::FetchStatus(LoadStatus::NotAttempted));
            return Err(SipError::Superseded);
        }

        let prefilled = loaded.metadata.prefill;
        self.store.dispatch(Action::Loaded {
            form_data: loaded.form_data.clone(),
            metadata: loaded.metadata.clone(),
            prefilled,
        });
        self.track(AnalyticsEvent::FormLoaded, form_id);
        tracing::info!(
            form_id,
            version = loaded.metadata.version,
            prefilled,
            "in-progress form loaded"
        );
        Ok(LoadOutcome::Loaded(loaded))
    }

    fn load_failed(
        &self,
        form_id: &str,
        prefill: bool,
        revision: u64,
        status: LoadStatus,
        error: SipError,
    ) -> Result<LoadOutcome, SipError> {
        if prefill && self.store.data_revision() != revision {
            tracing::warn!(form_id, reason = %error, "form data changed while loading, keeping it");
            self.store.dispatch(Action::FetchStatus(LoadStatus::NotAttempted));
            return Err(SipError::Superseded);
        }
        if prefill {
            tracing::info!(form_id, reason = %error, "no prefill available");
            self.store.dispatch(Action::PrefillUnfilled);
            if !matches!(error, SipError::NotFound { .. }) {
                self.track(AnalyticsEvent::PrefillFailed, form_id);
            }
            return Ok(LoadOutcome::PrefillUnfilled);
        }
        tracing::warn!(form_id, error = %error, "load failed");
        self.store.dispatch(Action::FetchStatus(status));
        self.track(AnalyticsEvent::LoadFailed, form_id);
        Err(error)
    }

    // ── Remove ──────────────────────────────────────────────────────────────

    /// Delete the saved form, then load again with prefill.
    ///
    /// A 404 from the delete means the form is already gone.
    pub async fn remove(
        &self,
        form_id: &str,
        migrations: &[Migration],
        prefill_transformer: Option<&dyn PrefillTransformer>,
    ) -> Result<LoadOutcome, SipError> {
        self.store.dispatch(Action::FetchPending { prefill: true });

        let response = match self.transport.delete(form_id).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(form_id, error = %e, "delete did not complete");
                self.store.dispatch(Action::FetchStatus(LoadStatus::Failure));
                self.track(AnalyticsEvent::DeleteFailed, form_id);
                return Err(SipError::ClientFailure(e.to_string()));
            }
        };

        match response.status {
            401 => {
                tracing::warn!(form_id, "delete rejected: not signed in");
                self.store.dispatch(Action::LoggedOut);
                self.store.dispatch(Action::FetchStatus(LoadStatus::NoAuth));
                self.track(AnalyticsEvent::DeleteFailed, form_id);
                return Err(SipError::Unauthenticated);
            }
            404 => {
                tracing::debug!(form_id, "nothing to delete");
            }
            status if !(200..300).contains(&status) => {
                tracing::warn!(form_id, status, "delete failed");
                self.store.dispatch(Action::FetchStatus(LoadStatus::Failure));
                self.track(AnalyticsEvent::DeleteFailed, form_id);
                return Err(SipError::ServerFailure { status });
            }
            _ => {}
        }

        self.track(AnalyticsEvent::StartOver, form_id);
        self.load(form_id, migrations, true, prefill_transformer).await
    }
}

/// Parse a GET body and run the migration pipeline over it.
fn decode_and_migrate(
    response: &TransportResponse,
    migrations: &[Migration],
) -> Result<SavedForm, String> {
    let parsed: LoadResponse =
        serde_json::from_str(&response.body).map_err(|e| format!("malformed response: {e}"))?;

    let form_data = match parsed.form_data {
        Some(Value::String(encoded)) => serde_json::from_str(&encoded)
            .map_err(|e| format!("formData is not valid JSON: {e}"))?,
        Some(Value::Object(map)) => Value::Object(map),
        Some(other) => return Err(format!("formData must be an object, got {other}")),
        None => return Err("response has no formData".to_string()),
    };
    if !form_data.is_object() {
        return Err("formData must be an object".to_string());
    }

    migrate(
        SavedForm {
            form_data,
            metadata: parsed.metadata,
        },
        migrations,
    )
    .map_err(|e| e.to_string())
}
