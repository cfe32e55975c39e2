//! Analytics events emitted by the SIP client.
//!
//! The client only names events. Where they go is up to the
//! [`AnalyticsSink`]: the default logs them through `tracing`.

use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsEvent {
    FormSaved,
    SaveFailed,
    SaveFailedClient,
    FormLoaded,
    LoadFailed,
    PrefillFailed,
    StartOver,
    DeleteFailed,
}

impl AnalyticsEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsEvent::FormSaved => "sip-form-saved",
            AnalyticsEvent::SaveFailed => "sip-form-save-failed",
            AnalyticsEvent::SaveFailedClient => "sip-form-save-failed-client",
            AnalyticsEvent::FormLoaded => "sip-form-loaded",
            AnalyticsEvent::LoadFailed => "sip-form-load-failed",
            AnalyticsEvent::PrefillFailed => "sip-form-prefill-failed",
            AnalyticsEvent::StartOver => "sip-form-start-over",
            AnalyticsEvent::DeleteFailed => "sip-form-delete-failed",
        }
    }
}

pub trait AnalyticsSink: Send + Sync {
    fn record(&self, event: AnalyticsEvent, form_id: &str);
}

/// Logs each event at `info` under the `formwork::analytics` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn record(&self, event: AnalyticsEvent, form_id: &str) {
        tracing::info!(target: "formwork::analytics", event = event.as_str(), form_id);
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AnalyticsSink for RecordingSink {
    fn record(&self, event: AnalyticsEvent, _form_id: &str) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
