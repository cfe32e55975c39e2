//! formwork-sip: save-in-progress for form sessions.
//!
//! # Public API
//!
//! - [`Store`] -- the state container (`get_state` / `dispatch`) over a pure reducer
//! - [`SipClient`] -- `save`, `load`, and `remove` against a [`SipTransport`]
//! - [`FormSession`] -- a config, a store, and the page router kept in step
//! - [`ClientConfig`] -- API URL, token, and timeout from TOML and the environment
//! - [`AnalyticsSink`] -- where `sip-form-*` events go

pub mod analytics;
pub mod client;
pub mod config;
pub mod error;
pub mod sequence;
pub mod session;
pub mod status;
pub mod store;
pub mod transport;

pub use analytics::{AnalyticsEvent, AnalyticsSink, RecordingSink, TracingSink};
pub use client::{LoadOutcome, PrefillTransformer, SaveOutcome, SipClient};
pub use config::{ClientConfig, ConfigError};
pub use error::SipError;
pub use session::FormSession;
pub use status::{LoadStatus, PrefillStatus, SaveKind, SaveStatus};
pub use store::{reduce, Action, FormState, Store};
pub use transport::{SipTransport, StoreTransport, TransportError, TransportResponse};

#[cfg(feature = "http")]
pub use transport::http::HttpTransport;
