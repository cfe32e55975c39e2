//! State container for one form session.
//!
//! [`reduce`] is a pure function from state and action to the next state.
//! [`Store`] holds the current state behind a `watch` channel so other
//! tasks can observe changes.

use std::sync::Arc;

use formwork_core::data::set_path;
use formwork_core::FormData;
use formwork_interchange::wire::SavedMetadata;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::status::{LoadStatus, PrefillStatus, SaveKind, SaveStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    pub form_data: FormData,
    /// Data to fall back to when prefill has nothing to offer.
    pub initial_data: FormData,
    /// Bumped on every change to `form_data`.
    pub data_revision: u64,
    pub save_status: SaveStatus,
    pub auto_save_status: SaveStatus,
    pub load_status: LoadStatus,
    pub prefill_status: PrefillStatus,
    /// Unix seconds.
    pub last_saved_date: Option<i64>,
    /// Unix seconds.
    pub expires_at: Option<i64>,
    pub in_progress_form_id: Option<i64>,
    pub version: u32,
    pub return_url: Option<String>,
    pub current_route: Option<String>,
    pub logged_in: bool,
}

impl FormState {
    pub fn new(initial_data: FormData) -> Self {
        FormState {
            form_data: initial_data.clone(),
            initial_data,
            data_revision: 0,
            save_status: SaveStatus::NotAttempted,
            auto_save_status: SaveStatus::NotAttempted,
            load_status: LoadStatus::NotAttempted,
            prefill_status: PrefillStatus::NotAttempted,
            last_saved_date: None,
            expires_at: None,
            in_progress_form_id: None,
            version: 0,
            return_url: None,
            current_route: None,
            logged_in: true,
        }
    }

    /// Status of saves of the given kind.
    pub fn save_status_of(&self, kind: SaveKind) -> SaveStatus {
        match kind {
            SaveKind::Auto => self.auto_save_status,
            SaveKind::SaveAndRedirect => self.save_status,
        }
    }

    fn save_status_mut(&mut self, kind: SaveKind) -> &mut SaveStatus {
        match kind {
            SaveKind::Auto => &mut self.auto_save_status,
            SaveKind::SaveAndRedirect => &mut self.save_status,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetData(FormData),
    SetField { path: String, value: Value },
    FetchPending { prefill: bool },
    FetchStatus(LoadStatus),
    Loaded {
        form_data: FormData,
        metadata: SavedMetadata,
        prefilled: bool,
    },
    PrefillUnfilled,
    SavePending(SaveKind),
    Saved {
        kind: SaveKind,
        last_saved_date: i64,
        expires_at: Option<i64>,
        in_progress_form_id: Option<i64>,
    },
    SaveFailed { kind: SaveKind, status: SaveStatus },
    LoggedOut,
    Navigate(String),
}

pub fn reduce(state: &FormState, action: Action) -> FormState {
    let mut next = state.clone();
    match action {
        Action::SetData(data) => {
            next.form_data = data;
            next.data_revision += 1;
        }
        Action::SetField { path, value } => {
            if set_path(&mut next.form_data, &path, value) {
                next.data_revision += 1;
            }
        }
        Action::FetchPending { prefill } => {
            next.load_status = LoadStatus::Pending;
            if prefill {
                next.prefill_status = PrefillStatus::Pending;
            }
        }
        Action::FetchStatus(status) => {
            next.load_status = status;
            if next.prefill_status == PrefillStatus::Pending {
                next.prefill_status = PrefillStatus::NotAttempted;
            }
        }
        Action::Loaded {
            form_data,
            metadata,
            prefilled,
        } => {
            next.form_data = form_data;
            next.data_revision += 1;
            next.version = metadata.version;
            next.return_url = Some(metadata.return_url).filter(|u| !u.is_empty());
            next.expires_at = metadata.expires_at;
            next.last_saved_date = metadata.last_updated;
            next.in_progress_form_id = metadata.in_progress_form_id;
            next.load_status = LoadStatus::Success;
            next.prefill_status = if prefilled {
                PrefillStatus::Success
            } else {
                PrefillStatus::NotAttempted
            };
        }
        Action::PrefillUnfilled => {
            next.form_data = next.initial_data.clone();
            next.data_revision += 1;
            next.load_status = LoadStatus::NotAttempted;
            next.prefill_status = PrefillStatus::Unfilled;
        }
        Action::SavePending(kind) => {
            *next.save_status_mut(kind) = SaveStatus::Pending;
        }
        Action::Saved {
            kind,
            last_saved_date,
            expires_at,
            in_progress_form_id,
        } => {
            *next.save_status_mut(kind) = SaveStatus::Success;
            next.last_saved_date = Some(last_saved_date);
            if expires_at.is_some() {
                next.expires_at = expires_at;
            }
            if in_progress_form_id.is_some() {
                next.in_progress_form_id = in_progress_form_id;
            }
        }
        Action::SaveFailed { kind, status } => {
            *next.save_status_mut(kind) = status;
        }
        Action::LoggedOut => {
            next.logged_in = false;
        }
        Action::Navigate(route) => {
            next.current_route = Some(route);
        }
    }
    next
}

/// Shared handle to the current [`FormState`].
#[derive(Debug, Clone)]
pub struct Store {
    state: Arc<watch::Sender<FormState>>,
}

impl Store {
    pub fn new(initial: FormState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Store {
            state: Arc::new(tx),
        }
    }

    /// A store whose form data starts as (and resets to) `initial_data`.
    pub fn with_initial_data(initial_data: FormData) -> Self {
        Self::new(FormState::new(initial_data))
    }

    pub fn get_state(&self) -> FormState {
        self.state.borrow().clone()
    }

    pub fn data_revision(&self) -> u64 {
        self.state.borrow().data_revision
    }

    pub fn dispatch(&self, action: Action) {
        tracing::trace!(?action, "dispatch");
        self.state.send_modify(|state| {
            let next = reduce(state, action);
            *state = next;
        });
    }

    /// Receiver notified after every dispatch.
    pub fn subscribe(&self) -> watch::Receiver<FormState> {
        self.state.subscribe()
    }
}
