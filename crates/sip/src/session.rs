//! A form session: one config, one store, one client.
//!
//! The session keeps the current route consistent with the page sequence.
//! Every data change re-resolves the current route, and a route that no
//! longer names an active page is replaced by the router's redirect
//! target. After a load the session moves to the saved return URL, routed
//! the same way.

use std::sync::Arc;

use formwork_core::{
    transformer_for, ActivePage, FormConfig, FormData, PageRouter, Resolution, INTRODUCTION_PATH,
};
use serde_json::Value;

use crate::client::{LoadOutcome, PrefillTransformer, SaveOutcome, SipClient};
use crate::error::SipError;
use crate::status::SaveKind;
use crate::store::{Action, FormState, Store};
use crate::transport::SipTransport;

pub struct FormSession {
    config: Arc<FormConfig>,
    client: SipClient,
    prefill_transformer: Option<Box<dyn PrefillTransformer>>,
}

impl FormSession {
    /// A session starting from the config's initial data, at the
    /// introduction route.
    pub fn new(config: Arc<FormConfig>, transport: Arc<dyn SipTransport>) -> Self {
        let store = Store::with_initial_data(config.initial_data());
        store.dispatch(Action::Navigate(config.route(INTRODUCTION_PATH)));
        Self::with_client(config, SipClient::new(transport, store))
    }

    pub fn with_client(config: Arc<FormConfig>, client: SipClient) -> Self {
        FormSession {
            config,
            client,
            prefill_transformer: None,
        }
    }

    pub fn with_prefill_transformer(mut self, transformer: impl PrefillTransformer + 'static) -> Self {
        self.prefill_transformer = Some(Box::new(transformer));
        self
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    pub fn client(&self) -> &SipClient {
        &self.client
    }

    pub fn store(&self) -> &Store {
        self.client.store()
    }

    pub fn state(&self) -> FormState {
        self.store().get_state()
    }

    fn router(&self) -> PageRouter<'_> {
        PageRouter::new(&self.config)
    }

    pub fn active_pages(&self) -> Result<Vec<ActivePage>, SipError> {
        Ok(self.router().active_pages(&self.state().form_data)?)
    }

    pub fn routes(&self) -> Result<Vec<String>, SipError> {
        Ok(self.router().routes(&self.state().form_data)?)
    }

    // ── Navigation ──────────────────────────────────────────────────────────

    /// Where `route` actually leads with the current data.
    pub fn target_of(&self, route: &str) -> Result<String, SipError> {
        let data = self.state().form_data;
        Ok(match self.router().resolve(route, &data)? {
            Resolution::Active { page } => self.config.route(&page.path),
            Resolution::Redirect { to } => to,
            Resolution::Terminal { route } => route,
            Resolution::NotFound => {
                tracing::debug!(route, "unknown route, sending to introduction");
                self.config.route(INTRODUCTION_PATH)
            }
        })
    }

    /// Navigate to `route`, or to where the router redirects it. Returns
    /// the route navigated to.
    pub fn navigate(&self, route: &str) -> Result<String, SipError> {
        let target = self.target_of(route)?;
        self.store().dispatch(Action::Navigate(target.clone()));
        Ok(target)
    }

    pub fn go_next(&self) -> Result<Option<String>, SipError> {
        let state = self.state();
        let current = state.current_route.as_deref().unwrap_or(INTRODUCTION_PATH);
        let next = self.router().next_route(current, &state.form_data)?;
        if let Some(route) = &next {
            self.store().dispatch(Action::Navigate(route.clone()));
        }
        Ok(next)
    }

    pub fn go_back(&self) -> Result<Option<String>, SipError> {
        let state = self.state();
        let current = state.current_route.as_deref().unwrap_or(INTRODUCTION_PATH);
        let prev = self.router().previous_route(current, &state.form_data)?;
        if let Some(route) = &prev {
            self.store().dispatch(Action::Navigate(route.clone()));
        }
        Ok(prev)
    }

    /// Re-resolve the current route after a data change.
    fn reconcile(&self) -> Result<(), SipError> {
        let Some(current) = self.state().current_route else {
            return Ok(());
        };
        let target = self.target_of(&current)?;
        if target != current {
            tracing::debug!(from = %current, to = %target, "current page no longer active");
            self.store().dispatch(Action::Navigate(target));
        }
        Ok(())
    }

    // ── Editing ─────────────────────────────────────────────────────────────

    pub fn set_field(&self, path: &str, value: Value) -> Result<(), SipError> {
        self.store().dispatch(Action::SetField {
            path: path.to_string(),
            value,
        });
        self.reconcile()
    }

    pub fn set_data(&self, data: FormData) -> Result<(), SipError> {
        self.store().dispatch(Action::SetData(data));
        self.reconcile()
    }

    // ── Persistence ─────────────────────────────────────────────────────────

    /// Save the current data with the current route as the return URL.
    pub async fn save(&self, kind: SaveKind) -> Result<SaveOutcome, SipError> {
        let state = self.state();
        let return_url = state
            .current_route
            .unwrap_or_else(|| self.config.route(INTRODUCTION_PATH));
        self.client
            .save(
                kind,
                &self.config.form_id,
                &state.form_data,
                self.config.version,
                &return_url,
                None,
            )
            .await
    }

    /// Start the form: load saved data (or prefill when the config asks for
    /// it) and move to the return URL.
    pub async fn start(&self) -> Result<LoadOutcome, SipError> {
        let outcome = self
            .client
            .load(
                &self.config.form_id,
                &self.config.migrations,
                self.config.prefill,
                self.prefill_transformer.as_deref(),
            )
            .await?;
        self.resume_at_return_url()?;
        Ok(outcome)
    }

    /// Discard the saved form and start again from prefill.
    pub async fn start_over(&self) -> Result<LoadOutcome, SipError> {
        let outcome = self
            .client
            .remove(
                &self.config.form_id,
                &self.config.migrations,
                self.prefill_transformer.as_deref(),
            )
            .await?;
        self.navigate(&self.config.route(INTRODUCTION_PATH))?;
        Ok(outcome)
    }

    fn resume_at_return_url(&self) -> Result<(), SipError> {
        match self.state().return_url {
            Some(url) => {
                let landed = self.navigate(&url)?;
                tracing::info!(return_url = %url, route = %landed, "resuming form");
            }
            None => self.reconcile()?,
        }
        Ok(())
    }

    /// The submission body for the current data.
    pub fn submission_payload(&self) -> Result<String, SipError> {
        let data = self.state().form_data;
        Ok(transformer_for(&self.config).transform(&self.config, &data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::LoadStatus;
    use crate::transport::StoreTransport;
    use formwork_core::{Chapter, Depends, Page};
    use formwork_storage::{InProgressApi, MemoryStore};
    use serde_json::json;

    fn config() -> Arc<FormConfig> {
        Arc::new(
            FormConfig::new("10-10CG", 0)
                .url_prefix("/caregivers/")
                .chapter(
                    Chapter::new("veteran", "Veteran")
                        .page(Page::new("vetInfo", "veteran/information").initial_data(json!({
                            "hasPrimaryCaregiver": false
                        })))
                        .page(
                            Page::new("primary", "primary/information")
                                .depends(Depends::matching([("hasPrimaryCaregiver", json!(true))])),
                        )
                        .page(Page::new("review", "veteran/contact")),
                ),
        )
    }

    fn session() -> FormSession {
        let api = InProgressApi::new(Arc::new(MemoryStore::new()));
        FormSession::new(config(), Arc::new(StoreTransport::new(api, "user-1")))
    }

    #[test]
    fn starts_at_introduction_with_initial_data() {
        let s = session();
        let state = s.state();
        assert_eq!(state.current_route.as_deref(), Some("/caregivers/introduction"));
        assert_eq!(state.form_data, json!({ "hasPrimaryCaregiver": false }));
    }

    #[test]
    fn excluded_current_page_redirects_to_nearest_active() {
        let s = session();
        s.set_field("hasPrimaryCaregiver", json!(true)).unwrap();
        assert_eq!(
            s.navigate("/caregivers/primary/information").unwrap(),
            "/caregivers/primary/information"
        );

        s.set_field("hasPrimaryCaregiver", json!(false)).unwrap();
        assert_eq!(
            s.state().current_route.as_deref(),
            Some("/caregivers/veteran/information")
        );
    }

    #[test]
    fn next_and_back_skip_inactive_pages() {
        let s = session();
        assert_eq!(
            s.go_next().unwrap().as_deref(),
            Some("/caregivers/veteran/information")
        );
        assert_eq!(
            s.go_next().unwrap().as_deref(),
            Some("/caregivers/veteran/contact")
        );
        assert_eq!(
            s.go_next().unwrap().as_deref(),
            Some("/caregivers/review-and-submit")
        );
        assert_eq!(s.go_next().unwrap(), None);
        assert_eq!(
            s.go_back().unwrap().as_deref(),
            Some("/caregivers/veteran/contact")
        );
    }

    #[test]
    fn unknown_route_goes_to_introduction() {
        let s = session();
        assert_eq!(
            s.navigate("/caregivers/nowhere").unwrap(),
            "/caregivers/introduction"
        );
    }

    #[tokio::test]
    async fn resume_routes_stale_return_url() {
        let store = Arc::new(MemoryStore::new());
        let first = FormSession::new(
            config(),
            Arc::new(StoreTransport::from_store(store.clone(), "user-1")),
        );
        first.set_field("hasPrimaryCaregiver", json!(true)).unwrap();
        first.navigate("/caregivers/primary/information").unwrap();
        first.save(SaveKind::SaveAndRedirect).await.unwrap();

        // Saved data says the page is active: resume lands on it.
        let second = FormSession::new(
            config(),
            Arc::new(StoreTransport::from_store(store.clone(), "user-1")),
        );
        second.start().await.unwrap();
        assert_eq!(
            second.state().current_route.as_deref(),
            Some("/caregivers/primary/information")
        );

        // Same return URL, but the page is now excluded.
        second
            .client()
            .save(
                SaveKind::Auto,
                "10-10CG",
                &json!({ "hasPrimaryCaregiver": false }),
                0,
                "/caregivers/primary/information",
                None,
            )
            .await
            .unwrap();
        let third = FormSession::new(
            config(),
            Arc::new(StoreTransport::from_store(store, "user-1")),
        );
        third.start().await.unwrap();
        assert_eq!(
            third.state().current_route.as_deref(),
            Some("/caregivers/veteran/information")
        );
    }

    #[tokio::test]
    async fn save_then_load_round_trips_at_current_version() {
        let config = Arc::new(
            FormConfig::from_json(&json!({
                "formId": "22-1990",
                "version": 2,
                "urlPrefix": "/education/",
                "chapters": { "c": { "pages": { "info": { "path": "info" } } } },
                "migrations": [
                    [{ "op": "rename", "from": "name", "to": "fullName" }],
                    [{ "op": "remove", "path": "legacy" }]
                ]
            }))
            .unwrap(),
        );
        let store = Arc::new(MemoryStore::new());

        let first = FormSession::new(
            config.clone(),
            Arc::new(StoreTransport::from_store(store.clone(), "user-1")),
        );
        first
            .set_data(json!({ "name": "kept", "legacy": "kept too" }))
            .unwrap();
        first.navigate("/education/info").unwrap();
        first.save(SaveKind::Auto).await.unwrap();

        let second = FormSession::new(
            config,
            Arc::new(StoreTransport::from_store(store, "user-1")),
        );
        second.start().await.unwrap();
        let state = second.state();
        assert_eq!(state.form_data, json!({ "name": "kept", "legacy": "kept too" }));
        assert_eq!(state.version, 2);
        assert_eq!(state.load_status, LoadStatus::Success);
        assert_eq!(state.current_route.as_deref(), Some("/education/info"));
    }

    #[test]
    fn submission_payload_excludes_inactive_pages() {
        let config = Arc::new(
            FormConfig::new("f", 0).chapter(
                Chapter::new("c", "C")
                    .page(Page::new("a", "a").schema(json!({
                        "type": "object", "properties": { "married": {} }
                    })))
                    .page(
                        Page::new("b", "b")
                            .depends(Depends::matching([("married", json!(true))]))
                            .schema(json!({
                                "type": "object", "properties": { "spouse": {} }
                            })),
                    ),
            ),
        );
        let api = InProgressApi::new(Arc::new(MemoryStore::new()));
        let s = FormSession::new(config, Arc::new(StoreTransport::new(api, "u")));
        s.set_data(json!({ "married": false, "spouse": "stale" })).unwrap();
        let payload: Value = serde_json::from_str(&s.submission_payload().unwrap()).unwrap();
        assert_eq!(payload, json!({ "married": false }));
        assert_eq!(s.state().form_data["spouse"], "stale");
    }
}
