//! FormConfig: the engine's view of a form.
//!
//! Built either from a JSON document (via `formwork-interchange`) or
//! programmatically, which is the only way to attach closure `depends`
//! and closure migrations.

use formwork_interchange::{FormDocument, InterchangeError, PageDoc, SubmissionMapping};
use serde_json::Value;

use crate::data::{deep_merge, empty, FormData};
use crate::depends::Depends;
use crate::migration::Migration;

/// Errors building a [`FormConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Interchange(#[from] InterchangeError),
    #[error("duplicate page path '{path}' ({first} and {second})")]
    DuplicatePath {
        path: String,
        first: String,
        second: String,
    },
    #[error("duplicate page key '{0}'")]
    DuplicateKey(String),
    #[error("form version is {version} but {migrations} migrations are declared")]
    VersionMismatch { version: u32, migrations: usize },
}

/// A single page.
#[derive(Debug, Clone)]
pub struct Page {
    pub key: String,
    /// Path relative to the form's URL prefix, without slashes at either end.
    pub path: String,
    pub title: String,
    pub ui_schema: Value,
    pub schema: Value,
    pub depends: Option<Depends>,
    pub initial_data: Option<Value>,
    pub array_path: Option<String>,
    pub show_page_per_item: bool,
}

impl Page {
    pub fn new(key: impl Into<String>, path: impl Into<String>) -> Self {
        Page {
            key: key.into(),
            path: path.into().trim_matches('/').to_string(),
            title: String::new(),
            ui_schema: serde_json::json!({}),
            schema: serde_json::json!({ "type": "object", "properties": {} }),
            depends: None,
            initial_data: None,
            array_path: None,
            show_page_per_item: false,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    pub fn depends(mut self, depends: Depends) -> Self {
        self.depends = Some(depends);
        self
    }

    pub fn initial_data(mut self, data: Value) -> Self {
        self.initial_data = Some(data);
        self
    }

    /// Repeat this page once per element of the array at `array_path`.
    /// `path` must contain `:index`.
    pub fn per_item(mut self, array_path: impl Into<String>) -> Self {
        self.array_path = Some(array_path.into());
        self.show_page_per_item = true;
        self
    }

    /// Top-level form data keys declared by this page's schema.
    pub fn owned_fields(&self) -> Vec<String> {
        if let Some(array_path) = self.array_path.as_deref().filter(|_| self.show_page_per_item) {
            return array_path
                .split('.')
                .next()
                .map(|s| vec![s.to_string()])
                .unwrap_or_default();
        }
        self.schema
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn from_doc(doc: PageDoc) -> Self {
        Page {
            key: doc.key,
            path: doc.path,
            title: doc.title,
            ui_schema: doc.ui_schema,
            schema: doc.schema,
            depends: doc.depends.map(Depends::from),
            initial_data: doc.initial_data,
            array_path: doc.array_path,
            show_page_per_item: doc.show_page_per_item,
        }
    }
}

/// An ordered group of pages.
#[derive(Debug, Clone)]
pub struct Chapter {
    pub key: String,
    pub title: String,
    pub pages: Vec<Page>,
}

impl Chapter {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Chapter {
            key: key.into(),
            title: title.into(),
            pages: Vec::new(),
        }
    }

    pub fn page(mut self, page: Page) -> Self {
        self.pages.push(page);
        self
    }
}

/// Immutable description of a form for one session.
#[derive(Debug, Clone)]
pub struct FormConfig {
    pub form_id: String,
    pub version: u32,
    pub url_prefix: String,
    pub prefill: bool,
    pub chapters: Vec<Chapter>,
    pub migrations: Vec<Migration>,
    pub submission: Option<SubmissionMapping>,
}

impl FormConfig {
    pub fn new(form_id: impl Into<String>, version: u32) -> Self {
        FormConfig {
            form_id: form_id.into(),
            version,
            url_prefix: "/".to_string(),
            prefill: false,
            chapters: Vec::new(),
            migrations: Vec::new(),
            submission: None,
        }
    }

    pub fn chapter(mut self, chapter: Chapter) -> Self {
        self.chapters.push(chapter);
        self
    }

    pub fn migration(mut self, migration: Migration) -> Self {
        self.migrations.push(migration);
        self
    }

    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }

    pub fn with_prefill(mut self, prefill: bool) -> Self {
        self.prefill = prefill;
        self
    }

    /// Parse and validate a JSON form document.
    pub fn from_json(doc: &Value) -> Result<Self, ConfigError> {
        Self::from_document(formwork_interchange::from_document(doc)?)
    }

    /// Convert a parsed document.
    pub fn from_document(doc: FormDocument) -> Result<Self, ConfigError> {
        let config = FormConfig {
            form_id: doc.form_id,
            version: doc.version,
            url_prefix: doc.url_prefix,
            prefill: doc.prefill,
            chapters: doc
                .chapters
                .into_iter()
                .map(|c| Chapter {
                    key: c.key,
                    title: c.title,
                    pages: c.pages.into_iter().map(Page::from_doc).collect(),
                })
                .collect(),
            migrations: doc.migrations.into_iter().map(Migration::Ops).collect(),
            submission: doc.submission,
        };
        config.check()?;
        Ok(config)
    }

    /// Reject duplicate page keys and paths, and a version that the
    /// migration list does not reach.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.migrations.len() != self.version as usize {
            return Err(ConfigError::VersionMismatch {
                version: self.version,
                migrations: self.migrations.len(),
            });
        }
        let mut seen_paths: Vec<(&str, &str)> = Vec::new();
        let mut seen_keys: Vec<&str> = Vec::new();
        for page in self.pages() {
            if seen_keys.contains(&page.key.as_str()) {
                return Err(ConfigError::DuplicateKey(page.key.clone()));
            }
            seen_keys.push(page.key.as_str());
            if let Some((_, first)) = seen_paths.iter().find(|(p, _)| *p == page.path) {
                return Err(ConfigError::DuplicatePath {
                    path: page.path.clone(),
                    first: first.to_string(),
                    second: page.key.clone(),
                });
            }
            seen_paths.push((page.path.as_str(), page.key.as_str()));
        }
        Ok(())
    }

    /// All pages in config order, across chapters.
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.chapters.iter().flat_map(|c| c.pages.iter())
    }

    pub fn page(&self, key: &str) -> Option<&Page> {
        self.pages().find(|p| p.key == key)
    }

    /// Chapter key owning a page.
    pub fn chapter_of(&self, page_key: &str) -> Option<&str> {
        self.chapters
            .iter()
            .find(|c| c.pages.iter().any(|p| p.key == page_key))
            .map(|c| c.key.as_str())
    }

    /// Deep merge of every page's `initialData`, in page order.
    pub fn initial_data(&self) -> FormData {
        let mut data = empty();
        for page in self.pages() {
            if let Some(init) = &page.initial_data {
                deep_merge(&mut data, init);
            }
        }
        data
    }

    /// Join a page path onto the URL prefix: `/` + `a/b` → `/a/b`.
    pub fn route(&self, path: &str) -> String {
        let prefix = self.url_prefix.trim_end_matches('/');
        format!("{}/{}", prefix, path.trim_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_builds_pages_and_migrations() {
        let config = FormConfig::from_json(&json!({
            "formId": "22-1990",
            "version": 1,
            "urlPrefix": "/education/apply/",
            "chapters": {
                "applicant": { "title": "Applicant", "pages": {
                    "name": { "path": "applicant/name", "initialData": { "applicant": { "country": "USA" } } },
                    "contact": { "path": "applicant/contact", "initialData": { "applicant": { "phone": "" } } }
                }}
            },
            "migrations": [[{ "op": "remove", "path": "legacy" }]]
        }))
        .unwrap();
        assert_eq!(config.pages().count(), 2);
        assert_eq!(config.migrations.len(), 1);
        assert_eq!(config.chapter_of("contact"), Some("applicant"));
        assert_eq!(
            config.initial_data(),
            json!({ "applicant": { "country": "USA", "phone": "" } })
        );
        assert_eq!(config.route("applicant/name"), "/education/apply/applicant/name");
    }

    #[test]
    fn duplicate_paths_rejected() {
        let config = FormConfig::new("f", 0).chapter(
            Chapter::new("c", "C")
                .page(Page::new("a", "same"))
                .page(Page::new("b", "/same/")),
        );
        match config.check().unwrap_err() {
            ConfigError::DuplicatePath { first, second, .. } => {
                assert_eq!(first, "a");
                assert_eq!(second, "b");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn version_must_match_migration_count() {
        let config = FormConfig::new("f", 2).migration(Migration::Ops(Vec::new()));
        match config.check().unwrap_err() {
            ConfigError::VersionMismatch {
                version,
                migrations,
            } => {
                assert_eq!(version, 2);
                assert_eq!(migrations, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(config.migration(Migration::Ops(Vec::new())).check().is_ok());
    }

    #[test]
    fn owned_fields_from_schema() {
        let page = Page::new("p", "p").schema(json!({
            "type": "object",
            "properties": { "fullName": {}, "view:note": {} }
        }));
        assert_eq!(page.owned_fields(), vec!["fullName", "view:note"]);
        let item = Page::new("i", "deps/:index").per_item("dependents");
        assert_eq!(item.owned_fields(), vec!["dependents"]);
    }

    #[test]
    fn root_prefix_route() {
        let config = FormConfig::new("f", 0);
        assert_eq!(config.route("/a/b"), "/a/b");
    }
}
