//! Submission transformers.
//!
//! Every transformer starts from [`prepare_submission_data`], which keeps
//! only data reachable through the active page sequence and strips
//! view-only fields. [`MappedTransformer`] then reshapes the result into
//! the external API's attribute structure.

use formwork_interchange::SubmissionMapping;
use serde_json::{Map, Value};

use crate::config::FormConfig;
use crate::data::{get_path, set_path, FormData};
use crate::depends::DependsError;
use crate::router::PageRouter;

/// Prefix marking UI-only fields.
pub const VIEW_FIELD_PREFIX: &str = "view:";

/// Errors raised while building a submission payload.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("page visibility evaluation failed: {0}")]
    Depends(#[from] DependsError),
    #[error("cannot write mapped field to '{0}'")]
    InvalidTarget(String),
    #[error("form data must be a JSON object")]
    NotAnObject,
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Turns completed form data into the wire body of a submission request.
pub trait SubmissionTransformer: Send + Sync {
    fn transform(&self, config: &FormConfig, data: &FormData) -> Result<String, TransformError>;
}

/// Remove data owned only by inactive pages, then flatten view fields and
/// drop empty objects.
pub fn prepare_submission_data(
    config: &FormConfig,
    data: &FormData,
) -> Result<FormData, TransformError> {
    let Value::Object(map) = data else {
        return Err(TransformError::NotAnObject);
    };
    let router = PageRouter::new(config);
    let active = router.active_pages(data)?;

    let mut active_fields: Vec<String> = Vec::new();
    for page in config.pages() {
        if active.iter().any(|a| a.page_key == page.key) {
            active_fields.extend(page.owned_fields());
        }
    }

    let mut filtered = map.clone();
    for key in router.inactive_page_keys(data)? {
        let Some(page) = config.page(&key) else {
            continue;
        };
        for field in page.owned_fields() {
            if !active_fields.contains(&field) {
                filtered.remove(&field);
            }
        }
    }

    let mut out = filter_view_fields(Value::Object(filtered));
    remove_empty_objects(&mut out);
    Ok(out)
}

/// Flatten `view:` objects into their parent and drop `view:` scalars.
pub fn filter_view_fields(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, child) in map {
                let child = filter_view_fields(child);
                if key.starts_with(VIEW_FIELD_PREFIX) {
                    if let Value::Object(inner) = child {
                        for (k, v) in inner {
                            out.insert(k, v);
                        }
                    }
                } else {
                    out.insert(key, child);
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(filter_view_fields).collect()),
        other => other,
    }
}

/// Recursively remove object members whose value is an empty object.
/// The root is kept even when it ends up empty.
pub fn remove_empty_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                remove_empty_objects(child);
            }
            map.retain(|_, v| !matches!(v, Value::Object(m) if m.is_empty()));
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                remove_empty_objects(item);
            }
        }
        _ => {}
    }
}

/// Wrap `payload` under `root`, as a JSON string when `stringify` is set.
fn wrap_root(payload: Value, root: Option<&str>, stringify: bool) -> Result<Value, TransformError> {
    let Some(root) = root else {
        return Ok(payload);
    };
    let inner = if stringify {
        Value::String(serde_json::to_string(&payload)?)
    } else {
        payload
    };
    let mut wrapper = Map::new();
    wrapper.insert(root.to_string(), inner);
    Ok(Value::Object(wrapper))
}

/// Serializes the prepared data as bare JSON, or as
/// `{"<root>": "<json string>"}` when built with a root.
#[derive(Debug, Clone, Default)]
pub struct DefaultTransformer {
    root: Option<String>,
}

impl DefaultTransformer {
    pub fn with_root(root: impl Into<String>) -> Self {
        DefaultTransformer {
            root: Some(root.into()),
        }
    }
}

impl SubmissionTransformer for DefaultTransformer {
    fn transform(&self, config: &FormConfig, data: &FormData) -> Result<String, TransformError> {
        let prepared = prepare_submission_data(config, data)?;
        let payload = wrap_root(prepared, self.root.as_deref(), true)?;
        Ok(serde_json::to_string(&payload)?)
    }
}

/// Reshapes prepared data through a field mapping.
#[derive(Debug, Clone)]
pub struct MappedTransformer {
    mapping: SubmissionMapping,
}

impl MappedTransformer {
    pub fn new(mapping: SubmissionMapping) -> Self {
        MappedTransformer { mapping }
    }

    fn reshape(&self, prepared: &FormData) -> Result<Value, TransformError> {
        let mut out = Value::Object(Map::new());

        if self.mapping.passthrough {
            let consumed: Vec<&str> = self
                .mapping
                .fields
                .iter()
                .filter_map(|f| f.from.split('.').next())
                .collect();
            if let Value::Object(map) = prepared {
                for (key, value) in map {
                    if !consumed.contains(&key.as_str()) {
                        set_path(&mut out, key, value.clone());
                    }
                }
            }
        }

        for field in &self.mapping.fields {
            let value = get_path(prepared, &field.from)
                .filter(|v| !v.is_null())
                .cloned()
                .or_else(|| field.default.clone());
            if let Some(value) = value {
                if !set_path(&mut out, &field.to, value) {
                    return Err(TransformError::InvalidTarget(field.to.clone()));
                }
            }
        }

        wrap_root(out, self.mapping.root.as_deref(), self.mapping.stringify)
    }
}

impl SubmissionTransformer for MappedTransformer {
    fn transform(&self, config: &FormConfig, data: &FormData) -> Result<String, TransformError> {
        let prepared = prepare_submission_data(config, data)?;
        let payload = self.reshape(&prepared)?;
        Ok(serde_json::to_string(&payload)?)
    }
}

/// The transformer declared by a config: mapped when the config carries a
/// submission mapping, default otherwise.
pub fn transformer_for(config: &FormConfig) -> Box<dyn SubmissionTransformer> {
    match &config.submission {
        Some(mapping) => Box::new(MappedTransformer::new(mapping.clone())),
        None => Box::new(DefaultTransformer::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Chapter, Page};
    use crate::depends::Depends;
    use formwork_interchange::FieldMapping;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn form() -> FormConfig {
        FormConfig::new("21-0966", 0).chapter(
            Chapter::new("c", "C")
                .page(Page::new("who", "who").schema(json!({
                    "type": "object",
                    "properties": { "claimant": {}, "view:intro": {} }
                })))
                .page(
                    Page::new("spouse", "spouse")
                        .depends(Depends::matching([("married", json!(true))]))
                        .schema(json!({
                            "type": "object",
                            "properties": { "spouse": {}, "married": {} }
                        })),
                )
                .page(Page::new("marital", "marital").schema(json!({
                    "type": "object",
                    "properties": { "married": {} }
                }))),
        )
    }

    #[test]
    fn inactive_page_data_excluded_but_shared_fields_kept() {
        let data = json!({
            "claimant": { "name": "A" },
            "married": false,
            "spouse": { "name": "stale" }
        });
        let out = prepare_submission_data(&form(), &data).unwrap();
        assert_eq!(out, json!({ "claimant": { "name": "A" }, "married": false }));
    }

    #[test]
    fn stale_data_is_not_deleted_from_input() {
        let data = json!({ "married": false, "spouse": { "name": "stale" } });
        let _ = prepare_submission_data(&form(), &data).unwrap();
        assert_eq!(data["spouse"]["name"], "stale");
    }

    #[test]
    fn view_fields_flattened_and_dropped() {
        let input = json!({
            "view:intro": true,
            "claimant": {
                "view:name": { "first": "A", "last": "B" },
                "view:confirm": "yes",
                "address": {}
            }
        });
        let mut out = filter_view_fields(input);
        remove_empty_objects(&mut out);
        assert_eq!(out, json!({ "claimant": { "first": "A", "last": "B" } }));
    }

    #[test]
    fn default_transformer_serializes_prepared_data() {
        let data = json!({ "claimant": { "name": "A" }, "married": true, "spouse": { "name": "S" } });
        let body = DefaultTransformer::default().transform(&form(), &data).unwrap();
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed, data);
    }

    #[test]
    fn mapped_transformer_reshapes_and_wraps() {
        let mapping = SubmissionMapping {
            root: Some("claim".to_string()),
            stringify: false,
            fields: vec![
                FieldMapping {
                    from: "claimant.name".to_string(),
                    to: "attributes.claimantFullName".to_string(),
                    default: None,
                },
                FieldMapping {
                    from: "spouse.name".to_string(),
                    to: "attributes.spouseName".to_string(),
                    default: None,
                },
                FieldMapping {
                    from: "claimant.phone".to_string(),
                    to: "attributes.phone".to_string(),
                    default: Some(json!("unknown")),
                },
            ],
            passthrough: true,
        };
        let data = json!({ "claimant": { "name": "A" }, "married": false, "spouse": { "name": "S" } });
        let body = MappedTransformer::new(mapping).transform(&form(), &data).unwrap();
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            parsed,
            json!({ "claim": {
                "married": false,
                "attributes": { "claimantFullName": "A", "phone": "unknown" }
            }})
        );
    }

    #[test]
    fn stringified_root() {
        let config = FormConfig {
            submission: Some(SubmissionMapping {
                root: Some("form".to_string()),
                stringify: true,
                fields: vec![],
                passthrough: true,
            }),
            ..form()
        };
        let body = transformer_for(&config)
            .transform(&config, &json!({ "married": false }))
            .unwrap();
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed, json!({ "form": "{\"married\":false}" }));
    }

    #[test]
    fn default_transformer_wraps_under_root() {
        let body = DefaultTransformer::with_root("form")
            .transform(&form(), &json!({ "married": false, "view:note": "hidden" }))
            .unwrap();
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed, json!({ "form": "{\"married\":false}" }));
    }

    #[test]
    fn non_object_data_rejected() {
        assert!(matches!(
            DefaultTransformer::default().transform(&form(), &json!([1])),
            Err(TransformError::NotAnObject)
        ));
    }
}
