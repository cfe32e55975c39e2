//! JSON Schema validation of active pages.
//!
//! Each active page's `schema` is compiled and checked against the form
//! data. Per-item pages validate their own array element against the
//! `items` schema of the array property when the page schema declares one.

use serde::Serialize;
use serde_json::Value;

use crate::config::FormConfig;
use crate::data::{get_path, FormData};
use crate::depends::DependsError;
use crate::router::PageRouter;

/// Errors that prevent validation from running at all.
#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    #[error("page '{page}' has an invalid schema: {message}")]
    InvalidSchema { page: String, message: String },
    #[error(transparent)]
    Depends(#[from] DependsError),
}

/// Validation failures for one concrete page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageErrors {
    pub page_key: String,
    pub path: String,
    pub errors: Vec<String>,
}

/// Validate every active page. An empty result means the data is valid.
pub fn validate_active_pages(
    config: &FormConfig,
    data: &FormData,
) -> Result<Vec<PageErrors>, ValidateError> {
    let router = PageRouter::new(config);
    let mut report = Vec::new();

    for active in router.active_pages(data)? {
        let Some(page) = config.page(&active.page_key) else {
            continue;
        };

        let (schema, instance) = match (active.index, page.array_path.as_deref()) {
            (Some(index), Some(array_path)) => {
                let last = array_path.rsplit('.').next().unwrap_or(array_path);
                let item_schema = page
                    .schema
                    .get("properties")
                    .and_then(|p| p.get(last))
                    .and_then(|a| a.get("items"));
                match item_schema {
                    Some(items) => (
                        items,
                        get_path(data, &format!("{}.{}", array_path, index))
                            .cloned()
                            .unwrap_or(Value::Null),
                    ),
                    None => (&page.schema, data.clone()),
                }
            }
            _ => (&page.schema, data.clone()),
        };

        let validator =
            jsonschema::validator_for(schema).map_err(|e| ValidateError::InvalidSchema {
                page: page.key.clone(),
                message: e.to_string(),
            })?;
        let errors: Vec<String> = validator.iter_errors(&instance).map(|e| e.to_string()).collect();
        if !errors.is_empty() {
            report.push(PageErrors {
                page_key: active.page_key.clone(),
                path: active.path.clone(),
                errors,
            });
        }
    }

    Ok(report)
}
