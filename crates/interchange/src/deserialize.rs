//! Deserialization from form config JSON documents into typed structs.
//!
//! The main entry point is [`from_document`], which takes a
//! `&serde_json::Value` and produces a [`FormDocument`]. Chapter and page
//! order follows JSON key order, so the workspace builds `serde_json` with
//! `preserve_order`.

use crate::types::*;
use std::fmt;

/// Errors during form document deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterchangeError {
    /// The document is missing a required top-level field.
    MissingField { field: String },
    /// A page declaration is malformed.
    PageError {
        chapter: String,
        page: String,
        message: String,
    },
    /// A `depends` or condition expression is malformed.
    InvalidDepends(String),
    /// A declarative migration is malformed.
    InvalidMigration { index: usize, message: String },
    /// The document structure is invalid.
    InvalidDocument(String),
}

impl fmt::Display for InterchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterchangeError::MissingField { field } => {
                write!(f, "form document missing required field: '{}'", field)
            }
            InterchangeError::PageError {
                chapter,
                page,
                message,
            } => write!(f, "page '{}.{}': {}", chapter, page, message),
            InterchangeError::InvalidDepends(msg) => write!(f, "invalid depends: {}", msg),
            InterchangeError::InvalidMigration { index, message } => {
                write!(f, "migration {}: {}", index, message)
            }
            InterchangeError::InvalidDocument(msg) => write!(f, "invalid form document: {}", msg),
        }
    }
}

impl std::error::Error for InterchangeError {}

/// Deserialize a form config document.
pub fn from_document(doc: &serde_json::Value) -> Result<FormDocument, InterchangeError> {
    if !doc.is_object() {
        return Err(InterchangeError::InvalidDocument(
            "document must be a JSON object".to_string(),
        ));
    }

    let form_id = doc
        .get("formId")
        .and_then(|v| v.as_str())
        .ok_or_else(|| InterchangeError::MissingField {
            field: "formId".to_string(),
        })?
        .to_string();

    let version = match doc.get("version") {
        None => 0,
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                InterchangeError::InvalidDocument("'version' must be a small integer".to_string())
            })?,
    };

    let url_prefix = doc
        .get("urlPrefix")
        .and_then(|v| v.as_str())
        .unwrap_or("/")
        .to_string();

    let prefill = doc
        .get("prefill")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let chapters_obj = doc
        .get("chapters")
        .and_then(|c| c.as_object())
        .ok_or_else(|| InterchangeError::MissingField {
            field: "chapters".to_string(),
        })?;

    let mut chapters = Vec::with_capacity(chapters_obj.len());
    for (key, chapter) in chapters_obj {
        chapters.push(parse_chapter(key, chapter)?);
    }

    let migrations = match doc.get("migrations") {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(serde_json::Value::Array(steps)) => steps
            .iter()
            .enumerate()
            .map(|(index, step)| parse_migration_step(index, step))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(InterchangeError::InvalidDocument(
                "'migrations' must be an array".to_string(),
            ))
        }
    };

    if migrations.len() != version as usize {
        return Err(InterchangeError::InvalidDocument(format!(
            "{} migrations declared but form version is {}",
            migrations.len(),
            version
        )));
    }

    let submission = match doc.get("submission") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => Some(
            serde_json::from_value::<SubmissionMapping>(v.clone())
                .map_err(|e| InterchangeError::InvalidDocument(format!("submission: {}", e)))?,
        ),
    };

    Ok(FormDocument {
        form_id,
        version,
        url_prefix,
        prefill,
        chapters,
        migrations,
        submission,
    })
}

// ── Parsing helpers ─────────────────────────────────────────────────

fn parse_chapter(key: &str, obj: &serde_json::Value) -> Result<ChapterDoc, InterchangeError> {
    let title = obj
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let pages_obj = obj
        .get("pages")
        .and_then(|p| p.as_object())
        .ok_or_else(|| {
            InterchangeError::InvalidDocument(format!("chapter '{}' missing 'pages' object", key))
        })?;

    let mut pages = Vec::with_capacity(pages_obj.len());
    for (page_key, page) in pages_obj {
        pages.push(parse_page(key, page_key, page)?);
    }

    Ok(ChapterDoc {
        key: key.to_string(),
        title,
        pages,
    })
}

fn parse_page(
    chapter: &str,
    key: &str,
    obj: &serde_json::Value,
) -> Result<PageDoc, InterchangeError> {
    let page_err = |message: String| InterchangeError::PageError {
        chapter: chapter.to_string(),
        page: key.to_string(),
        message,
    };

    let path = obj
        .get("path")
        .and_then(|v| v.as_str())
        .ok_or_else(|| page_err("missing 'path' field".to_string()))?
        .trim_matches('/')
        .to_string();

    let title = obj
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let schema = obj
        .get("schema")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({ "type": "object", "properties": {} }));
    let ui_schema = obj
        .get("uiSchema")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));

    let depends = match obj.get("depends") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => Some(parse_depends(v).map_err(|e| page_err(e.to_string()))?),
    };

    let initial_data = obj.get("initialData").cloned();
    let array_path = obj
        .get("arrayPath")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let show_page_per_item = obj
        .get("showPagePerItem")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    if show_page_per_item {
        if array_path.is_none() {
            return Err(page_err(
                "'showPagePerItem' requires 'arrayPath'".to_string(),
            ));
        }
        if !path.contains(":index") {
            return Err(page_err(
                "per-item page path must contain ':index'".to_string(),
            ));
        }
    }

    Ok(PageDoc {
        key: key.to_string(),
        path,
        title,
        ui_schema,
        schema,
        depends,
        initial_data,
        array_path,
        show_page_per_item,
    })
}

/// Parse a `depends` declaration.
///
/// - array → [`DependsDoc::Any`]
/// - `{"when": <condition>}` → [`DependsDoc::When`]
/// - `{"match": {...}}` or any other object → [`DependsDoc::Match`]
pub fn parse_depends(value: &serde_json::Value) -> Result<DependsDoc, InterchangeError> {
    match value {
        serde_json::Value::Array(items) => Ok(DependsDoc::Any(
            items.iter().map(parse_depends).collect::<Result<_, _>>()?,
        )),
        serde_json::Value::Object(obj) => {
            if obj.len() == 1 {
                if let Some(cond) = obj.get("when") {
                    return Ok(DependsDoc::When(parse_condition(cond)?));
                }
                if let Some(m) = obj.get("match") {
                    return m.as_object().map(|m| DependsDoc::Match(m.clone())).ok_or_else(
                        || InterchangeError::InvalidDepends("'match' must be an object".to_string()),
                    );
                }
            }
            Ok(DependsDoc::Match(obj.clone()))
        }
        other => Err(InterchangeError::InvalidDepends(format!(
            "expected object or array, got {}",
            other
        ))),
    }
}

fn condition_path(obj: &serde_json::Value, node: &str) -> Result<String, InterchangeError> {
    obj.get("path")
        .and_then(|p| p.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| InterchangeError::InvalidDepends(format!("'{}' requires a 'path'", node)))
}

fn condition_list(value: &serde_json::Value, node: &str) -> Result<Vec<ConditionDoc>, InterchangeError> {
    value
        .as_array()
        .ok_or_else(|| InterchangeError::InvalidDepends(format!("'{}' must be an array", node)))?
        .iter()
        .map(parse_condition)
        .collect()
}

/// Parse a condition tree node. Each node is a single-key object.
pub fn parse_condition(value: &serde_json::Value) -> Result<ConditionDoc, InterchangeError> {
    let obj = value
        .as_object()
        .filter(|o| o.len() == 1)
        .ok_or_else(|| {
            InterchangeError::InvalidDepends(format!(
                "condition must be a single-key object, got {}",
                value
            ))
        })?;

    let (node, body) = match obj.iter().next() {
        Some(entry) => entry,
        None => {
            return Err(InterchangeError::InvalidDepends(
                "empty condition".to_string(),
            ))
        }
    };

    match node.as_str() {
        "all" => Ok(ConditionDoc::All(condition_list(body, node)?)),
        "any" => Ok(ConditionDoc::Any(condition_list(body, node)?)),
        "not" => Ok(ConditionDoc::Not(Box::new(parse_condition(body)?))),
        "truthy" => body
            .as_str()
            .map(|p| ConditionDoc::Truthy(p.to_string()))
            .ok_or_else(|| InterchangeError::InvalidDepends("'truthy' takes a path".to_string())),
        "present" => body
            .as_str()
            .map(|p| ConditionDoc::Present(p.to_string()))
            .ok_or_else(|| InterchangeError::InvalidDepends("'present' takes a path".to_string())),
        "equals" => Ok(ConditionDoc::Equals {
            path: condition_path(body, node)?,
            value: body.get("value").cloned().unwrap_or(serde_json::Value::Null),
        }),
        "oneOf" => {
            let values = body
                .get("values")
                .and_then(|v| v.as_array())
                .cloned()
                .ok_or_else(|| {
                    InterchangeError::InvalidDepends("'oneOf' requires 'values' array".to_string())
                })?;
            Ok(ConditionDoc::OneOf {
                path: condition_path(body, node)?,
                values,
            })
        }
        "compare" => {
            let op = body
                .get("op")
                .and_then(|o| o.as_str())
                .and_then(CompareOp::parse)
                .ok_or_else(|| {
                    InterchangeError::InvalidDepends(
                        "'compare' requires 'op' of <, <=, >, >=".to_string(),
                    )
                })?;
            let value = body.get("value").and_then(|v| v.as_f64()).ok_or_else(|| {
                InterchangeError::InvalidDepends("'compare' requires a numeric 'value'".to_string())
            })?;
            Ok(ConditionDoc::Compare {
                path: condition_path(body, node)?,
                op,
                value,
            })
        }
        other => Err(InterchangeError::InvalidDepends(format!(
            "unknown condition '{}'",
            other
        ))),
    }
}

fn parse_migration_step(
    index: usize,
    step: &serde_json::Value,
) -> Result<Vec<MigrationOp>, InterchangeError> {
    let ops = step.as_array().ok_or_else(|| InterchangeError::InvalidMigration {
        index,
        message: "each migration must be an array of ops".to_string(),
    })?;
    ops.iter()
        .map(|op| {
            serde_json::from_value::<MigrationOp>(op.clone()).map_err(|e| {
                InterchangeError::InvalidMigration {
                    index,
                    message: e.to_string(),
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_document(chapters: serde_json::Value) -> serde_json::Value {
        json!({
            "formId": "10-10CG",
            "version": 0,
            "chapters": chapters
        })
    }

    #[test]
    fn test_chapter_and_page_order_preserved() {
        let doc = make_document(json!({
            "zeta": { "title": "Z", "pages": {
                "second": { "path": "z/second" },
                "first": { "path": "z/first" }
            }},
            "alpha": { "title": "A", "pages": {
                "only": { "path": "/a/only/" }
            }}
        }));
        let form = from_document(&doc).unwrap();
        let keys: Vec<_> = form.chapters.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        let pages: Vec<_> = form.chapters[0].pages.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(pages, vec!["second", "first"]);
        assert_eq!(form.chapters[1].pages[0].path, "a/only");
        assert_eq!(form.url_prefix, "/");
    }

    #[test]
    fn test_missing_form_id() {
        let doc = json!({ "chapters": {} });
        match from_document(&doc).unwrap_err() {
            InterchangeError::MissingField { field } => assert_eq!(field, "formId"),
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_page_missing_path() {
        let doc = make_document(json!({
            "c": { "pages": { "p": { "title": "no path" } } }
        }));
        let err = from_document(&doc).unwrap_err();
        assert_eq!(err.to_string(), "page 'c.p': missing 'path' field");
    }

    #[test]
    fn test_depends_forms() {
        assert_eq!(
            parse_depends(&json!({ "hasDependents": true })).unwrap(),
            DependsDoc::Match(json!({ "hasDependents": true }).as_object().unwrap().clone())
        );
        assert!(matches!(
            parse_depends(&json!([{ "a": 1 }, { "b": 2 }])).unwrap(),
            DependsDoc::Any(ref v) if v.len() == 2
        ));
        let when = parse_depends(&json!({
            "when": { "all": [
                { "truthy": "veteran.isCaregiver" },
                { "compare": { "path": "age", "op": ">=", "value": 18 } }
            ]}
        }))
        .unwrap();
        match when {
            DependsDoc::When(ConditionDoc::All(nodes)) => {
                assert_eq!(nodes[0], ConditionDoc::Truthy("veteran.isCaregiver".to_string()));
                assert_eq!(
                    nodes[1],
                    ConditionDoc::Compare {
                        path: "age".to_string(),
                        op: CompareOp::Ge,
                        value: 18.0
                    }
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_condition_rejected() {
        let err = parse_depends(&json!({ "when": { "xor": [] } })).unwrap_err();
        assert_eq!(err.to_string(), "invalid depends: unknown condition 'xor'");
    }

    #[test]
    fn test_migrations_parsed_in_order() {
        let doc = json!({
            "formId": "f",
            "version": 2,
            "chapters": {},
            "migrations": [
                [{ "op": "rename", "from": "a", "to": "b" }],
                [{ "op": "setDefault", "path": "c.d", "value": 1 }, { "op": "remove", "path": "x" }]
            ]
        });
        let form = from_document(&doc).unwrap();
        assert_eq!(form.migrations.len(), 2);
        assert_eq!(
            form.migrations[0][0],
            MigrationOp::Rename {
                from: "a".to_string(),
                to: "b".to_string()
            }
        );
        assert_eq!(form.migrations[1].len(), 2);
    }

    #[test]
    fn test_more_migrations_than_version_rejected() {
        let doc = json!({
            "formId": "f",
            "version": 0,
            "chapters": {},
            "migrations": [[]]
        });
        assert!(matches!(
            from_document(&doc),
            Err(InterchangeError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_version_without_migrations_rejected() {
        let doc = json!({
            "formId": "f",
            "version": 1,
            "chapters": {}
        });
        let err = from_document(&doc).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid form document: 0 migrations declared but form version is 1"
        );
    }

    #[test]
    fn test_per_item_page_requires_index_placeholder() {
        let doc = make_document(json!({
            "c": { "pages": { "dep": {
                "path": "dependents",
                "arrayPath": "dependents",
                "showPagePerItem": true
            }}}
        }));
        assert!(matches!(
            from_document(&doc),
            Err(InterchangeError::PageError { .. })
        ));
    }

    #[test]
    fn test_submission_mapping() {
        let doc = json!({
            "formId": "f",
            "chapters": {},
            "submission": {
                "root": "form",
                "stringify": true,
                "fields": [{ "from": "veteran.fullName", "to": "veteranFullName" }]
            }
        });
        let form = from_document(&doc).unwrap();
        let mapping = form.submission.unwrap();
        assert_eq!(mapping.root.as_deref(), Some("form"));
        assert!(mapping.stringify);
        assert!(!mapping.passthrough);
        assert_eq!(mapping.fields[0].to, "veteranFullName");
    }
}
