//! Page visibility (`depends`) evaluation.
//!
//! Every kind of `depends` goes through [`Depends::evaluate`]. Evaluation
//! errors are configuration defects: they are returned to the caller
//! rather than being treated as "inactive".

use std::fmt;
use std::sync::Arc;

use formwork_interchange::{CompareOp, ConditionDoc, DependsDoc};
use serde_json::Value;

use crate::data::{get_path, is_truthy, partial_match, FormData};

/// Closure form of `depends`. Receives the form data and, for per-item
/// pages, the item index.
pub type DependsFn = dyn Fn(&FormData, Option<usize>) -> bool + Send + Sync;

/// Errors raised while evaluating a condition tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DependsError {
    #[error("cannot compare '{path}' {op} {expected}: value is {found}")]
    NotANumber {
        path: String,
        op: &'static str,
        expected: f64,
        found: String,
    },
}

/// Page visibility rule.
#[derive(Clone)]
pub enum Depends {
    /// Static partial key/value match on dot-paths.
    Match(serde_json::Map<String, Value>),
    /// Active if any member is active.
    Any(Vec<Depends>),
    /// Declarative condition tree.
    When(Condition),
    /// Rust closure.
    Predicate(Arc<DependsFn>),
}

impl fmt::Debug for Depends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Depends::Match(m) => f.debug_tuple("Match").field(m).finish(),
            Depends::Any(v) => f.debug_tuple("Any").field(v).finish(),
            Depends::When(c) => f.debug_tuple("When").field(c).finish(),
            Depends::Predicate(_) => f.write_str("Predicate(<fn>)"),
        }
    }
}

/// Condition tree node. Mirrors [`ConditionDoc`].
pub type Condition = ConditionDoc;

impl Depends {
    /// Wrap a closure.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&FormData, Option<usize>) -> bool + Send + Sync + 'static,
    {
        Depends::Predicate(Arc::new(f))
    }

    /// Build a static match from `(path, value)` pairs.
    pub fn matching<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Depends::Match(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Evaluate against form data. `index` is the item index for per-item pages.
    pub fn evaluate(&self, data: &FormData, index: Option<usize>) -> Result<bool, DependsError> {
        match self {
            Depends::Match(pairs) => Ok(pairs.iter().all(|(path, expected)| {
                get_path(data, path)
                    .map(|actual| partial_match(actual, expected))
                    .unwrap_or(false)
            })),
            Depends::Any(members) => {
                for member in members {
                    if member.evaluate(data, index)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Depends::When(cond) => eval_condition(cond, data, index),
            Depends::Predicate(f) => Ok(f(data, index)),
        }
    }
}

impl From<DependsDoc> for Depends {
    fn from(doc: DependsDoc) -> Self {
        match doc {
            DependsDoc::Match(m) => Depends::Match(m),
            DependsDoc::Any(v) => Depends::Any(v.into_iter().map(Depends::from).collect()),
            DependsDoc::When(c) => Depends::When(c),
        }
    }
}

/// Resolve a condition path. A `:index` segment is replaced by the item
/// index so per-item pages can test their own element.
fn lookup<'a>(data: &'a FormData, path: &str, index: Option<usize>) -> Option<&'a Value> {
    match index {
        Some(i) if path.contains(":index") => get_path(data, &path.replace(":index", &i.to_string())),
        _ => get_path(data, path),
    }
}

/// Evaluate a condition tree node.
pub fn eval_condition(
    cond: &Condition,
    data: &FormData,
    index: Option<usize>,
) -> Result<bool, DependsError> {
    match cond {
        ConditionDoc::All(nodes) => {
            for node in nodes {
                if !eval_condition(node, data, index)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        ConditionDoc::Any(nodes) => {
            for node in nodes {
                if eval_condition(node, data, index)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        ConditionDoc::Not(inner) => Ok(!eval_condition(inner, data, index)?),
        ConditionDoc::Equals { path, value } => Ok(lookup(data, path, index)
            .map(|actual| partial_match(actual, value) && partial_match(value, actual))
            .unwrap_or(value.is_null())),
        ConditionDoc::Truthy(path) => Ok(lookup(data, path, index).map(is_truthy).unwrap_or(false)),
        ConditionDoc::Present(path) => {
            Ok(lookup(data, path, index).map(|v| !v.is_null()).unwrap_or(false))
        }
        ConditionDoc::OneOf { path, values } => Ok(lookup(data, path, index)
            .map(|actual| values.iter().any(|v| v == actual))
            .unwrap_or(false)),
        ConditionDoc::Compare { path, op, value } => {
            // Missing values are simply "not satisfied"; present non-numbers are defects.
            let Some(actual) = lookup(data, path, index) else {
                return Ok(false);
            };
            if actual.is_null() {
                return Ok(false);
            }
            let n = actual.as_f64().ok_or_else(|| DependsError::NotANumber {
                path: path.clone(),
                op: op.as_str(),
                expected: *value,
                found: actual.to_string(),
            })?;
            Ok(match op {
                CompareOp::Lt => n < *value,
                CompareOp::Le => n <= *value,
                CompareOp::Gt => n > *value,
                CompareOp::Ge => n >= *value,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formwork_interchange::parse_depends;
    use serde_json::json;

    fn parsed(v: serde_json::Value) -> Depends {
        Depends::from(parse_depends(&v).unwrap())
    }

    #[test]
    fn static_match_on_nested_path() {
        let dep = parsed(json!({ "veteran.hasDependents": true }));
        assert!(dep.evaluate(&json!({ "veteran": { "hasDependents": true } }), None).unwrap());
        assert!(!dep.evaluate(&json!({ "veteran": { "hasDependents": false } }), None).unwrap());
        assert!(!dep.evaluate(&json!({}), None).unwrap());
    }

    #[test]
    fn array_form_is_any() {
        let dep = parsed(json!([{ "a": 1 }, { "b": 2 }]));
        assert!(dep.evaluate(&json!({ "b": 2 }), None).unwrap());
        assert!(!dep.evaluate(&json!({ "a": 2, "b": 1 }), None).unwrap());
    }

    #[test]
    fn condition_tree() {
        let dep = parsed(json!({ "when": { "all": [
            { "truthy": "isCaregiver" },
            { "not": { "oneOf": { "path": "relationship", "values": ["self", "other"] } } },
            { "compare": { "path": "age", "op": ">=", "value": 18 } }
        ]}}));
        let data = json!({ "isCaregiver": true, "relationship": "spouse", "age": 40 });
        assert!(dep.evaluate(&data, None).unwrap());
        let minor = json!({ "isCaregiver": true, "relationship": "spouse", "age": 17 });
        assert!(!dep.evaluate(&minor, None).unwrap());
    }

    #[test]
    fn compare_on_non_number_is_an_error() {
        let dep = parsed(json!({ "when": { "compare": { "path": "age", "op": "<", "value": 5 } } }));
        let err = dep.evaluate(&json!({ "age": "old" }), None).unwrap_err();
        assert!(matches!(err, DependsError::NotANumber { ref path, .. } if path == "age"));
        // Absent value is not an error.
        assert!(!dep.evaluate(&json!({}), None).unwrap());
    }

    #[test]
    fn index_placeholder_resolves_item() {
        let dep = parsed(json!({ "when": { "truthy": "dependents.:index.inSchool" } }));
        let data = json!({ "dependents": [{ "inSchool": false }, { "inSchool": true }] });
        assert!(!dep.evaluate(&data, Some(0)).unwrap());
        assert!(dep.evaluate(&data, Some(1)).unwrap());
    }

    #[test]
    fn predicate_receives_index() {
        let dep = Depends::predicate(|_, index| index == Some(2));
        assert!(dep.evaluate(&json!({}), Some(2)).unwrap());
        assert!(!dep.evaluate(&json!({}), None).unwrap());
    }

    #[test]
    fn equals_missing_matches_null_only() {
        let dep = parsed(json!({ "when": { "equals": { "path": "x", "value": null } } }));
        assert!(dep.evaluate(&json!({}), None).unwrap());
        let dep = parsed(json!({ "when": { "equals": { "path": "x", "value": "y" } } }));
        assert!(!dep.evaluate(&json!({}), None).unwrap());
    }
}
