//! Typed structs representing the form config document.
//!
//! Schemas and UI schemas are kept as `serde_json::Value`: the engine never
//! interprets UI schemas, and page schemas are only read for their
//! top-level `properties` and handed to the validator as-is.

use serde::{Deserialize, Serialize};

/// Top-level form config document.
#[derive(Debug, Clone)]
pub struct FormDocument {
    /// Form identifier used in the in-progress-forms API path.
    pub form_id: String,
    /// Current data version. Saved data at a lower version is migrated.
    pub version: u32,
    /// Prefix joined to every page path when building routes.
    pub url_prefix: String,
    /// Whether the form asks the API for prefill data when nothing is saved.
    pub prefill: bool,
    /// Chapters in document order.
    pub chapters: Vec<ChapterDoc>,
    /// Declarative migrations; index `i` upgrades version `i` to `i + 1`.
    pub migrations: Vec<Vec<MigrationOp>>,
    /// Optional submission field mapping.
    pub submission: Option<SubmissionMapping>,
}

/// A chapter: an ordered group of pages.
#[derive(Debug, Clone)]
pub struct ChapterDoc {
    pub key: String,
    pub title: String,
    pub pages: Vec<PageDoc>,
}

/// A single page declaration.
#[derive(Debug, Clone)]
pub struct PageDoc {
    pub key: String,
    pub path: String,
    pub title: String,
    pub ui_schema: serde_json::Value,
    pub schema: serde_json::Value,
    pub depends: Option<DependsDoc>,
    pub initial_data: Option<serde_json::Value>,
    /// Dot-path of the array this page iterates over.
    pub array_path: Option<String>,
    /// When true together with `array_path`, the page repeats once per item.
    pub show_page_per_item: bool,
}

// ── Depends ─────────────────────────────────────────────────────────

/// Declarative page visibility, as written in the document.
#[derive(Debug, Clone, PartialEq)]
pub enum DependsDoc {
    /// Partial key/value match. Keys are dot-paths into the form data.
    Match(serde_json::Map<String, serde_json::Value>),
    /// Active if any member is active (JSON array form).
    Any(Vec<DependsDoc>),
    /// Condition tree.
    When(ConditionDoc),
}

/// Comparison operator for numeric conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl CompareOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A node of a `when` condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionDoc {
    All(Vec<ConditionDoc>),
    Any(Vec<ConditionDoc>),
    Not(Box<ConditionDoc>),
    Equals {
        path: String,
        value: serde_json::Value,
    },
    /// Value at path is JS-truthy (non-null, non-false, non-zero, non-empty string).
    Truthy(String),
    /// Value at path exists and is not null.
    Present(String),
    OneOf {
        path: String,
        values: Vec<serde_json::Value>,
    },
    Compare {
        path: String,
        op: CompareOp,
        value: f64,
    },
}

// ── Migrations ──────────────────────────────────────────────────────

/// A declarative migration operation over saved form data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum MigrationOp {
    /// Rename the last segment of `from` to the key `to`, keeping its parent.
    Rename { from: String, to: String },
    /// Delete the value at `path`.
    Remove { path: String },
    /// Set `path` to `value` when nothing is there yet.
    SetDefault {
        path: String,
        value: serde_json::Value,
    },
    /// Move the value at `from` to the dot-path `to`.
    Move { from: String, to: String },
    /// Replace the value at `path` with `{ into: <old value> }`.
    Wrap { path: String, into: String },
}

// ── Submission ──────────────────────────────────────────────────────

/// Field mapping used to reshape filtered form data for submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMapping {
    /// Wrap the payload under this key.
    #[serde(default)]
    pub root: Option<String>,
    /// Serialize the wrapped payload as a JSON string under `root`.
    #[serde(default)]
    pub stringify: bool,
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
    /// Copy unmapped top-level fields through unchanged.
    #[serde(default)]
    pub passthrough: bool,
}

/// One `from` → `to` rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}
