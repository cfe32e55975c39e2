//! Saved-data migration pipeline.
//!
//! `migrations[i]` upgrades a record saved at version `i` to version
//! `i + 1`. [`migrate`] applies steps starting at the record's version until
//! it runs out of steps, stamping the version after each one so a step is
//! never applied twice to the same record.

use std::fmt;
use std::sync::Arc;

use formwork_interchange::wire::SavedMetadata;
use formwork_interchange::MigrationOp;
use serde_json::Value;

use crate::data::{get_path, set_path, take_path, FormData};

/// Form data together with its persisted metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedForm {
    pub form_data: FormData,
    pub metadata: SavedMetadata,
}

/// Errors raised by the migration pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MigrationError {
    /// Saved data claims a version the form does not know how to read.
    #[error("saved data is at version {saved} but the form only reaches version {current}")]
    FutureVersion { saved: u32, current: u32 },
    /// A migration step rejected the data.
    #[error("migration from version {version} failed: {message}")]
    StepFailed { version: u32, message: String },
}

/// Closure form of a migration step.
pub type MigrationFn = dyn Fn(SavedForm) -> Result<SavedForm, String> + Send + Sync;

/// One migration step.
#[derive(Clone)]
pub enum Migration {
    Fn(Arc<MigrationFn>),
    Ops(Vec<MigrationOp>),
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Migration::Fn(_) => f.write_str("Fn(<fn>)"),
            Migration::Ops(ops) => f.debug_tuple("Ops").field(ops).finish(),
        }
    }
}

impl Migration {
    /// A step over the whole saved record (data and metadata).
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(SavedForm) -> Result<SavedForm, String> + Send + Sync + 'static,
    {
        Migration::Fn(Arc::new(f))
    }

    /// A step that only rewrites form data.
    pub fn data<F>(f: F) -> Self
    where
        F: Fn(FormData) -> FormData + Send + Sync + 'static,
    {
        Migration::from_fn(move |saved: SavedForm| {
            Ok(SavedForm {
                form_data: f(saved.form_data),
                metadata: saved.metadata,
            })
        })
    }

    fn apply(&self, saved: SavedForm) -> Result<SavedForm, String> {
        match self {
            Migration::Fn(f) => f(saved),
            Migration::Ops(ops) => {
                let mut saved = saved;
                for op in ops {
                    apply_op(&mut saved.form_data, op)?;
                }
                Ok(saved)
            }
        }
    }
}

/// Apply one declarative op to form data.
pub fn apply_op(data: &mut FormData, op: &MigrationOp) -> Result<(), String> {
    match op {
        MigrationOp::Rename { from, to } => {
            if to.contains('.') {
                return Err(format!("rename target '{}' must be a single key", to));
            }
            if let Some(value) = take_path(data, from) {
                let target = match from.rsplit_once('.') {
                    Some((parent, _)) => format!("{}.{}", parent, to),
                    None => to.clone(),
                };
                set_path(data, &target, value);
            }
        }
        MigrationOp::Remove { path } => {
            take_path(data, path);
        }
        MigrationOp::SetDefault { path, value } => {
            if get_path(data, path).map(Value::is_null).unwrap_or(true)
                && !set_path(data, path, value.clone())
            {
                return Err(format!("cannot set default at '{}'", path));
            }
        }
        MigrationOp::Move { from, to } => {
            if let Some(value) = take_path(data, from) {
                if !set_path(data, to, value) {
                    return Err(format!("cannot move '{}' to '{}'", from, to));
                }
            }
        }
        MigrationOp::Wrap { path, into } => {
            if let Some(value) = take_path(data, path) {
                let mut wrapped = serde_json::Map::new();
                wrapped.insert(into.clone(), value);
                set_path(data, path, Value::Object(wrapped));
            }
        }
    }
    Ok(())
}

/// Run saved data forward through `migrations`.
///
/// The result's `metadata.version` is `migrations.len()` whenever the input
/// version was at or below it. Already-current data passes through
/// unchanged.
pub fn migrate(saved: SavedForm, migrations: &[Migration]) -> Result<SavedForm, MigrationError> {
    let current = migrations.len() as u32;
    let mut version = saved.metadata.version;
    if version > current {
        return Err(MigrationError::FutureVersion {
            saved: version,
            current,
        });
    }

    let mut saved = saved;
    while let Some(step) = migrations.get(version as usize) {
        tracing::debug!(version, "applying saved-data migration");
        saved = step
            .apply(saved)
            .map_err(|message| MigrationError::StepFailed { version, message })?;
        version += 1;
        saved.metadata.version = version;
    }
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn saved(data: Value, version: u32) -> SavedForm {
        SavedForm {
            form_data: data,
            metadata: SavedMetadata {
                version,
                ..SavedMetadata::default()
            },
        }
    }

    fn double_a() -> Migration {
        Migration::data(|mut d| {
            let a = d.get("a").and_then(Value::as_i64).unwrap_or(0);
            set_path(&mut d, "b", json!(a * 2));
            d
        })
    }

    #[test]
    fn single_migration_from_version_zero() {
        let out = migrate(saved(json!({ "a": 1 }), 0), &[double_a()]).unwrap();
        assert_eq!(out.form_data, json!({ "a": 1, "b": 2 }));
        assert_eq!(out.metadata.version, 1);
    }

    #[test]
    fn already_current_data_is_untouched() {
        let migrations = vec![double_a()];
        let once = migrate(saved(json!({ "a": 1 }), 0), &migrations).unwrap();
        let twice = migrate(once.clone(), &migrations).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn starts_at_saved_version() {
        let migrations = vec![
            Migration::data(|_| json!({ "wiped": true })),
            Migration::Ops(vec![MigrationOp::SetDefault {
                path: "added".to_string(),
                value: json!("v2"),
            }]),
        ];
        let out = migrate(saved(json!({ "keep": 1 }), 1), &migrations).unwrap();
        assert_eq!(out.form_data, json!({ "keep": 1, "added": "v2" }));
        assert_eq!(out.metadata.version, 2);
    }

    #[test]
    fn future_version_rejected() {
        let err = migrate(saved(json!({}), 3), &[double_a()]).unwrap_err();
        assert_eq!(err, MigrationError::FutureVersion { saved: 3, current: 1 });
    }

    #[test]
    fn failing_step_reports_version() {
        let migrations = vec![
            double_a(),
            Migration::from_fn(|_| Err("bad shape".to_string())),
        ];
        let err = migrate(saved(json!({ "a": 1 }), 0), &migrations).unwrap_err();
        assert_eq!(
            err,
            MigrationError::StepFailed {
                version: 1,
                message: "bad shape".to_string()
            }
        );
    }

    #[test]
    fn steps_may_rewrite_return_url() {
        let migrations = vec![Migration::from_fn(|mut s: SavedForm| {
            s.metadata.return_url = s.metadata.return_url.replace("/old", "/new");
            Ok(s)
        })];
        let mut input = saved(json!({}), 0);
        input.metadata.return_url = "/old/page".to_string();
        let out = migrate(input, &migrations).unwrap();
        assert_eq!(out.metadata.return_url, "/new/page");
    }

    #[test]
    fn declarative_ops() {
        let mut data = json!({
            "veteran": { "ssn": "123", "addr": { "street": "1 Main" } },
            "legacy": true,
            "phone": "555"
        });
        let ops = [
            MigrationOp::Rename {
                from: "veteran.ssn".to_string(),
                to: "socialSecurityNumber".to_string(),
            },
            MigrationOp::Remove {
                path: "legacy".to_string(),
            },
            MigrationOp::Move {
                from: "phone".to_string(),
                to: "veteran.contact.phone".to_string(),
            },
            MigrationOp::Wrap {
                path: "veteran.addr".to_string(),
                into: "mailing".to_string(),
            },
            MigrationOp::SetDefault {
                path: "veteran.addr.mailing.street".to_string(),
                value: json!("ignored"),
            },
        ];
        for op in &ops {
            apply_op(&mut data, op).unwrap();
        }
        assert_eq!(
            data,
            json!({
                "veteran": {
                    "addr": { "mailing": { "street": "1 Main" } },
                    "socialSecurityNumber": "123",
                    "contact": { "phone": "555" }
                }
            })
        );
    }

    #[test]
    fn rename_target_must_be_key() {
        let mut data = json!({ "a": 1 });
        let op = MigrationOp::Rename {
            from: "a".to_string(),
            to: "b.c".to_string(),
        };
        assert!(apply_op(&mut data, &op).is_err());
    }
}
