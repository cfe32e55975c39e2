//! Engine behavior driven entirely by JSON form documents.

use formwork_core::{
    migrate, transformer_for, validate_active_pages, DependsError, FormConfig, PageRouter,
    SavedForm,
};
use formwork_interchange::wire::SavedMetadata;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn dependents_form() -> FormConfig {
    FormConfig::from_json(&json!({
        "formId": "21-686C",
        "version": 0,
        "urlPrefix": "/686c/",
        "chapters": {
            "household": { "title": "Household", "pages": {
                "summary": {
                    "path": "summary",
                    "schema": { "type": "object", "properties": {
                        "dependents": { "type": "array", "items": {
                            "type": "object",
                            "properties": {
                                "name": { "type": "string" },
                                "inSchool": { "type": "boolean" },
                                "school": { "type": "string" }
                            }
                        }}
                    }}
                },
                "school": {
                    "path": "dependents/:index/school",
                    "arrayPath": "dependents",
                    "showPagePerItem": true,
                    "depends": { "when": { "truthy": "dependents.:index.inSchool" } },
                    "schema": { "type": "object", "properties": {
                        "dependents": { "type": "array", "items": {
                            "type": "object",
                            "required": ["school"],
                            "properties": { "school": { "type": "string" } }
                        }}
                    }}
                }
            }}
        }
    }))
    .unwrap()
}

#[test]
fn per_item_pages_follow_their_own_element() {
    let config = dependents_form();
    let data = json!({ "dependents": [
        { "name": "Avery", "inSchool": false },
        { "name": "Blake", "inSchool": true }
    ]});

    let routes = PageRouter::new(&config).routes(&data).unwrap();
    assert_eq!(
        routes,
        vec![
            "/686c/summary",
            "/686c/dependents/1/school",
            "/686c/review-and-submit"
        ]
    );
}

#[test]
fn per_item_validation_checks_only_active_items() {
    let config = dependents_form();
    let data = json!({ "dependents": [
        { "name": "Avery", "inSchool": false },
        { "name": "Blake", "inSchool": true }
    ]});

    let report = validate_active_pages(&config, &data).unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].page_key, "school");
    assert_eq!(report[0].path, "dependents/1/school");

    let fixed = json!({ "dependents": [
        { "name": "Avery", "inSchool": false },
        { "name": "Blake", "inSchool": true, "school": "State U" }
    ]});
    assert!(validate_active_pages(&config, &fixed).unwrap().is_empty());
}

#[test]
fn comparing_a_non_number_is_an_error() {
    let config = FormConfig::from_json(&json!({
        "formId": "f",
        "version": 0,
        "chapters": { "c": { "pages": {
            "adult": {
                "path": "adult",
                "depends": { "when": { "compare": { "path": "age", "op": ">=", "value": 18 } } }
            }
        }}}
    }))
    .unwrap();
    let router = PageRouter::new(&config);

    assert_eq!(router.active_pages(&json!({ "age": 30 })).unwrap().len(), 1);
    assert!(router.active_pages(&json!({})).unwrap().is_empty());
    assert!(matches!(
        router.active_pages(&json!({ "age": "thirty" })),
        Err(DependsError::NotANumber { .. })
    ));
}

#[test]
fn declarative_migrations_run_in_order_once() {
    let config = FormConfig::from_json(&json!({
        "formId": "f",
        "version": 3,
        "chapters": { "c": { "pages": { "p": { "path": "p" } } } },
        "migrations": [
            [{ "op": "setDefault", "path": "contact.email", "value": "" }],
            [{ "op": "move", "from": "phone", "to": "contact.phone" }],
            [{ "op": "wrap", "path": "address", "into": "mailing" }]
        ]
    }))
    .unwrap();

    let saved = SavedForm {
        form_data: json!({ "phone": "555-0100", "address": { "street": "1 Main St" } }),
        metadata: SavedMetadata::default(),
    };
    let migrated = migrate(saved, &config.migrations).unwrap();
    let expected = json!({
        "contact": { "email": "", "phone": "555-0100" },
        "address": { "mailing": { "street": "1 Main St" } }
    });
    assert_eq!(migrated.form_data, expected);
    assert_eq!(migrated.metadata.version, 3);

    let again = migrate(migrated, &config.migrations).unwrap();
    assert_eq!(again.form_data, expected);
    assert_eq!(again.metadata.version, 3);
}

#[test]
fn document_submission_mapping_selects_mapped_transformer() {
    let config = FormConfig::from_json(&json!({
        "formId": "10-10CG",
        "version": 0,
        "chapters": { "c": { "pages": {
            "vet": {
                "path": "veteran",
                "schema": { "type": "object", "properties": {
                    "veteranFullName": {}, "email": {}
                }}
            }
        }}},
        "submission": {
            "root": "caregiverApplication",
            "stringify": true,
            "fields": [
                { "from": "veteranFullName", "to": "veteran.fullName" },
                { "from": "email", "to": "veteran.email", "default": "none@example.com" }
            ]
        }
    }))
    .unwrap();

    let body = transformer_for(&config)
        .transform(&config, &json!({ "veteranFullName": "Pat Doe" }))
        .unwrap();
    let payload: Value = serde_json::from_str(&body).unwrap();
    let inner: Value =
        serde_json::from_str(payload["caregiverApplication"].as_str().unwrap()).unwrap();
    assert_eq!(
        inner,
        json!({ "veteran": { "fullName": "Pat Doe", "email": "none@example.com" } })
    );
}
