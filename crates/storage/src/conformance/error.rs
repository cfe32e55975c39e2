use std::future::Future;

use super::{make_record, TestResult};
use crate::{FormStore, StoreError};

pub(super) async fn run_error_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "error",
            "get_missing_has_correct_fields",
            get_missing_has_correct_fields(factory).await,
        ),
        TestResult::from_result(
            "error",
            "delete_missing_is_not_found",
            delete_missing_is_not_found(factory).await,
        ),
        TestResult::from_result(
            "error",
            "second_delete_is_not_found",
            second_delete_is_not_found(factory).await,
        ),
    ]
}

async fn get_missing_has_correct_fields<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    match store.get("user-9", "form-x").await {
        Err(StoreError::NotFound { user_id, form_id }) => {
            if user_id == "user-9" && form_id == "form-x" {
                Ok(())
            } else {
                Err(format!("NotFound has wrong fields: {user_id}/{form_id}"))
            }
        }
        other => Err(format!("expected NotFound, got {other:?}")),
    }
}

async fn delete_missing_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    match store.delete("user-9", "form-x").await {
        Err(StoreError::NotFound { .. }) => Ok(()),
        other => Err(format!("expected NotFound, got {other:?}")),
    }
}

async fn second_delete_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .put("u", "f", make_record(serde_json::json!({}), 0, "/"))
        .await
        .map_err(|e| format!("put: {e}"))?;
    store.delete("u", "f").await.map_err(|e| format!("first delete: {e}"))?;
    match store.delete("u", "f").await {
        Err(StoreError::NotFound { .. }) => Ok(()),
        other => Err(format!("expected NotFound, got {other:?}")),
    }
}
