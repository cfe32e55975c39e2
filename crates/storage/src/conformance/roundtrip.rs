use std::future::Future;

use serde_json::json;

use super::{check, make_record, TestResult};
use crate::FormStore;

pub(super) async fn run_roundtrip_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "roundtrip",
            "put_then_get_returns_record",
            put_then_get_returns_record(factory).await,
        ),
        TestResult::from_result(
            "roundtrip",
            "overwrite_keeps_id_and_created_at",
            overwrite_keeps_id_and_created_at(factory).await,
        ),
        TestResult::from_result(
            "roundtrip",
            "submission_metadata_round_trips",
            submission_metadata_round_trips(factory).await,
        ),
        TestResult::from_result(
            "roundtrip",
            "delete_then_get_is_not_found",
            delete_then_get_is_not_found(factory).await,
        ),
    ]
}

async fn put_then_get_returns_record<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let data = json!({ "veteranFullName": { "first": "Pat" }, "hasSpouse": false });
    let put = store
        .put("user-1", "21P-527EZ", make_record(data.clone(), 3, "/applicant/info"))
        .await
        .map_err(|e| format!("put: {e}"))?;
    let got = store
        .get("user-1", "21P-527EZ")
        .await
        .map_err(|e| format!("get: {e}"))?;

    check("form_data", &data, &got.form_data)?;
    check("version", 3, got.version)?;
    check("return_url", "/applicant/info", got.return_url.as_str())?;
    check("id", put.id, got.id)?;
    if got.expires_at <= got.updated_at {
        return Err(format!(
            "expires_at {} not after updated_at {}",
            got.expires_at, got.updated_at
        ));
    }
    Ok(())
}

async fn overwrite_keeps_id_and_created_at<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let first = store
        .put("user-1", "form-a", make_record(json!({ "a": 1 }), 0, "/a"))
        .await
        .map_err(|e| format!("first put: {e}"))?;
    let second = store
        .put("user-1", "form-a", make_record(json!({ "a": 2 }), 1, "/b"))
        .await
        .map_err(|e| format!("second put: {e}"))?;

    check("id", first.id, second.id)?;
    check("created_at", first.created_at, second.created_at)?;

    let got = store
        .get("user-1", "form-a")
        .await
        .map_err(|e| format!("get: {e}"))?;
    check("form_data", json!({ "a": 2 }), got.form_data)?;
    check("version", 1, got.version)?;
    check("return_url", "/b", got.return_url.as_str())
}

async fn submission_metadata_round_trips<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut record = make_record(json!({}), 0, "/review-and-submit");
    record.submission = Some(json!({ "status": "applicationSubmitted", "id": "abc" }));
    store
        .put("user-1", "form-a", record.clone())
        .await
        .map_err(|e| format!("put: {e}"))?;
    let got = store
        .get("user-1", "form-a")
        .await
        .map_err(|e| format!("get: {e}"))?;
    check("submission", record.submission, got.submission)
}

async fn delete_then_get_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .put("user-1", "form-a", make_record(json!({ "a": 1 }), 0, "/a"))
        .await
        .map_err(|e| format!("put: {e}"))?;
    store
        .delete("user-1", "form-a")
        .await
        .map_err(|e| format!("delete: {e}"))?;
    match store.get("user-1", "form-a").await {
        Err(crate::StoreError::NotFound { .. }) => Ok(()),
        other => Err(format!("expected NotFound after delete, got {other:?}")),
    }
}
