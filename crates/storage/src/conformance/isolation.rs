use std::future::Future;

use serde_json::json;

use super::{check, make_record, TestResult};
use crate::FormStore;

pub(super) async fn run_isolation_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "isolation",
            "users_do_not_share_records",
            users_do_not_share_records(factory).await,
        ),
        TestResult::from_result(
            "isolation",
            "forms_of_one_user_are_separate",
            forms_of_one_user_are_separate(factory).await,
        ),
        TestResult::from_result(
            "isolation",
            "list_is_scoped_and_sorted",
            list_is_scoped_and_sorted(factory).await,
        ),
    ]
}

async fn users_do_not_share_records<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .put("alice", "form-a", make_record(json!({ "who": "alice" }), 0, "/a"))
        .await
        .map_err(|e| format!("put alice: {e}"))?;
    match store.get("bob", "form-a").await {
        Err(crate::StoreError::NotFound { .. }) => {}
        other => return Err(format!("bob read alice's form: {other:?}")),
    }
    store
        .put("bob", "form-a", make_record(json!({ "who": "bob" }), 0, "/a"))
        .await
        .map_err(|e| format!("put bob: {e}"))?;
    let alice = store
        .get("alice", "form-a")
        .await
        .map_err(|e| format!("get alice: {e}"))?;
    check("alice data", json!({ "who": "alice" }), alice.form_data)
}

async fn forms_of_one_user_are_separate<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let a = store
        .put("alice", "form-a", make_record(json!({ "n": 1 }), 0, "/a"))
        .await
        .map_err(|e| format!("put a: {e}"))?;
    let b = store
        .put("alice", "form-b", make_record(json!({ "n": 2 }), 0, "/b"))
        .await
        .map_err(|e| format!("put b: {e}"))?;
    if a.id == b.id {
        return Err(format!("distinct forms share id {}", a.id));
    }
    store
        .delete("alice", "form-a")
        .await
        .map_err(|e| format!("delete a: {e}"))?;
    let got = store
        .get("alice", "form-b")
        .await
        .map_err(|e| format!("get b: {e}"))?;
    check("form-b data", json!({ "n": 2 }), got.form_data)
}

async fn list_is_scoped_and_sorted<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    for (user, form) in [("alice", "z-form"), ("alice", "a-form"), ("bob", "m-form")] {
        store
            .put(user, form, make_record(json!({}), 0, "/"))
            .await
            .map_err(|e| format!("put {user}/{form}: {e}"))?;
    }
    let listed: Vec<String> = store
        .list("alice")
        .await
        .map_err(|e| format!("list: {e}"))?
        .into_iter()
        .map(|r| r.form_id)
        .collect();
    check(
        "alice forms",
        vec!["a-form".to_string(), "z-form".to_string()],
        listed,
    )?;
    let empty = store
        .list("carol")
        .await
        .map_err(|e| format!("list carol: {e}"))?;
    check("carol forms", 0, empty.len())
}
