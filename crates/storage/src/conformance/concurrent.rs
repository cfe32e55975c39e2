use std::future::Future;
use std::sync::Arc;

use serde_json::json;

use super::{check, make_record, TestResult};
use crate::FormStore;

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "concurrent_puts_leave_one_record",
            concurrent_puts_leave_one_record(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_puts_different_forms_all_succeed",
            concurrent_puts_different_forms_all_succeed(factory).await,
        ),
    ]
}

// ── Same form: last writer wins, one record ──────────────────────────────────

/// N tasks overwrite the same form. All succeed, the id is shared, and the
/// stored data is one of the written payloads.
async fn concurrent_puts_leave_one_record<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.put("user-1", "form-a", make_record(json!({ "n": i }), 0, "/a"))
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let record = handle
            .await
            .map_err(|e| format!("join: {e}"))?
            .map_err(|e| format!("put: {e}"))?;
        ids.push(record.id);
    }
    ids.dedup();
    check("distinct ids", 1, ids.len())?;

    let got = store
        .get("user-1", "form-a")
        .await
        .map_err(|e| format!("get: {e}"))?;
    let n = got.form_data["n"]
        .as_u64()
        .ok_or_else(|| format!("stored data lost its payload: {}", got.form_data))?;
    if n as usize >= N {
        return Err(format!("stored payload {n} was never written"));
    }
    check("records listed", 1, store.list("user-1").await.map_err(|e| e.to_string())?.len())
}

// ── Different forms: all succeed ─────────────────────────────────────────────

async fn concurrent_puts_different_forms_all_succeed<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.put("user-1", &format!("form-{i:02}"), make_record(json!({ "n": i }), 0, "/"))
                .await
        }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| format!("join: {e}"))?
            .map_err(|e| format!("put: {e}"))?;
    }
    check(
        "records listed",
        N,
        store.list("user-1").await.map_err(|e| e.to_string())?.len(),
    )
}
