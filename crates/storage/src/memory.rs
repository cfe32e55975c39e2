//! In-memory `FormStore` backend.
//!
//! Used by the mock API server and by tests. Records live in a single
//! `RwLock<HashMap>` keyed by `(user_id, form_id)`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::record::{InProgressRecord, NewRecord};
use crate::traits::FormStore;

/// Default lifetime of a saved form after its last write.
pub const DEFAULT_TTL: Duration = Duration::days(60);

type Clock = dyn Fn() -> i64 + Send + Sync;

pub struct MemoryStore {
    records: RwLock<HashMap<(String, String), InProgressRecord>>,
    next_id: AtomicI64,
    ttl: Duration,
    clock: Arc<Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            records: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            ttl: DEFAULT_TTL,
            clock: Arc::new(|| OffsetDateTime::now_utc().unix_timestamp()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Replace the wall clock with a function returning unix seconds.
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }

    #[cfg(test)]
    async fn stored_count(&self) -> usize {
        self.records.read().await.len()
    }

    fn not_found(user_id: &str, form_id: &str) -> StoreError {
        StoreError::NotFound {
            user_id: user_id.to_string(),
            form_id: form_id.to_string(),
        }
    }
}

#[async_trait]
impl FormStore for MemoryStore {
    async fn put(
        &self,
        user_id: &str,
        form_id: &str,
        record: NewRecord,
    ) -> Result<InProgressRecord, StoreError> {
        if form_id.is_empty() {
            return Err(StoreError::InvalidRecord {
                form_id: form_id.to_string(),
                message: "form id must not be empty".to_string(),
            });
        }

        let now = self.now();
        let expires_at = now + self.ttl.whole_seconds();
        let key = (user_id.to_string(), form_id.to_string());
        let mut records = self.records.write().await;

        // Expired records are evicted, so a save over one starts fresh.
        records.retain(|_, r| r.expires_at > now);
        let (id, created_at) = match records.get(&key) {
            Some(r) => (r.id, r.created_at),
            None => (self.next_id.fetch_add(1, Ordering::SeqCst), now),
        };

        let stored = InProgressRecord {
            id,
            user_id: user_id.to_string(),
            form_id: form_id.to_string(),
            form_data: record.form_data,
            version: record.version,
            return_url: record.return_url,
            submission: record.submission,
            created_at,
            updated_at: now,
            expires_at,
        };
        records.insert(key, stored.clone());
        Ok(stored)
    }

    async fn get(&self, user_id: &str, form_id: &str) -> Result<InProgressRecord, StoreError> {
        let now = self.now();
        let records = self.records.read().await;
        records
            .get(&(user_id.to_string(), form_id.to_string()))
            .filter(|r| r.expires_at > now)
            .cloned()
            .ok_or_else(|| Self::not_found(user_id, form_id))
    }

    async fn delete(&self, user_id: &str, form_id: &str) -> Result<(), StoreError> {
        let now = self.now();
        let mut records = self.records.write().await;
        match records.remove(&(user_id.to_string(), form_id.to_string())) {
            Some(r) if r.expires_at > now => Ok(()),
            _ => Err(Self::not_found(user_id, form_id)),
        }
    }

    async fn list(&self, user_id: &str) -> Result<Vec<InProgressRecord>, StoreError> {
        let now = self.now();
        let records = self.records.read().await;
        let mut out: Vec<InProgressRecord> = records
            .values()
            .filter(|r| r.user_id == user_id && r.expires_at > now)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.form_id.cmp(&b.form_id));
        Ok(out)
    }
}
