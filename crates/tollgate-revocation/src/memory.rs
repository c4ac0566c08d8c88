//! In-process revocation store

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::error::RevocationError;
use crate::store::{RevocationStore, ensure_ttl};

#[derive(Debug, Clone)]
struct Record {
    marker: String,
    expires_at: Instant,
}

/// In-process revocation store
///
/// Suitable for single-instance deployments and tests. Records are dropped
/// lazily once their deadline passes.
#[derive(Debug, Default)]
pub struct MemoryRevocationStore {
    records: RwLock<HashMap<i64, Record>>,
}

impl MemoryRevocationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired records, returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, record| record.expires_at > now);
        before - records.len()
    }

    /// Number of records currently held (including expired, not yet purged)
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn live_marker(&self, subject_id: i64) -> Option<String> {
        let now = Instant::now();
        self.records
            .read()
            .get(&subject_id)
            .filter(|record| record.expires_at > now)
            .map(|record| record.marker.clone())
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn record(
        &self,
        subject_id: i64,
        marker: &str,
        ttl: Duration,
    ) -> Result<(), RevocationError> {
        ensure_ttl(ttl)?;

        let record = Record {
            marker: marker.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.records.write().insert(subject_id, record);

        debug!("Recorded liveness for subject {} (ttl {:?})", subject_id, ttl);
        Ok(())
    }

    async fn check_live(&self, subject_id: i64) -> Result<bool, RevocationError> {
        Ok(self.live_marker(subject_id).is_some())
    }

    async fn current(&self, subject_id: i64) -> Result<Option<String>, RevocationError> {
        Ok(self.live_marker(subject_id))
    }

    async fn revoke(&self, subject_id: i64) -> Result<bool, RevocationError> {
        let now = Instant::now();
        let removed = self.records.write().remove(&subject_id);
        Ok(removed.is_some_and(|record| record.expires_at > now))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
