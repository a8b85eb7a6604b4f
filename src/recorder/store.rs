use std::future::Future;

use anyhow::Result;

use crate::db::NewSnapshot;

/// Append-only destination for snapshots.
pub trait SnapshotStore: Clone + Send + Sync + 'static {
    /// Persists one snapshot and returns its assigned id.
    fn append(&self, snapshot: NewSnapshot) -> impl Future<Output = Result<i64>> + Send;
}
