//! Store contracts consumed by the sync engine.
//!
//! Reads are synchronous (pool checkout against local SQLite is fast relative
//! to network I/O); mutations are async and serialized by the storage crate's
//! writer. The remote store is the only place a cycle suspends for long.

use async_trait::async_trait;

use crate::errors::Result;
use crate::sync::model::{IdempotencyProbe, RemoteDocument, SyncRecord, SyncStatus};

/// Local persistence for one syncable record collection.
#[async_trait]
pub trait LocalRecordStore<T: SyncRecord>: Send + Sync {
    /// Records of `tenant` currently in `status`.
    fn find_by_status(&self, tenant: &str, status: SyncStatus) -> Result<Vec<T>>;

    /// Records of `tenant` modified strictly after `since` millis.
    fn find_modified_since(&self, tenant: &str, since: i64) -> Result<Vec<T>>;

    /// Record with the given remote identity, if present locally.
    fn find_by_cloud_id(&self, tenant: &str, cloud_id: &str) -> Result<Option<T>>;

    /// Record with the given local primary key.
    fn find_by_local_id(&self, tenant: &str, local_id: i64) -> Result<Option<T>>;

    /// Every record of `tenant`, including soft-deleted ones.
    fn list_all(&self, tenant: &str) -> Result<Vec<T>>;

    /// Insert (`local_id == 0`) or update a record; returns the stored copy
    /// with its assigned local id.
    async fn upsert(&self, record: T) -> Result<T>;

    /// Physically remove a record. Child rows cascade.
    async fn hard_delete(&self, local_id: i64) -> Result<()>;
}

/// Path-addressed remote document store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Write a document and return its remote id.
    ///
    /// `document_id` targets an existing document; when it is `None` a new
    /// document is created — unless `idempotency` is supplied and a document
    /// whose `field` equals `key` already exists in the collection, in which
    /// case that document is overwritten and its id returned. A retried
    /// first-time upload is therefore a no-op on the remote side.
    async fn upload(
        &self,
        collection: &str,
        document_id: Option<&str>,
        data: serde_json::Value,
        idempotency: Option<IdempotencyProbe>,
    ) -> Result<String>;

    /// Delete a single document.
    async fn delete(&self, document_path: &str) -> Result<()>;

    /// Documents of `collection` modified strictly after `since` millis.
    async fn download_collection(&self, collection: &str, since: i64)
        -> Result<Vec<RemoteDocument>>;

    /// Recursively delete a student document and every document nested under
    /// it (schedules, their exceptions, shared resources). The data-erasure
    /// path.
    async fn delete_subtree(&self, tenant: &str, student_cloud_id: &str) -> Result<()>;
}

/// Value of the per-tenant in-progress flag, with the time it was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncFlag {
    pub in_progress: bool,
    pub updated_at: i64,
}

/// Per-tenant sync bookkeeping: pull watermark, single-flight flag, and the
/// remote cleanup clock. Created lazily on first write; wiped only on logout.
#[async_trait]
pub trait SyncMetadataStore: Send + Sync {
    /// Pull watermark in epoch millis; 0 before the first successful cycle.
    fn last_sync_timestamp(&self, tenant: &str) -> Result<i64>;

    async fn set_last_sync_timestamp(&self, tenant: &str, timestamp: i64) -> Result<()>;

    /// Current in-progress flag, or `None` when never written.
    fn sync_in_progress(&self, tenant: &str) -> Result<Option<SyncFlag>>;

    async fn set_sync_in_progress(&self, tenant: &str, in_progress: bool) -> Result<()>;

    /// Millis timestamp of the last remote duplicate cleanup; 0 when never run.
    fn last_cleanup_timestamp(&self, tenant: &str) -> Result<i64>;

    async fn set_last_cleanup_timestamp(&self, tenant: &str, timestamp: i64) -> Result<()>;

    /// Remove every metadata row of `tenant` (logout/wipe).
    async fn clear_tenant(&self, tenant: &str) -> Result<()>;
}
