//! Sync domain model shared by the engine and the store adapters.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Synchronization state of one local record.
///
/// Persisted as a small integer discriminant (see [`SyncStatus::discriminant`]);
/// never stored as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Record matches the remote copy.
    Synced,
    /// Record has local changes awaiting upload.
    PendingUpload,
    /// Record is soft-deleted locally and awaits remote deletion.
    PendingDelete,
    /// Local and remote both changed; awaiting resolution.
    Conflict,
    /// The last push/pull attempt for this record failed; retried next cycle.
    Error,
}

impl SyncStatus {
    /// Stable storage discriminant.
    pub const fn discriminant(self) -> i32 {
        match self {
            Self::Synced => 0,
            Self::PendingUpload => 1,
            Self::PendingDelete => 2,
            Self::Conflict => 3,
            Self::Error => 4,
        }
    }

    /// Inverse of [`SyncStatus::discriminant`].
    pub fn from_discriminant(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(Self::Synced),
            1 => Ok(Self::PendingUpload),
            2 => Ok(Self::PendingDelete),
            3 => Ok(Self::Conflict),
            4 => Ok(Self::Error),
            other => Err(Error::Validation(format!(
                "Unknown sync status discriminant {other}"
            ))),
        }
    }

    /// True when the record has local edits the remote copy does not know
    /// about yet. Pull must not blindly overwrite these.
    pub fn is_locally_dirty(self) -> bool {
        matches!(self, Self::PendingUpload | Self::Conflict | Self::Error)
    }
}

/// The syncable record collections, in parent-before-child processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncCollection {
    Students,
    Schedules,
    ScheduleExceptions,
    Resources,
    SharedResources,
}

impl SyncCollection {
    /// Collections in the order one sync cycle processes them.
    pub const DEPENDENCY_ORDER: [SyncCollection; 5] = [
        Self::Students,
        Self::Schedules,
        Self::ScheduleExceptions,
        Self::Resources,
        Self::SharedResources,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Students => "students",
            Self::Schedules => "schedules",
            Self::ScheduleExceptions => "schedule_exceptions",
            Self::Resources => "resources",
            Self::SharedResources => "shared_resources",
        }
    }
}

/// One document returned by an incremental collection download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    /// Remote document identity (the record's `cloud_id`).
    pub id: String,
    /// Server-indexed modification timestamp in epoch millis; the pull
    /// watermark advances to the max of these.
    pub last_modified: i64,
    /// Document payload.
    pub data: serde_json::Value,
}

/// Natural-key probe preventing duplicate creation on retried uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyProbe {
    /// Document field queried on the remote collection.
    pub field: &'static str,
    /// Value the field must equal.
    pub key: String,
}

/// Uniform view of a syncable record, implemented by all five record types.
///
/// The engine only ever touches records through this trait; everything
/// entity-specific (wire layout, parent lookups) stays in the domain modules.
pub trait SyncRecord: Clone + Send + Sync + 'static {
    /// Collection this record belongs to.
    fn collection(&self) -> SyncCollection;

    /// Local primary key; 0 for records not yet inserted.
    fn local_id(&self) -> i64;

    fn set_local_id(&mut self, id: i64);

    /// Owning tenant. Every query and remote path is scoped by this.
    fn tenant_id(&self) -> &str;

    /// Remote document identity; `None` until the first successful upload.
    fn cloud_id(&self) -> Option<&str>;

    fn set_cloud_id(&mut self, cloud_id: Option<String>);

    fn sync_status(&self) -> SyncStatus;

    fn set_sync_status(&mut self, status: SyncStatus);

    /// Millis timestamp of the latest local mutation.
    fn last_modified(&self) -> i64;

    /// Soft-delete marker; such records are invisible to normal reads.
    fn pending_delete(&self) -> bool;

    /// Natural-key probe used only for first-time creation.
    fn idempotency_probe(&self) -> IdempotencyProbe;

    /// Wire representation uploaded to the remote store.
    fn document_body(&self) -> Result<serde_json::Value>;
}

/// Current wall-clock time in epoch millis, the timestamp unit used by the
/// sync columns and the remote `lastModified` field.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
