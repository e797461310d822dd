//! Conflict resolution between a dirty local record and a remote document.

use crate::sync::model::{SyncRecord, SyncStatus};

/// Last-write-wins at record granularity.
///
/// The strictly newer `last_modified` timestamp wins. A winning local record
/// is re-queued as `PENDING_UPLOAD` so the newer edit eventually overwrites
/// the remote copy; a winning remote record keeps the local row identity and
/// becomes `SYNCED`. Ties go to the remote version — it has already been
/// acknowledged by at least one other device. The losing edit is discarded
/// whole; no field-level merge.
pub fn resolve_lww<T: SyncRecord>(local: T, remote: T) -> T {
    if local.last_modified() > remote.last_modified() {
        let mut winner = local;
        winner.set_sync_status(SyncStatus::PendingUpload);
        winner
    } else {
        let mut winner = remote;
        winner.set_local_id(local.local_id());
        winner.set_sync_status(SyncStatus::Synced);
        winner
    }
}
