//! Data synchronizer: runs one full push/pull cycle per tenant.
//!
//! A cycle pushes locally-dirty records in parent-before-child order (deletes
//! before uploads within each collection), then pulls remote changes
//! incrementally and resolves conflicts, then commits the pull watermark.
//! Failures inside one record are converted to an `ERROR` status at the
//! record boundary; only the loss of tenant authentication aborts a cycle.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::Mutex;

use crate::auth::TenantAuth;
use crate::errors::{Error, Result};
use crate::resources::{Resource, SharedResource};
use crate::schedules::{Schedule, ScheduleException};
use crate::students::Student;
use crate::sync::conflict::resolve_lww;
use crate::sync::model::{now_millis, RemoteDocument, SyncRecord, SyncStatus};
use crate::sync::paths;
use crate::sync::stores::{LocalRecordStore, RemoteStore, SyncMetadataStore};

/// How long the persisted in-progress flag is trusted. A crash mid-cycle
/// leaves the flag set; once it is older than this, the next cycle takes over.
pub const STALE_SYNC_FLAG_MILLIS: i64 = 10 * 60 * 1000;

/// Minimum spacing between remote duplicate-cleanup passes.
pub const CLEANUP_INTERVAL_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Terminal state of one `perform_sync` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncCycleStatus {
    /// The cycle ran to completion.
    Completed,
    /// Another cycle for this tenant was already running; nothing was done.
    AlreadyRunning,
}

/// Counters reported by a finished cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCycleOutcome {
    pub status: SyncCycleStatus,
    pub pushed: usize,
    pub pulled: usize,
    pub deleted: usize,
    /// Watermark after the cycle, epoch millis.
    pub watermark: i64,
}

impl SyncCycleOutcome {
    fn already_running(watermark: i64) -> Self {
        Self {
            status: SyncCycleStatus::AlreadyRunning,
            pushed: 0,
            pulled: 0,
            deleted: 0,
            watermark,
        }
    }
}

/// Mutable progress of the cycle in flight.
struct CycleState {
    since: i64,
    max_remote_ts: i64,
    pushed: usize,
    pulled: usize,
    deleted: usize,
}

impl CycleState {
    fn new(since: i64) -> Self {
        Self {
            since,
            max_remote_ts: since,
            pushed: 0,
            pulled: 0,
            deleted: 0,
        }
    }

    fn observe_remote(&mut self, server_ts: i64) {
        self.max_remote_ts = self.max_remote_ts.max(server_ts);
    }

    fn into_outcome(self) -> SyncCycleOutcome {
        SyncCycleOutcome {
            status: SyncCycleStatus::Completed,
            pushed: self.pushed,
            pulled: self.pulled,
            deleted: self.deleted,
            watermark: self.max_remote_ts,
        }
    }
}

/// Orchestrates synchronization between the local store and the remote
/// document store. All collaborators are injected; the synchronizer itself
/// holds no persistent state beyond the in-process cycle mutex.
pub struct DataSynchronizer {
    students: Arc<dyn LocalRecordStore<Student>>,
    schedules: Arc<dyn LocalRecordStore<Schedule>>,
    exceptions: Arc<dyn LocalRecordStore<ScheduleException>>,
    resources: Arc<dyn LocalRecordStore<Resource>>,
    shared_resources: Arc<dyn LocalRecordStore<SharedResource>>,
    remote: Arc<dyn RemoteStore>,
    metadata: Arc<dyn SyncMetadataStore>,
    auth: Arc<dyn TenantAuth>,
    cycle_mutex: Mutex<()>,
}

impl DataSynchronizer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        students: Arc<dyn LocalRecordStore<Student>>,
        schedules: Arc<dyn LocalRecordStore<Schedule>>,
        exceptions: Arc<dyn LocalRecordStore<ScheduleException>>,
        resources: Arc<dyn LocalRecordStore<Resource>>,
        shared_resources: Arc<dyn LocalRecordStore<SharedResource>>,
        remote: Arc<dyn RemoteStore>,
        metadata: Arc<dyn SyncMetadataStore>,
        auth: Arc<dyn TenantAuth>,
    ) -> Self {
        Self {
            students,
            schedules,
            exceptions,
            resources,
            shared_resources,
            remote,
            metadata,
            auth,
            cycle_mutex: Mutex::new(()),
        }
    }

    /// Run one synchronization cycle for `tenant`.
    ///
    /// Single-flight per tenant: a concurrent caller observes the in-progress
    /// flag and returns immediately with [`SyncCycleStatus::AlreadyRunning`].
    /// The advisory flag is released on every exit path, including an
    /// authentication abort.
    pub async fn perform_sync(&self, tenant: &str) -> Result<SyncCycleOutcome> {
        let _guard = match self.cycle_mutex.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Sync cycle already running in-process; skipping");
                return Ok(SyncCycleOutcome::already_running(
                    self.metadata.last_sync_timestamp(tenant)?,
                ));
            }
        };

        if let Some(flag) = self.metadata.sync_in_progress(tenant)? {
            if flag.in_progress {
                if now_millis() - flag.updated_at < STALE_SYNC_FLAG_MILLIS {
                    debug!("Sync already in progress for tenant {tenant}; skipping");
                    return Ok(SyncCycleOutcome::already_running(
                        self.metadata.last_sync_timestamp(tenant)?,
                    ));
                }
                warn!("Ignoring stale sync-in-progress flag for tenant {tenant}");
            }
        }

        self.metadata.set_sync_in_progress(tenant, true).await?;
        let outcome = self.run_cycle(tenant).await;
        if let Err(release_err) = self.metadata.set_sync_in_progress(tenant, false).await {
            warn!("Failed to release sync flag for tenant {tenant}: {release_err}");
        }
        outcome
    }

    async fn run_cycle(&self, tenant: &str) -> Result<SyncCycleOutcome> {
        self.ensure_tenant(tenant)?;
        let mut cycle = CycleState::new(self.metadata.last_sync_timestamp(tenant)?);
        debug!(
            "Starting sync cycle for tenant {tenant} (watermark {})",
            cycle.since
        );

        self.maybe_clean_remote_duplicates(tenant).await;

        self.push_students(tenant, &mut cycle).await?;
        self.ensure_tenant(tenant)?;
        self.push_schedules(tenant, &mut cycle).await?;
        self.ensure_tenant(tenant)?;
        self.push_exceptions(tenant, &mut cycle).await?;
        self.ensure_tenant(tenant)?;
        self.push_resources(tenant, &mut cycle).await?;
        self.ensure_tenant(tenant)?;
        self.push_shared_resources(tenant, &mut cycle).await?;

        self.ensure_tenant(tenant)?;
        self.pull_students(tenant, &mut cycle).await?;
        self.ensure_tenant(tenant)?;
        self.pull_schedules(tenant, &mut cycle).await?;
        self.ensure_tenant(tenant)?;
        self.pull_exceptions(tenant, &mut cycle).await?;
        self.ensure_tenant(tenant)?;
        self.pull_resources(tenant, &mut cycle).await?;
        self.ensure_tenant(tenant)?;
        self.pull_shared_resources(tenant, &mut cycle).await?;

        if cycle.max_remote_ts > cycle.since {
            self.metadata
                .set_last_sync_timestamp(tenant, cycle.max_remote_ts)
                .await?;
        }

        info!(
            "Sync cycle complete for tenant {tenant}: pushed={} pulled={} deleted={} watermark={}",
            cycle.pushed, cycle.pulled, cycle.deleted, cycle.max_remote_ts
        );
        Ok(cycle.into_outcome())
    }

    fn ensure_tenant(&self, tenant: &str) -> Result<()> {
        if self.auth.current_tenant().as_deref() == Some(tenant) {
            Ok(())
        } else {
            Err(Error::Unauthenticated)
        }
    }

    /// Records awaiting upload, including failed ones queued for retry.
    fn dirty_for_upload<T: SyncRecord>(
        &self,
        store: &dyn LocalRecordStore<T>,
        tenant: &str,
    ) -> Result<Vec<T>> {
        let mut records = store.find_by_status(tenant, SyncStatus::PendingUpload)?;
        records.extend(store.find_by_status(tenant, SyncStatus::Error)?);
        Ok(records)
    }

    fn student_index(&self, tenant: &str) -> Result<HashMap<i64, Student>> {
        Ok(self
            .students
            .list_all(tenant)?
            .into_iter()
            .map(|s| (s.id, s))
            .collect())
    }

    fn schedule_index(&self, tenant: &str) -> Result<HashMap<i64, Schedule>> {
        Ok(self
            .schedules
            .list_all(tenant)?
            .into_iter()
            .map(|s| (s.id, s))
            .collect())
    }

    // ── Push ────────────────────────────────────────────────────────────────

    /// Upload one record, assigning its remote id and marking it `SYNCED`.
    /// Failures stay at the record: the record moves to `ERROR` and the batch
    /// continues. Only auth failures propagate.
    async fn push_upload<T: SyncRecord>(
        &self,
        store: &dyn LocalRecordStore<T>,
        collection: &str,
        mut record: T,
        cycle: &mut CycleState,
    ) -> Result<()> {
        let body = match record.document_body() {
            Ok(body) => body,
            Err(err) => {
                warn!(
                    "Cannot serialize {} record {}: {err}",
                    record.collection().as_str(),
                    record.local_id()
                );
                record.set_sync_status(SyncStatus::Error);
                store.upsert(record).await?;
                return Ok(());
            }
        };

        // The natural-key probe only guards first-time creation; updates are
        // addressed by the known remote id.
        let existing_id = record.cloud_id().map(str::to_string);
        let probe = existing_id.is_none().then(|| record.idempotency_probe());

        match self
            .remote
            .upload(collection, existing_id.as_deref(), body, probe)
            .await
        {
            Ok(remote_id) => {
                record.set_cloud_id(Some(remote_id));
                record.set_sync_status(SyncStatus::Synced);
                store.upsert(record).await?;
                cycle.pushed += 1;
            }
            Err(err) if err.is_auth_failure() => return Err(err),
            Err(err) => {
                warn!(
                    "Upload failed for {} record {}: {err}",
                    record.collection().as_str(),
                    record.local_id()
                );
                record.set_sync_status(SyncStatus::Error);
                store.upsert(record).await?;
            }
        }
        Ok(())
    }

    /// Delete one record remotely (when it ever reached the remote store) and
    /// then physically locally. A failed remote delete leaves the record
    /// `PENDING_DELETE` for the next cycle.
    async fn push_delete<T: SyncRecord>(
        &self,
        store: &dyn LocalRecordStore<T>,
        document_path: Option<String>,
        record: &T,
        cycle: &mut CycleState,
    ) -> Result<()> {
        if let Some(path) = document_path {
            match self.remote.delete(&path).await {
                Ok(()) => {}
                Err(err) if err.is_auth_failure() => return Err(err),
                Err(err) => {
                    warn!(
                        "Remote delete failed for {} record {}: {err}",
                        record.collection().as_str(),
                        record.local_id()
                    );
                    return Ok(());
                }
            }
        }
        store.hard_delete(record.local_id()).await?;
        cycle.deleted += 1;
        Ok(())
    }

    async fn push_students(&self, tenant: &str, cycle: &mut CycleState) -> Result<()> {
        for student in self
            .students
            .find_by_status(tenant, SyncStatus::PendingDelete)?
        {
            match student.cloud_id.as_deref() {
                Some(cloud_id) => match self.remote.delete_subtree(tenant, cloud_id).await {
                    Ok(()) => {
                        // Local child rows cascade with the student row.
                        self.students.hard_delete(student.id).await?;
                        cycle.deleted += 1;
                    }
                    Err(err) if err.is_auth_failure() => return Err(err),
                    Err(err) => {
                        warn!("Erasure failed for student {}: {err}", student.id);
                    }
                },
                None => {
                    self.students.hard_delete(student.id).await?;
                    cycle.deleted += 1;
                }
            }
        }

        let collection = paths::students_collection(tenant);
        for student in self.dirty_for_upload(self.students.as_ref(), tenant)? {
            self.push_upload(self.students.as_ref(), &collection, student, cycle)
                .await?;
        }
        Ok(())
    }

    async fn push_schedules(&self, tenant: &str, cycle: &mut CycleState) -> Result<()> {
        let students = self.student_index(tenant)?;

        for schedule in self
            .schedules
            .find_by_status(tenant, SyncStatus::PendingDelete)?
        {
            let path = match (
                students
                    .get(&schedule.student_id)
                    .and_then(|s| s.cloud_id.as_deref()),
                schedule.cloud_id.as_deref(),
            ) {
                (Some(student_cloud), Some(cloud_id)) => {
                    Some(paths::schedule_document(tenant, student_cloud, cloud_id))
                }
                _ => None,
            };
            self.push_delete(self.schedules.as_ref(), path, &schedule, cycle)
                .await?;
        }

        for schedule in self.dirty_for_upload(self.schedules.as_ref(), tenant)? {
            let Some(parent) = students.get(&schedule.student_id) else {
                continue;
            };
            // Parents must exist remotely first; a deleting parent makes the
            // child moot.
            if parent.pending_delete {
                continue;
            }
            let Some(student_cloud) = parent.cloud_id.as_deref() else {
                continue;
            };
            let collection = paths::schedules_collection(tenant, student_cloud);
            self.push_upload(self.schedules.as_ref(), &collection, schedule, cycle)
                .await?;
        }
        Ok(())
    }

    async fn push_exceptions(&self, tenant: &str, cycle: &mut CycleState) -> Result<()> {
        let students = self.student_index(tenant)?;
        let schedules = self.schedule_index(tenant)?;

        let parent_cloud_ids = |exception: &ScheduleException| -> Option<(String, String)> {
            let schedule = schedules.get(&exception.schedule_id)?;
            let student = students.get(&exception.student_id)?;
            Some((
                student.cloud_id.clone()?,
                schedule.cloud_id.clone()?,
            ))
        };

        for exception in self
            .exceptions
            .find_by_status(tenant, SyncStatus::PendingDelete)?
        {
            let path = match (parent_cloud_ids(&exception), exception.cloud_id.as_deref()) {
                (Some((student_cloud, schedule_cloud)), Some(cloud_id)) => Some(
                    paths::exception_document(tenant, &student_cloud, &schedule_cloud, cloud_id),
                ),
                _ => None,
            };
            self.push_delete(self.exceptions.as_ref(), path, &exception, cycle)
                .await?;
        }

        for exception in self.dirty_for_upload(self.exceptions.as_ref(), tenant)? {
            let parent_deleting = students
                .get(&exception.student_id)
                .map(|s| s.pending_delete)
                .unwrap_or(true)
                || schedules
                    .get(&exception.schedule_id)
                    .map(|s| s.pending_delete)
                    .unwrap_or(true);
            if parent_deleting {
                continue;
            }
            let Some((student_cloud, schedule_cloud)) = parent_cloud_ids(&exception) else {
                continue;
            };
            let collection = paths::exceptions_collection(tenant, &student_cloud, &schedule_cloud);
            self.push_upload(self.exceptions.as_ref(), &collection, exception, cycle)
                .await?;
        }
        Ok(())
    }

    async fn push_resources(&self, tenant: &str, cycle: &mut CycleState) -> Result<()> {
        for resource in self
            .resources
            .find_by_status(tenant, SyncStatus::PendingDelete)?
        {
            let path = resource
                .cloud_id
                .as_deref()
                .map(|cloud_id| paths::resource_document(tenant, cloud_id));
            self.push_delete(self.resources.as_ref(), path, &resource, cycle)
                .await?;
        }

        let collection = paths::resources_collection(tenant);
        for resource in self.dirty_for_upload(self.resources.as_ref(), tenant)? {
            self.push_upload(self.resources.as_ref(), &collection, resource, cycle)
                .await?;
        }
        Ok(())
    }

    async fn push_shared_resources(&self, tenant: &str, cycle: &mut CycleState) -> Result<()> {
        let students = self.student_index(tenant)?;

        for shared in self
            .shared_resources
            .find_by_status(tenant, SyncStatus::PendingDelete)?
        {
            let path = match (
                students
                    .get(&shared.student_id)
                    .and_then(|s| s.cloud_id.as_deref()),
                shared.cloud_id.as_deref(),
            ) {
                (Some(student_cloud), Some(cloud_id)) => Some(paths::shared_resource_document(
                    tenant,
                    student_cloud,
                    cloud_id,
                )),
                _ => None,
            };
            self.push_delete(self.shared_resources.as_ref(), path, &shared, cycle)
                .await?;
        }

        for shared in self.dirty_for_upload(self.shared_resources.as_ref(), tenant)? {
            let Some(parent) = students.get(&shared.student_id) else {
                continue;
            };
            if parent.pending_delete {
                continue;
            }
            let Some(student_cloud) = parent.cloud_id.as_deref() else {
                continue;
            };
            let collection = paths::shared_resources_collection(tenant, student_cloud);
            self.push_upload(self.shared_resources.as_ref(), &collection, shared, cycle)
                .await?;
        }
        Ok(())
    }

    // ── Pull ────────────────────────────────────────────────────────────────

    async fn download(
        &self,
        collection: &str,
        since: i64,
    ) -> Result<Option<Vec<RemoteDocument>>> {
        match self.remote.download_collection(collection, since).await {
            Ok(docs) => Ok(Some(docs)),
            Err(err) if err.is_auth_failure() => Err(err),
            Err(err) => {
                warn!("Download failed for {collection}: {err}");
                Ok(None)
            }
        }
    }

    /// Apply one pulled document to a local collection: insert when unknown,
    /// overwrite when clean, resolve when dirty. Records soft-deleted locally
    /// are left alone — the local deletion wins until it is pushed.
    async fn apply_remote_document<T: SyncRecord>(
        &self,
        store: &dyn LocalRecordStore<T>,
        tenant: &str,
        doc: &RemoteDocument,
        incoming: T,
        cycle: &mut CycleState,
    ) -> Result<()> {
        match store.find_by_cloud_id(tenant, &doc.id)? {
            None => {
                store.upsert(incoming).await?;
                cycle.pulled += 1;
            }
            Some(local) if local.pending_delete() => {}
            Some(local) => {
                if local.sync_status().is_locally_dirty() {
                    let resolved = resolve_lww(local, incoming);
                    store.upsert(resolved).await?;
                } else {
                    let mut incoming = incoming;
                    incoming.set_local_id(local.local_id());
                    store.upsert(incoming).await?;
                }
                cycle.pulled += 1;
            }
        }
        Ok(())
    }

    async fn pull_students(&self, tenant: &str, cycle: &mut CycleState) -> Result<()> {
        let collection = paths::students_collection(tenant);
        let Some(docs) = self.download(&collection, cycle.since).await? else {
            return Ok(());
        };
        let locals = self.students.list_all(tenant)?;

        for doc in docs {
            cycle.observe_remote(doc.last_modified);
            let incoming = match Student::from_document(&doc, tenant) {
                Ok(student) => student,
                Err(err) => {
                    warn!("Skipping malformed remote student {}: {err}", doc.id);
                    continue;
                }
            };

            // A document unknown by cloud id may still be the twin of a local
            // student typed in on this device before its first upload; adopt
            // that row instead of inserting a duplicate.
            if self.students.find_by_cloud_id(tenant, &doc.id)?.is_none() {
                let twin = locals.iter().find(|s| {
                    s.cloud_id.is_none()
                        && !s.pending_delete
                        && s.normalized_name() == incoming.normalized_name()
                });
                if let Some(twin) = twin {
                    let mut resolved = resolve_lww(twin.clone(), incoming);
                    resolved.set_cloud_id(Some(doc.id.clone()));
                    self.students.upsert(resolved).await?;
                    cycle.pulled += 1;
                    continue;
                }
            }

            self.apply_remote_document(self.students.as_ref(), tenant, &doc, incoming, cycle)
                .await?;
        }
        Ok(())
    }

    async fn pull_schedules(&self, tenant: &str, cycle: &mut CycleState) -> Result<()> {
        for student in self.students.list_all(tenant)? {
            if student.pending_delete {
                continue;
            }
            let Some(student_cloud) = student.cloud_id.as_deref() else {
                continue;
            };
            let collection = paths::schedules_collection(tenant, student_cloud);
            let Some(docs) = self.download(&collection, cycle.since).await? else {
                continue;
            };
            for doc in docs {
                cycle.observe_remote(doc.last_modified);
                match Schedule::from_document(&doc, tenant, student.id) {
                    Ok(incoming) => {
                        self.apply_remote_document(
                            self.schedules.as_ref(),
                            tenant,
                            &doc,
                            incoming,
                            cycle,
                        )
                        .await?;
                    }
                    Err(err) => warn!("Skipping malformed remote schedule {}: {err}", doc.id),
                }
            }
        }
        Ok(())
    }

    async fn pull_exceptions(&self, tenant: &str, cycle: &mut CycleState) -> Result<()> {
        let students = self.student_index(tenant)?;
        for schedule in self.schedules.list_all(tenant)? {
            if schedule.pending_delete {
                continue;
            }
            let Some(schedule_cloud) = schedule.cloud_id.as_deref() else {
                continue;
            };
            let Some(student_cloud) = students
                .get(&schedule.student_id)
                .and_then(|s| s.cloud_id.as_deref())
            else {
                continue;
            };
            let collection = paths::exceptions_collection(tenant, student_cloud, schedule_cloud);
            let Some(docs) = self.download(&collection, cycle.since).await? else {
                continue;
            };
            for doc in docs {
                cycle.observe_remote(doc.last_modified);
                match ScheduleException::from_document(&doc, tenant, schedule.student_id, schedule.id)
                {
                    Ok(incoming) => {
                        self.apply_remote_document(
                            self.exceptions.as_ref(),
                            tenant,
                            &doc,
                            incoming,
                            cycle,
                        )
                        .await?;
                    }
                    Err(err) => {
                        warn!("Skipping malformed remote exception {}: {err}", doc.id)
                    }
                }
            }
        }
        Ok(())
    }

    async fn pull_resources(&self, tenant: &str, cycle: &mut CycleState) -> Result<()> {
        let collection = paths::resources_collection(tenant);
        let Some(docs) = self.download(&collection, cycle.since).await? else {
            return Ok(());
        };
        for doc in docs {
            cycle.observe_remote(doc.last_modified);
            match Resource::from_document(&doc, tenant) {
                Ok(incoming) => {
                    self.apply_remote_document(
                        self.resources.as_ref(),
                        tenant,
                        &doc,
                        incoming,
                        cycle,
                    )
                    .await?;
                }
                Err(err) => warn!("Skipping malformed remote resource {}: {err}", doc.id),
            }
        }
        Ok(())
    }

    async fn pull_shared_resources(&self, tenant: &str, cycle: &mut CycleState) -> Result<()> {
        for student in self.students.list_all(tenant)? {
            if student.pending_delete {
                continue;
            }
            let Some(student_cloud) = student.cloud_id.as_deref() else {
                continue;
            };
            let collection = paths::shared_resources_collection(tenant, student_cloud);
            let Some(docs) = self.download(&collection, cycle.since).await? else {
                continue;
            };
            for doc in docs {
                cycle.observe_remote(doc.last_modified);
                match SharedResource::from_document(&doc, tenant, student.id) {
                    Ok(incoming) => {
                        self.apply_remote_document(
                            self.shared_resources.as_ref(),
                            tenant,
                            &doc,
                            incoming,
                            cycle,
                        )
                        .await?;
                    }
                    Err(err) => {
                        warn!("Skipping malformed remote shared resource {}: {err}", doc.id)
                    }
                }
            }
        }
        Ok(())
    }

    // ── Remote duplicate cleanup ────────────────────────────────────────────

    /// Best-effort dedup of the remote students collection, at most once per
    /// [`CLEANUP_INTERVAL_MILLIS`]. Students double-created before idempotent
    /// upload shipped are collapsed onto the newest document per name.
    async fn maybe_clean_remote_duplicates(&self, tenant: &str) {
        let last = match self.metadata.last_cleanup_timestamp(tenant) {
            Ok(value) => value,
            Err(err) => {
                warn!("Cannot read cleanup clock for tenant {tenant}: {err}");
                return;
            }
        };
        if now_millis() - last <= CLEANUP_INTERVAL_MILLIS {
            return;
        }

        if let Err(err) = self.clean_remote_duplicates(tenant).await {
            warn!("Remote duplicate cleanup failed for tenant {tenant}: {err}");
        }
        if let Err(err) = self
            .metadata
            .set_last_cleanup_timestamp(tenant, now_millis())
            .await
        {
            warn!("Cannot persist cleanup clock for tenant {tenant}: {err}");
        }
    }

    async fn clean_remote_duplicates(&self, tenant: &str) -> Result<()> {
        let collection = paths::students_collection(tenant);
        let docs = self.remote.download_collection(&collection, 0).await?;

        let mut by_name: HashMap<String, Vec<&RemoteDocument>> = HashMap::new();
        for doc in &docs {
            let name = doc
                .data
                .get("name")
                .and_then(|v| v.as_str())
                .map(|s| s.trim().to_lowercase())
                .unwrap_or_default();
            by_name.entry(name).or_default().push(doc);
        }

        for (name, group) in by_name {
            if group.len() < 2 {
                continue;
            }
            let Some(keep) = group.iter().max_by_key(|d| d.last_modified).map(|d| &d.id) else {
                continue;
            };
            debug!(
                "Collapsing {} duplicate remote students named '{name}' onto {keep}",
                group.len() - 1
            );
            for doc in &group {
                if &doc.id == keep {
                    continue;
                }
                self.remote
                    .delete(&paths::student_document(tenant, &doc.id))
                    .await?;
            }
        }
        Ok(())
    }
}
