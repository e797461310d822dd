//! Engine tests over in-memory stores.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::auth::TenantAuth;
use crate::errors::{Error, Result};
use crate::resources::{Resource, SharedResource};
use crate::schedules::{ExceptionKind, Schedule, ScheduleException};
use crate::students::Student;
use crate::sync::*;

const TENANT: &str = "p1";

fn value_matches(value: &serde_json::Value, key: &str) -> bool {
    match value {
        serde_json::Value::String(s) => s == key,
        serde_json::Value::Number(n) => n.to_string() == key,
        _ => false,
    }
}

fn body_last_modified(data: &serde_json::Value) -> i64 {
    data.get("lastModified").and_then(|v| v.as_i64()).unwrap_or(0)
}

// ── In-memory local stores ──────────────────────────────────────────────────

struct MemoryStore<T: SyncRecord> {
    records: Mutex<Vec<T>>,
    next_id: AtomicI64,
}

impl<T: SyncRecord> MemoryStore<T> {
    fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn insert_or_replace(&self, mut record: T) -> T {
        if record.local_id() == 0 {
            record.set_local_id(self.next_id.fetch_add(1, Ordering::SeqCst));
        }
        let mut records = self.records.lock().unwrap();
        records.retain(|r| r.local_id() != record.local_id());
        records.push(record.clone());
        record
    }

    fn remove(&self, local_id: i64) {
        self.records
            .lock()
            .unwrap()
            .retain(|r| r.local_id() != local_id);
    }

    fn snapshot(&self) -> Vec<T> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl<T: SyncRecord> LocalRecordStore<T> for MemoryStore<T> {
    fn find_by_status(&self, tenant: &str, status: SyncStatus) -> Result<Vec<T>> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|r| r.tenant_id() == tenant && r.sync_status() == status)
            .collect())
    }

    fn find_modified_since(&self, tenant: &str, since: i64) -> Result<Vec<T>> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|r| r.tenant_id() == tenant && r.last_modified() > since)
            .collect())
    }

    fn find_by_cloud_id(&self, tenant: &str, cloud_id: &str) -> Result<Option<T>> {
        Ok(self
            .snapshot()
            .into_iter()
            .find(|r| r.tenant_id() == tenant && r.cloud_id() == Some(cloud_id)))
    }

    fn find_by_local_id(&self, tenant: &str, local_id: i64) -> Result<Option<T>> {
        Ok(self
            .snapshot()
            .into_iter()
            .find(|r| r.tenant_id() == tenant && r.local_id() == local_id))
    }

    fn list_all(&self, tenant: &str) -> Result<Vec<T>> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|r| r.tenant_id() == tenant)
            .collect())
    }

    async fn upsert(&self, record: T) -> Result<T> {
        Ok(self.insert_or_replace(record))
    }

    async fn hard_delete(&self, local_id: i64) -> Result<()> {
        self.remove(local_id);
        Ok(())
    }
}

/// Student store that cascades a hard delete onto the child stores, the way
/// the SQLite layer's foreign keys do.
struct CascadingStudentStore {
    inner: MemoryStore<Student>,
    schedules: Arc<MemoryStore<Schedule>>,
    exceptions: Arc<MemoryStore<ScheduleException>>,
    shared: Arc<MemoryStore<SharedResource>>,
}

#[async_trait]
impl LocalRecordStore<Student> for CascadingStudentStore {
    fn find_by_status(&self, tenant: &str, status: SyncStatus) -> Result<Vec<Student>> {
        self.inner.find_by_status(tenant, status)
    }

    fn find_modified_since(&self, tenant: &str, since: i64) -> Result<Vec<Student>> {
        self.inner.find_modified_since(tenant, since)
    }

    fn find_by_cloud_id(&self, tenant: &str, cloud_id: &str) -> Result<Option<Student>> {
        self.inner.find_by_cloud_id(tenant, cloud_id)
    }

    fn find_by_local_id(&self, tenant: &str, local_id: i64) -> Result<Option<Student>> {
        self.inner.find_by_local_id(tenant, local_id)
    }

    fn list_all(&self, tenant: &str) -> Result<Vec<Student>> {
        self.inner.list_all(tenant)
    }

    async fn upsert(&self, record: Student) -> Result<Student> {
        Ok(self.inner.insert_or_replace(record))
    }

    async fn hard_delete(&self, local_id: i64) -> Result<()> {
        self.inner.remove(local_id);
        self.schedules
            .records
            .lock()
            .unwrap()
            .retain(|s| s.student_id != local_id);
        self.exceptions
            .records
            .lock()
            .unwrap()
            .retain(|e| e.student_id != local_id);
        self.shared
            .records
            .lock()
            .unwrap()
            .retain(|s| s.student_id != local_id);
        Ok(())
    }
}

// ── In-memory remote store ──────────────────────────────────────────────────

#[derive(Default)]
struct MemoryRemote {
    collections: Mutex<HashMap<String, Vec<RemoteDocument>>>,
    next_id: AtomicI64,
    upload_calls: AtomicUsize,
    /// Uploads whose body `name` equals this fail with a 503.
    fail_upload_named: Mutex<Option<String>>,
    fail_subtree_delete: AtomicBool,
    upload_delay: Mutex<Option<Duration>>,
}

impl MemoryRemote {
    fn seed(&self, collection: &str, id: &str, data: serde_json::Value) {
        let doc = RemoteDocument {
            id: id.to_string(),
            last_modified: body_last_modified(&data),
            data,
        };
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .push(doc);
    }

    fn docs(&self, collection: &str) -> Vec<RemoteDocument> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn upload(
        &self,
        collection: &str,
        document_id: Option<&str>,
        data: serde_json::Value,
        idempotency: Option<IdempotencyProbe>,
    ) -> Result<String> {
        if let Some(delay) = *self.upload_delay.lock().unwrap() {
            tokio::time::sleep(delay).await;
        }
        self.upload_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(failing) = self.fail_upload_named.lock().unwrap().as_deref() {
            if data.get("name").and_then(|v| v.as_str()) == Some(failing) {
                return Err(Error::remote(503, "remote unavailable"));
            }
        }

        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();

        let id = match document_id {
            Some(id) => id.to_string(),
            None => {
                let probed = idempotency.as_ref().and_then(|probe| {
                    docs.iter()
                        .find(|d| {
                            d.data
                                .get(probe.field)
                                .map(|v| value_matches(v, &probe.key))
                                .unwrap_or(false)
                        })
                        .map(|d| d.id.clone())
                });
                probed.unwrap_or_else(|| format!("d{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
            }
        };

        docs.retain(|d| d.id != id);
        docs.push(RemoteDocument {
            id: id.clone(),
            last_modified: body_last_modified(&data),
            data,
        });
        Ok(id)
    }

    async fn delete(&self, document_path: &str) -> Result<()> {
        let (collection, id) = document_path
            .rsplit_once('/')
            .ok_or_else(|| Error::Validation(format!("bad path {document_path}")))?;
        if let Some(docs) = self.collections.lock().unwrap().get_mut(collection) {
            docs.retain(|d| d.id != id);
        }
        Ok(())
    }

    async fn download_collection(
        &self,
        collection: &str,
        since: i64,
    ) -> Result<Vec<RemoteDocument>> {
        Ok(self
            .docs(collection)
            .into_iter()
            .filter(|d| d.last_modified > since)
            .collect())
    }

    async fn delete_subtree(&self, tenant: &str, student_cloud_id: &str) -> Result<()> {
        if self.fail_subtree_delete.load(Ordering::SeqCst) {
            return Err(Error::remote(503, "remote unavailable"));
        }
        let doc_path = format!("tenants/{tenant}/students/{student_cloud_id}");
        let subtree_prefix = format!("{doc_path}/");
        let mut collections = self.collections.lock().unwrap();
        collections.retain(|name, _| !name.starts_with(&subtree_prefix));
        if let Some(students) = collections.get_mut(&format!("tenants/{tenant}/students")) {
            students.retain(|d| d.id != student_cloud_id);
        }
        Ok(())
    }
}

// ── In-memory metadata + auth ───────────────────────────────────────────────

#[derive(Default)]
struct MemoryMetadata {
    watermarks: Mutex<HashMap<String, i64>>,
    flags: Mutex<HashMap<String, SyncFlag>>,
    cleanups: Mutex<HashMap<String, i64>>,
}

impl MemoryMetadata {
    fn force_flag(&self, tenant: &str, in_progress: bool, updated_at: i64) {
        self.flags.lock().unwrap().insert(
            tenant.to_string(),
            SyncFlag {
                in_progress,
                updated_at,
            },
        );
    }
}

#[async_trait]
impl SyncMetadataStore for MemoryMetadata {
    fn last_sync_timestamp(&self, tenant: &str) -> Result<i64> {
        Ok(*self.watermarks.lock().unwrap().get(tenant).unwrap_or(&0))
    }

    async fn set_last_sync_timestamp(&self, tenant: &str, timestamp: i64) -> Result<()> {
        self.watermarks
            .lock()
            .unwrap()
            .insert(tenant.to_string(), timestamp);
        Ok(())
    }

    fn sync_in_progress(&self, tenant: &str) -> Result<Option<SyncFlag>> {
        Ok(self.flags.lock().unwrap().get(tenant).copied())
    }

    async fn set_sync_in_progress(&self, tenant: &str, in_progress: bool) -> Result<()> {
        self.force_flag(tenant, in_progress, now_millis());
        Ok(())
    }

    fn last_cleanup_timestamp(&self, tenant: &str) -> Result<i64> {
        Ok(*self.cleanups.lock().unwrap().get(tenant).unwrap_or(&0))
    }

    async fn set_last_cleanup_timestamp(&self, tenant: &str, timestamp: i64) -> Result<()> {
        self.cleanups
            .lock()
            .unwrap()
            .insert(tenant.to_string(), timestamp);
        Ok(())
    }

    async fn clear_tenant(&self, tenant: &str) -> Result<()> {
        self.watermarks.lock().unwrap().remove(tenant);
        self.flags.lock().unwrap().remove(tenant);
        self.cleanups.lock().unwrap().remove(tenant);
        Ok(())
    }
}

/// Auth stub whose tenant disappears after a set number of checks, for
/// mid-cycle sign-out tests. A negative count means unlimited.
struct CountdownAuth {
    tenant: Mutex<Option<String>>,
    remaining_checks: AtomicI64,
}

impl CountdownAuth {
    fn unlimited(tenant: &str) -> Self {
        Self {
            tenant: Mutex::new(Some(tenant.to_string())),
            remaining_checks: AtomicI64::new(-1),
        }
    }

    fn expiring(tenant: &str, checks: i64) -> Self {
        Self {
            tenant: Mutex::new(Some(tenant.to_string())),
            remaining_checks: AtomicI64::new(checks),
        }
    }
}

impl TenantAuth for CountdownAuth {
    fn current_tenant(&self) -> Option<String> {
        let remaining = self.remaining_checks.load(Ordering::SeqCst);
        if remaining == 0 {
            return None;
        }
        if remaining > 0 {
            self.remaining_checks.fetch_sub(1, Ordering::SeqCst);
        }
        self.tenant.lock().unwrap().clone()
    }

    fn access_token(&self) -> Option<String> {
        Some("token".to_string())
    }
}

// ── Harness ─────────────────────────────────────────────────────────────────

struct TestEnv {
    students: Arc<CascadingStudentStore>,
    schedules: Arc<MemoryStore<Schedule>>,
    exceptions: Arc<MemoryStore<ScheduleException>>,
    resources: Arc<MemoryStore<Resource>>,
    shared: Arc<MemoryStore<SharedResource>>,
    remote: Arc<MemoryRemote>,
    metadata: Arc<MemoryMetadata>,
    sync: DataSynchronizer,
}

impl TestEnv {
    fn with_auth(auth: Arc<dyn TenantAuth>) -> Self {
        let schedules = Arc::new(MemoryStore::<Schedule>::new());
        let exceptions = Arc::new(MemoryStore::new());
        let resources = Arc::new(MemoryStore::new());
        let shared = Arc::new(MemoryStore::new());
        let students = Arc::new(CascadingStudentStore {
            inner: MemoryStore::new(),
            schedules: Arc::clone(&schedules),
            exceptions: Arc::clone(&exceptions),
            shared: Arc::clone(&shared),
        });
        let remote = Arc::new(MemoryRemote::default());
        let metadata = Arc::new(MemoryMetadata::default());
        // Cleanup has its own tests; keep it quiet elsewhere.
        metadata
            .cleanups
            .lock()
            .unwrap()
            .insert(TENANT.to_string(), now_millis());

        let sync = DataSynchronizer::new(
            Arc::clone(&students) as Arc<dyn LocalRecordStore<Student>>,
            Arc::clone(&schedules) as Arc<dyn LocalRecordStore<Schedule>>,
            Arc::clone(&exceptions) as Arc<dyn LocalRecordStore<ScheduleException>>,
            Arc::clone(&resources) as Arc<dyn LocalRecordStore<Resource>>,
            Arc::clone(&shared) as Arc<dyn LocalRecordStore<SharedResource>>,
            Arc::clone(&remote) as Arc<dyn RemoteStore>,
            Arc::clone(&metadata) as Arc<dyn SyncMetadataStore>,
            auth,
        );

        Self {
            students,
            schedules,
            exceptions,
            resources,
            shared,
            remote,
            metadata,
            sync,
        }
    }

    fn new() -> Self {
        Self::with_auth(Arc::new(CountdownAuth::unlimited(TENANT)))
    }

    fn seed_student(&self, name: &str, cloud_id: Option<&str>, status: SyncStatus) -> Student {
        let mut student = Student::new(TENANT, name);
        student.cloud_id = cloud_id.map(str::to_string);
        student.sync_status = status;
        student.pending_delete = status == SyncStatus::PendingDelete;
        self.students.inner.insert_or_replace(student)
    }

    fn student_by_name(&self, name: &str) -> Option<Student> {
        self.students
            .inner
            .snapshot()
            .into_iter()
            .find(|s| s.name == name)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn push_assigns_cloud_id_and_marks_synced() {
    let env = TestEnv::new();
    env.seed_student("Ana", None, SyncStatus::PendingUpload);

    let outcome = env.sync.perform_sync(TENANT).await.unwrap();
    assert_eq!(outcome.status, SyncCycleStatus::Completed);
    assert_eq!(outcome.pushed, 1);

    let ana = env.student_by_name("Ana").unwrap();
    assert_eq!(ana.sync_status, SyncStatus::Synced);
    let cloud_id = ana.cloud_id.expect("cloud id assigned");

    let remote_docs = env.remote.docs("tenants/p1/students");
    assert_eq!(remote_docs.len(), 1);
    assert_eq!(remote_docs[0].id, cloud_id);
    assert_eq!(
        remote_docs[0].data.get("name").and_then(|v| v.as_str()),
        Some("Ana")
    );
}

#[tokio::test]
async fn retried_first_upload_adopts_existing_remote_document() {
    let env = TestEnv::new();
    // A previous run created the document but crashed before persisting the
    // cloud id locally.
    env.remote.seed(
        "tenants/p1/students",
        "s1",
        serde_json::json!({ "name": "Ana", "lastModified": 1_000 }),
    );
    let mut ana = Student::new(TENANT, "Ana");
    ana.last_modified_timestamp = 1_000;
    env.students.inner.insert_or_replace(ana);

    env.sync.perform_sync(TENANT).await.unwrap();

    let ana = env.student_by_name("Ana").unwrap();
    assert_eq!(ana.cloud_id.as_deref(), Some("s1"));
    assert_eq!(ana.sync_status, SyncStatus::Synced);
    assert_eq!(env.remote.docs("tenants/p1/students").len(), 1);
}

#[tokio::test]
async fn one_failing_record_does_not_block_the_batch() {
    let env = TestEnv::new();
    env.seed_student("Ana", None, SyncStatus::PendingUpload);
    env.seed_student("Bad", None, SyncStatus::PendingUpload);
    *env.remote.fail_upload_named.lock().unwrap() = Some("Bad".to_string());

    env.sync.perform_sync(TENANT).await.unwrap();
    assert_eq!(
        env.student_by_name("Ana").unwrap().sync_status,
        SyncStatus::Synced
    );
    assert_eq!(
        env.student_by_name("Bad").unwrap().sync_status,
        SyncStatus::Error
    );

    // The failed record retries on the next cycle once the store recovers.
    *env.remote.fail_upload_named.lock().unwrap() = None;
    env.sync.perform_sync(TENANT).await.unwrap();
    let bad = env.student_by_name("Bad").unwrap();
    assert_eq!(bad.sync_status, SyncStatus::Synced);
    assert!(bad.cloud_id.is_some());
}

#[tokio::test]
async fn pending_delete_converges_and_erases_the_subtree() {
    let env = TestEnv::new();
    let student = env.seed_student("Ana", Some("s1"), SyncStatus::PendingDelete);

    let mut schedule = Schedule::new(TENANT, student.id, 2);
    schedule.cloud_id = Some("sch1".to_string());
    schedule.sync_status = SyncStatus::Synced;
    env.schedules.insert_or_replace(schedule);

    env.remote.seed(
        "tenants/p1/students",
        "s1",
        serde_json::json!({ "name": "Ana", "lastModified": 10 }),
    );
    env.remote.seed(
        "tenants/p1/students/s1/schedules",
        "sch1",
        serde_json::json!({ "localId": 1, "dayOfWeek": 2, "startTime": "16:00", "endTime": "17:00", "lastModified": 10 }),
    );

    let outcome = env.sync.perform_sync(TENANT).await.unwrap();
    assert_eq!(outcome.deleted, 1);

    assert!(env.students.inner.snapshot().is_empty());
    assert!(env.schedules.snapshot().is_empty());
    assert!(env.remote.docs("tenants/p1/students").is_empty());
    assert!(env.remote.docs("tenants/p1/students/s1/schedules").is_empty());
}

#[tokio::test]
async fn failed_remote_delete_keeps_the_record_for_retry() {
    let env = TestEnv::new();
    env.seed_student("Ana", Some("s1"), SyncStatus::PendingDelete);
    env.remote.seed(
        "tenants/p1/students",
        "s1",
        serde_json::json!({ "name": "Ana", "lastModified": 10 }),
    );
    env.remote.fail_subtree_delete.store(true, Ordering::SeqCst);

    env.sync.perform_sync(TENANT).await.unwrap();
    let ana = env.student_by_name("Ana").unwrap();
    assert_eq!(ana.sync_status, SyncStatus::PendingDelete);
    assert!(ana.pending_delete);

    // Pull must not resurrect a record awaiting deletion.
    assert!(env.student_by_name("Ana").unwrap().pending_delete);

    env.remote.fail_subtree_delete.store(false, Ordering::SeqCst);
    env.sync.perform_sync(TENANT).await.unwrap();
    assert!(env.students.inner.snapshot().is_empty());
    assert!(env.remote.docs("tenants/p1/students").is_empty());
}

#[tokio::test]
async fn child_records_push_after_their_parent_in_the_same_cycle() {
    let env = TestEnv::new();
    let student = env.seed_student("Ana", None, SyncStatus::PendingUpload);
    env.schedules
        .insert_or_replace(Schedule::new(TENANT, student.id, 3));

    env.sync.perform_sync(TENANT).await.unwrap();

    let ana = env.student_by_name("Ana").unwrap();
    let student_cloud = ana.cloud_id.expect("student uploaded");
    let schedule = &env.schedules.snapshot()[0];
    assert_eq!(schedule.sync_status, SyncStatus::Synced);
    assert!(schedule.cloud_id.is_some());

    let child_collection = format!("tenants/p1/students/{student_cloud}/schedules");
    assert_eq!(env.remote.docs(&child_collection).len(), 1);
}

#[tokio::test]
async fn pull_inserts_unknown_documents_and_overwrites_clean_ones() {
    let env = TestEnv::new();
    let mut existing = Student::new(TENANT, "Marco stale");
    existing.cloud_id = Some("s2".to_string());
    existing.sync_status = SyncStatus::Synced;
    existing.last_modified_timestamp = 100;
    env.students.inner.insert_or_replace(existing);

    env.remote.seed(
        "tenants/p1/students",
        "s1",
        serde_json::json!({ "name": "Ana", "lastModified": 500 }),
    );
    env.remote.seed(
        "tenants/p1/students",
        "s2",
        serde_json::json!({ "name": "Marco", "lastModified": 900 }),
    );

    let outcome = env.sync.perform_sync(TENANT).await.unwrap();
    assert_eq!(outcome.pulled, 2);

    let ana = env.student_by_name("Ana").unwrap();
    assert_eq!(ana.sync_status, SyncStatus::Synced);
    assert_eq!(ana.cloud_id.as_deref(), Some("s1"));

    let marco = env.student_by_name("Marco").unwrap();
    assert_eq!(marco.last_modified_timestamp, 900);

    // Watermark commits the max server timestamp observed.
    assert_eq!(env.metadata.last_sync_timestamp(TENANT).unwrap(), 900);

    // The next pull is incremental: nothing newer, nothing pulled.
    let outcome = env.sync.perform_sync(TENANT).await.unwrap();
    assert_eq!(outcome.pulled, 0);
}

#[tokio::test]
async fn conflict_keeps_newer_local_edit_and_requeues_it() {
    let env = TestEnv::new();
    let mut local = Student::new(TENANT, "Bad");
    local.cloud_id = Some("s1".to_string());
    local.sync_status = SyncStatus::PendingUpload;
    local.last_modified_timestamp = 3_000;
    env.students.inner.insert_or_replace(local);

    // Keep the record dirty through the push phase.
    *env.remote.fail_upload_named.lock().unwrap() = Some("Bad".to_string());
    env.remote.seed(
        "tenants/p1/students",
        "s1",
        serde_json::json!({ "name": "Bad remote", "lastModified": 2_000 }),
    );

    env.sync.perform_sync(TENANT).await.unwrap();

    let local = env.student_by_name("Bad").expect("local edit kept");
    assert_eq!(local.sync_status, SyncStatus::PendingUpload);
    assert_eq!(local.last_modified_timestamp, 3_000);
}

#[tokio::test]
async fn conflict_prefers_newer_remote_version() {
    let env = TestEnv::new();
    let mut local = Student::new(TENANT, "Bad");
    local.cloud_id = Some("s1".to_string());
    local.sync_status = SyncStatus::PendingUpload;
    local.last_modified_timestamp = 1_000;
    env.students.inner.insert_or_replace(local);

    *env.remote.fail_upload_named.lock().unwrap() = Some("Bad".to_string());
    env.remote.seed(
        "tenants/p1/students",
        "s1",
        serde_json::json!({ "name": "Bad remote", "lastModified": 2_000 }),
    );

    env.sync.perform_sync(TENANT).await.unwrap();

    assert!(env.student_by_name("Bad").is_none());
    let remote_won = env.student_by_name("Bad remote").unwrap();
    assert_eq!(remote_won.sync_status, SyncStatus::Synced);
    assert_eq!(remote_won.cloud_id.as_deref(), Some("s1"));
    assert_eq!(env.students.inner.snapshot().len(), 1);
}

#[tokio::test]
async fn concurrent_cycles_collapse_to_one() {
    let env = TestEnv::new();
    env.seed_student("Ana", None, SyncStatus::PendingUpload);
    *env.remote.upload_delay.lock().unwrap() = Some(Duration::from_millis(50));

    let (first, second) = tokio::join!(
        env.sync.perform_sync(TENANT),
        env.sync.perform_sync(TENANT)
    );
    let statuses = [first.unwrap().status, second.unwrap().status];
    assert!(statuses.contains(&SyncCycleStatus::Completed));
    assert!(statuses.contains(&SyncCycleStatus::AlreadyRunning));
    assert_eq!(env.remote.upload_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fresh_in_progress_flag_skips_the_cycle() {
    let env = TestEnv::new();
    env.seed_student("Ana", None, SyncStatus::PendingUpload);
    env.metadata.force_flag(TENANT, true, now_millis());

    let outcome = env.sync.perform_sync(TENANT).await.unwrap();
    assert_eq!(outcome.status, SyncCycleStatus::AlreadyRunning);
    assert_eq!(env.remote.upload_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        env.student_by_name("Ana").unwrap().sync_status,
        SyncStatus::PendingUpload
    );
}

#[tokio::test]
async fn stale_in_progress_flag_is_overridden() {
    let env = TestEnv::new();
    env.seed_student("Ana", None, SyncStatus::PendingUpload);
    env.metadata
        .force_flag(TENANT, true, now_millis() - STALE_SYNC_FLAG_MILLIS - 1_000);

    let outcome = env.sync.perform_sync(TENANT).await.unwrap();
    assert_eq!(outcome.status, SyncCycleStatus::Completed);
    assert_eq!(
        env.student_by_name("Ana").unwrap().sync_status,
        SyncStatus::Synced
    );
    // Flag released at the end of the takeover cycle.
    let flag = env.metadata.sync_in_progress(TENANT).unwrap().unwrap();
    assert!(!flag.in_progress);
}

#[tokio::test]
async fn losing_auth_mid_cycle_keeps_partial_progress_and_releases_the_lock() {
    let auth = Arc::new(CountdownAuth::expiring(TENANT, 1));
    let env = TestEnv::with_auth(auth);
    let student = env.seed_student("Ana", None, SyncStatus::PendingUpload);
    env.schedules
        .insert_or_replace(Schedule::new(TENANT, student.id, 3));

    let err = env.sync.perform_sync(TENANT).await.unwrap_err();
    assert!(matches!(err, Error::Unauthenticated));

    // The first collection was pushed before the sign-out was noticed.
    assert_eq!(
        env.student_by_name("Ana").unwrap().sync_status,
        SyncStatus::Synced
    );
    assert_eq!(
        env.schedules.snapshot()[0].sync_status,
        SyncStatus::PendingUpload
    );
    let flag = env.metadata.sync_in_progress(TENANT).unwrap().unwrap();
    assert!(!flag.in_progress);
}

#[tokio::test]
async fn remote_duplicate_cleanup_keeps_the_newest_per_name() {
    let env = TestEnv::new();
    env.metadata.cleanups.lock().unwrap().clear();
    env.remote.seed(
        "tenants/p1/students",
        "old",
        serde_json::json!({ "name": " Ana ", "lastModified": 100 }),
    );
    env.remote.seed(
        "tenants/p1/students",
        "new",
        serde_json::json!({ "name": "ana", "lastModified": 200 }),
    );

    env.sync.perform_sync(TENANT).await.unwrap();

    let remaining = env.remote.docs("tenants/p1/students");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "new");
    assert!(env.metadata.last_cleanup_timestamp(TENANT).unwrap() > 0);
}

#[tokio::test]
async fn every_collection_pushes_through_its_tenant_scoped_path() {
    let env = TestEnv::new();
    let student = env.seed_student("Ana", Some("s1"), SyncStatus::Synced);
    let mut schedule = Schedule::new(TENANT, student.id, 2);
    schedule.cloud_id = Some("sch1".to_string());
    schedule.sync_status = SyncStatus::Synced;
    let schedule = env.schedules.insert_or_replace(schedule);

    env.exceptions.insert_or_replace(ScheduleException::new(
        TENANT,
        student.id,
        schedule.id,
        1_700_000_000_000,
        ExceptionKind::Cancelled,
    ));
    env.resources
        .insert_or_replace(Resource::new(TENANT, "Fractions worksheet"));
    env.shared
        .insert_or_replace(SharedResource::new(TENANT, student.id, "notes.pdf"));

    env.sync.perform_sync(TENANT).await.unwrap();

    assert_eq!(
        env.remote
            .docs("tenants/p1/students/s1/schedules/sch1/exceptions")
            .len(),
        1
    );
    assert_eq!(env.remote.docs("tenants/p1/resources").len(), 1);
    assert_eq!(
        env.remote
            .docs("tenants/p1/students/s1/shared_resources")
            .len(),
        1
    );
    assert_eq!(
        env.exceptions.snapshot()[0].sync_status,
        SyncStatus::Synced
    );
    assert_eq!(env.resources.snapshot()[0].sync_status, SyncStatus::Synced);
    assert_eq!(env.shared.snapshot()[0].sync_status, SyncStatus::Synced);
}

#[tokio::test]
async fn pull_adopts_local_twin_instead_of_duplicating() {
    let env = TestEnv::new();
    let mut local = Student::new(TENANT, "Ana");
    local.last_modified_timestamp = 1_000;
    env.students.inner.insert_or_replace(local);
    // Push cannot run for this record, so adoption happens on pull.
    *env.remote.fail_upload_named.lock().unwrap() = Some("Ana".to_string());

    env.remote.seed(
        "tenants/p1/students",
        "s9",
        serde_json::json!({ "name": " ana ", "lastModified": 2_000 }),
    );

    env.sync.perform_sync(TENANT).await.unwrap();

    let students = env.students.inner.snapshot();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].cloud_id.as_deref(), Some("s9"));
    assert_eq!(students[0].sync_status, SyncStatus::Synced);
}
