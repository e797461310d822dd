//! Background scheduling of sync cycles.
//!
//! Models the platform job scheduler as a process-wide task queue keyed by
//! unique string names with an explicit enqueue policy: `immediate_sync` uses
//! Replace so rapid triggers collapse into one run, `periodic_sync` uses Keep
//! so re-registration preserves the original cadence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::auth::TenantAuth;
use crate::sync::engine::DataSynchronizer;

/// Unique name of the one-shot sync task.
pub const IMMEDIATE_SYNC_TASK: &str = "immediate_sync";

/// Unique name of the recurring sync task.
pub const PERIODIC_SYNC_TASK: &str = "periodic_sync";

/// Cadence of the recurring task.
pub const PERIODIC_SYNC_INTERVAL_SECS: u64 = 15 * 60;

/// Maximum jitter (seconds) added to each periodic tick.
pub const PERIODIC_SYNC_JITTER_SECS: u64 = 5;

/// What to do when a task with the same name is already queued or running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueuePolicy {
    /// Supersede the existing task; the new one uses the latest inputs.
    Replace,
    /// Leave the existing task untouched; the new request is a no-op.
    Keep,
}

/// The unit of work the scheduler runs.
#[async_trait]
pub trait SyncRunner: Send + Sync + 'static {
    async fn run_sync(&self);
}

/// Production runner: resolves the signed-in tenant and performs one cycle.
/// Running signed-out is a silent no-op — sync is a background process with
/// no user-facing errors.
pub struct SyncWorker {
    synchronizer: Arc<DataSynchronizer>,
    auth: Arc<dyn TenantAuth>,
}

impl SyncWorker {
    pub fn new(synchronizer: Arc<DataSynchronizer>, auth: Arc<dyn TenantAuth>) -> Self {
        Self { synchronizer, auth }
    }
}

#[async_trait]
impl SyncRunner for SyncWorker {
    async fn run_sync(&self) {
        let Some(tenant) = self.auth.current_tenant() else {
            debug!("Skipping sync: no tenant signed in");
            return;
        };
        if let Err(err) = self.synchronizer.perform_sync(&tenant).await {
            warn!("Sync cycle aborted for tenant {tenant}: {err}");
        }
    }
}

/// Schedules sync work on the tokio worker pool under unique task names.
/// Holds no synchronization state beyond task identity; all cycle state lives
/// in the sync metadata store.
pub struct SyncScheduler {
    runner: Arc<dyn SyncRunner>,
    periodic_interval: Duration,
    tasks: Mutex<HashMap<&'static str, JoinHandle<()>>>,
}

impl SyncScheduler {
    pub fn new(runner: Arc<dyn SyncRunner>) -> Self {
        Self {
            runner,
            periodic_interval: Duration::from_secs(PERIODIC_SYNC_INTERVAL_SECS),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Override the periodic cadence (tests).
    pub fn with_periodic_interval(mut self, interval: Duration) -> Self {
        self.periodic_interval = interval;
        self
    }

    /// Trigger a sync as soon as possible. Replace policy: a pending or
    /// running immediate task is superseded, so bursts of local mutations
    /// collapse into a single run.
    pub fn schedule_sync_now(&self) {
        let runner = Arc::clone(&self.runner);
        self.enqueue_unique(IMMEDIATE_SYNC_TASK, EnqueuePolicy::Replace, move || {
            tokio::spawn(async move {
                runner.run_sync().await;
            })
        });
    }

    /// Register the recurring background sync. Keep policy: re-registering
    /// while one is scheduled preserves the original period and phase.
    pub fn schedule_periodic_sync(&self) {
        let runner = Arc::clone(&self.runner);
        let interval = self.periodic_interval;
        self.enqueue_unique(PERIODIC_SYNC_TASK, EnqueuePolicy::Keep, move || {
            tokio::spawn(async move {
                loop {
                    let jitter =
                        rand::thread_rng().gen_range(0..=PERIODIC_SYNC_JITTER_SECS.max(1));
                    sleep(interval + Duration::from_secs(jitter)).await;
                    runner.run_sync().await;
                }
            })
        });
    }

    /// Cancel both named tasks. Used on logout and tenant switch.
    pub fn cancel_all_sync(&self) {
        let mut tasks = self.tasks.lock().expect("scheduler task table poisoned");
        for (name, handle) in tasks.drain() {
            debug!("Cancelling sync task '{name}'");
            handle.abort();
        }
    }

    /// Whether a task is currently queued or running under `name`.
    pub fn is_scheduled(&self, name: &str) -> bool {
        let tasks = self.tasks.lock().expect("scheduler task table poisoned");
        tasks
            .get(name)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    fn enqueue_unique<F>(&self, name: &'static str, policy: EnqueuePolicy, spawn: F)
    where
        F: FnOnce() -> JoinHandle<()>,
    {
        let mut tasks = self.tasks.lock().expect("scheduler task table poisoned");
        if let Some(existing) = tasks.get(name) {
            match policy {
                EnqueuePolicy::Keep if !existing.is_finished() => {
                    debug!("Sync task '{name}' already scheduled; keeping it");
                    return;
                }
                EnqueuePolicy::Keep => {}
                EnqueuePolicy::Replace => {
                    debug!("Replacing sync task '{name}'");
                    existing.abort();
                }
            }
        }
        tasks.insert(name, spawn());
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for (_, handle) in tasks.drain() {
                handle.abort();
            }
        }
    }
}
