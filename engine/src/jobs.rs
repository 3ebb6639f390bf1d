//! Background analysis jobs.
//!
//! The analysis pass runs outside the caller's request cycle: scheduling
//! returns a job id immediately and the pass itself runs on the blocking
//! thread pool. Workers report progress through an MPSC channel consumed by
//! `start_job_updater`; the terminal status is written directly by the
//! scheduling task once the blocking work joins, so the last writer wins if
//! a progress update races the completion.
//!
//! Re-analysis of one template serializes on a per-template guard, so a
//! second schedule for the same template waits for the first pass instead
//! of interleaving with it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, RwLock};

use common::jobs::JobStatus;
use common::model::field::Field;

use crate::analysis::analyze_template;
use crate::store::MappingStore;

/// Shared, clonable state of all background jobs.
#[derive(Clone)]
pub struct JobsState {
    /// Single source of truth for job statuses, keyed by job id.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,
    /// Sender workers use to report progress without write access to `jobs`.
    pub tx: mpsc::Sender<JobUpdate>,
    template_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

/// A status change reported by a background worker.
#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

impl JobsState {
    /// Creates the state and the receiver half for `start_job_updater`.
    pub fn new(buffer: usize) -> (JobsState, mpsc::Receiver<JobUpdate>) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            JobsState {
                jobs: Arc::new(RwLock::new(HashMap::new())),
                tx,
                template_locks: Arc::new(Mutex::new(HashMap::new())),
            },
            rx,
        )
    }

    pub async fn job_status(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.read().await.get(job_id).cloned()
    }

    async fn template_lock(&self, template_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.template_locks.lock().await;
        locks
            .entry(template_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the template's guard entry once no scheduled job holds a
    /// clone anymore (the map's reference plus the caller's is two).
    async fn release_template_lock(&self, template_id: &str) {
        let mut locks = self.template_locks.lock().await;
        if let Some(entry) = locks.get(template_id) {
            if Arc::strong_count(entry) <= 2 {
                locks.remove(template_id);
            }
        }
    }
}

/// Central updater task: drains `JobUpdate` messages into the shared map.
/// Spawn once, next to the state it serves.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let mut jobs = state.jobs.write().await;
        jobs.insert(update.job_id.clone(), update.status);
    }
}

/// Schedules an analysis pass for `template_id` and returns the job id.
///
/// The job starts as `Pending`, moves to `InProgress` once the worker picks
/// it up, and ends `Completed` with the serialized `TemplateAnalysis` as
/// payload, or `Failed` with the error text.
pub async fn schedule_analysis_job(
    state: &JobsState,
    store_path: PathBuf,
    template_id: String,
    catalog: Vec<Field>,
) -> String {
    let job_id = uuid::Uuid::new_v4().to_string();
    state
        .jobs
        .write()
        .await
        .insert(job_id.clone(), JobStatus::Pending);

    let tx = state.tx.clone();
    let guard = state.template_lock(&template_id).await;
    let job_for_task = job_id.clone();
    let state_for_task = state.clone();
    let template_key = template_id.clone();

    tokio::spawn(async move {
        let _serialized = guard.lock().await;

        let tx_block = tx.clone();
        let job_for_blocking = job_for_task.clone();
        let handle = tokio::task::spawn_blocking(move || {
            run_analysis_blocking(tx_block, job_for_blocking, store_path, template_id, catalog)
        });

        let status = match handle.await {
            Ok(Ok(payload)) => JobStatus::Completed(payload),
            Ok(Err(e)) => JobStatus::Failed(e),
            Err(join_err) => JobStatus::Failed(format!("join error: {join_err}")),
        };
        state_for_task
            .jobs
            .write()
            .await
            .insert(job_for_task, status);
        state_for_task.release_template_lock(&template_key).await;
    });

    job_id
}

fn run_analysis_blocking(
    tx: mpsc::Sender<JobUpdate>,
    job_id: String,
    store_path: PathBuf,
    template_id: String,
    catalog: Vec<Field>,
) -> Result<String, String> {
    let store = MappingStore::open(&store_path).map_err(|e| e.to_string())?;
    let template = store.get_template(&template_id).map_err(|e| e.to_string())?;
    let _ = tx.blocking_send(JobUpdate {
        job_id: job_id.clone(),
        status: JobStatus::InProgress(template.page_count),
    });

    let analysis = analyze_template(&store, &template_id, &catalog).map_err(|e| e.to_string())?;
    serde_json::to_string(&analysis).map_err(|e| e.to_string())
}
