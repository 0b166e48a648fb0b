//! Periodic job scheduler
//!
//! Drives the three monitoring jobs on independent timers. Each firing is
//! wrapped so a failure (error or panic) inside one job is caught, logged,
//! and counted without disturbing the other jobs or the process. `start`
//! is idempotent; `stop` cancels pending firings only, and a body already
//! executing runs to completion on its own.

pub mod cron;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{Error, Result};

pub use cron::CronExpr;

/// A scheduled job body. Failures surface as errors, never as unobserved
/// background-task panics.
pub type JobFn = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

struct JobDefinition {
    id: String,
    cron: CronExpr,
    body: JobFn,
}

/// Bookkeeping for one job, owned exclusively by the scheduler.
#[derive(Debug, Clone, Default)]
pub struct JobStatus {
    pub last_fired_at: Option<DateTime<Utc>>,
    pub runs: u64,
    pub failures: u64,
}

struct Inner {
    running: bool,
    stop_tx: Option<watch::Sender<bool>>,
    handles: Vec<JoinHandle<()>>,
}

/// Runs registered jobs on their cron schedules.
pub struct Scheduler {
    jobs: Vec<Arc<JobDefinition>>,
    inner: Arc<Mutex<Inner>>,
    status: Arc<Mutex<HashMap<String, JobStatus>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            inner: Arc::new(Mutex::new(Inner {
                running: false,
                stop_tx: None,
                handles: Vec::new(),
            })),
            status: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a job. Must be called before `start`.
    pub fn add_job(&mut self, id: impl Into<String>, cron_expr: &str, body: JobFn) -> Result<()> {
        let id = id.into();
        let cron = CronExpr::parse(cron_expr)?;
        if self.jobs.iter().any(|j| j.id == id) {
            return Err(Error::InvalidArgument(format!(
                "job '{}' registered twice",
                id
            )));
        }
        if let Ok(mut status) = self.status.lock() {
            status.insert(id.clone(), JobStatus::default());
        }
        self.jobs.push(Arc::new(JobDefinition { id, cron, body }));
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().map(|i| i.running).unwrap_or(false)
    }

    /// Number of live timer tasks. Zero when stopped.
    pub fn timer_count(&self) -> usize {
        self.inner.lock().map(|i| i.handles.len()).unwrap_or(0)
    }

    pub fn job_status(&self, id: &str) -> Option<JobStatus> {
        self.status.lock().ok().and_then(|s| s.get(id).cloned())
    }

    /// Start one timer task per job. Calling `start` while running is a
    /// no-op; it never creates duplicate timers.
    pub fn start(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.running {
            warn!("scheduler already running, start() ignored");
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut handles = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            info!(job = %job.id, cron = %job.cron.as_str(), "scheduling job");
            handles.push(tokio::spawn(run_loop(
                job.clone(),
                self.status.clone(),
                stop_rx.clone(),
            )));
        }

        inner.running = true;
        inner.stop_tx = Some(stop_tx);
        inner.handles = handles;
    }

    /// Cancel all pending timer firings. An in-flight job body runs to
    /// completion on its own; it is never interrupted.
    pub fn stop(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if !inner.running {
            return;
        }
        if let Some(stop_tx) = inner.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        inner.handles.clear();
        inner.running = false;
        info!("scheduler stopped; pending firings cancelled");
    }

    /// Run one job body immediately through the same isolation wrapper the
    /// timers use.
    pub async fn run_job_once(&self, id: &str) -> Result<()> {
        let job = self
            .jobs
            .iter()
            .find(|j| j.id == id)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown job '{}'", id)))?
            .clone();
        execute_firing(&job, &self.status).await;
        Ok(())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer loop for one job: sleep until the next cron match, fire, repeat.
async fn run_loop(
    job: Arc<JobDefinition>,
    status: Arc<Mutex<HashMap<String, JobStatus>>>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        let now = Utc::now();
        let next = job.cron.next_after(now);
        let delay = (next - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        tokio::select! {
            changed = stop_rx.changed() => {
                // stop signal, or the scheduler was dropped
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(delay) => {
                execute_firing(&job, &status).await;
            }
        }
    }
}

/// One isolated firing. Errors and panics are absorbed here so they can
/// never escape into another job's timer or the runtime.
async fn execute_firing(job: &JobDefinition, status: &Mutex<HashMap<String, JobStatus>>) {
    let fired_at = Utc::now();
    if let Ok(mut status) = status.lock() {
        if let Some(entry) = status.get_mut(&job.id) {
            entry.last_fired_at = Some(fired_at);
            entry.runs += 1;
        }
    }

    let outcome = std::panic::AssertUnwindSafe((job.body)()).catch_unwind().await;

    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(
            Error::Scheduler {
                job: job.id.clone(),
                message: e.to_string(),
            }
            .to_string(),
        ),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "job body panicked".to_string());
            Some(
                Error::Scheduler {
                    job: job.id.clone(),
                    message,
                }
                .to_string(),
            )
        }
    };

    if let Some(message) = failure {
        error!(job = %job.id, %message, "job firing failed");
        if let Ok(mut status) = status.lock() {
            if let Some(entry) = status.get_mut(&job.id) {
                entry.failures += 1;
            }
        }
    }
}
