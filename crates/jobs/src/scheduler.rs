//! Recurring job scheduler.
//!
//! Holds an in-memory *planned* projection (one entry per enabled job) kept
//! consistent with the persisted set, computes due jobs on each tick, and
//! submits their runners to the task engine at `Low` priority. The timer
//! loop only ticks — job logic always executes on the engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use corpora_engine::{
    EngineError, ErrorCallback, TaskContext, TaskEngine, TaskHandle, TaskPriority, TaskReport,
    TaskWork,
};

use crate::cron::{next_fire_time, parse_schedule};
use crate::error::JobError;
use crate::job::Job;
use crate::runner::{JobRunner, JobRunnerRegistry};
use crate::store::JobStore;

/// One armed job in the planned projection.
struct PlannedJob {
    job: Job,
    next_fire: DateTime<Utc>,
}

/// Task submitted to the engine when a job fires.
struct JobWork {
    name: String,
    runner: Arc<dyn JobRunner>,
    payload: String,
}

impl TaskWork for JobWork {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &TaskContext) -> Result<TaskReport, EngineError> {
        if ctx.cancel_requested() {
            return Err(EngineError::failed("job cancelled before it began"));
        }
        let started = Instant::now();
        let report = self
            .runner
            .run(&self.payload)
            .map_err(|e| EngineError::failed(e.to_string()))?;

        let mut task_report = TaskReport::new(&self.name, started.elapsed(), report.items_processed);
        if let Some(detail) = report.detail {
            task_report = task_report.with_detail(detail);
        }
        Ok(task_report)
    }
}

/// Cron-driven scheduler feeding the task engine.
///
/// The planned projection is mutated only under one scheduler-wide lock:
/// add/delete/enable/disable race with the timer thread's tick.
pub struct JobScheduler {
    planned: Mutex<HashMap<String, PlannedJob>>,
    in_flight: Mutex<HashMap<String, Arc<TaskHandle>>>,
    store: Arc<dyn JobStore>,
    runners: Arc<JobRunnerRegistry>,
    engine: Arc<TaskEngine>,
}

impl JobScheduler {
    pub fn new(
        store: Arc<dyn JobStore>,
        runners: Arc<JobRunnerRegistry>,
        engine: Arc<TaskEngine>,
    ) -> Self {
        Self {
            planned: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            store,
            runners,
            engine,
        }
    }

    /// Arm every enabled persisted job. Jobs with expressions that no
    /// longer parse are skipped with a warning rather than failing the
    /// whole startup. Returns the number armed.
    pub fn load(&self) -> usize {
        let now = Utc::now();
        let mut planned = self.planned.lock().unwrap();
        let mut armed = 0;
        for job in self.store.list() {
            if !job.enabled {
                continue;
            }
            match next_fire_time(&job.cron, now) {
                Ok(next_fire) => {
                    planned.insert(job.name.clone(), PlannedJob { job, next_fire });
                    armed += 1;
                }
                Err(e) => {
                    warn!(job = %job.name, error = %e, "skipping job with invalid schedule");
                }
            }
        }
        info!(armed, "job scheduler loaded");
        armed
    }

    /// Validate, persist, and (if enabled) arm a new job.
    pub fn add_job(&self, job: Job) -> Result<(), JobError> {
        parse_schedule(&job.cron)?;
        if !self.runners.contains(&job.runner) {
            // Not fatal: the runner may ship in a later deployment. The
            // fire loop logs loudly until then.
            warn!(job = %job.name, runner = %job.runner, "job references an unregistered runner");
        }

        self.store.insert(job.clone())?;
        if job.enabled {
            let next_fire = next_fire_time(&job.cron, Utc::now())?;
            info!(job = %job.name, %next_fire, "job armed");
            self.planned
                .lock()
                .unwrap()
                .insert(job.name.clone(), PlannedJob { job, next_fire });
        }
        Ok(())
    }

    /// Disarm and delete a job.
    pub fn delete_job(&self, name: &str) -> Result<(), JobError> {
        self.store.delete(name)?;
        self.planned.lock().unwrap().remove(name);
        self.in_flight.lock().unwrap().remove(name);
        info!(job = %name, "job deleted");
        Ok(())
    }

    /// Arm a previously disabled job.
    pub fn enable_job(&self, name: &str) -> Result<(), JobError> {
        self.store.set_enabled(name, true)?;
        let job = self
            .store
            .get(name)
            .ok_or_else(|| JobError::NotFound(name.to_string()))?;
        let next_fire = next_fire_time(&job.cron, Utc::now())?;
        let mut planned = self.planned.lock().unwrap();
        planned
            .entry(job.name.clone())
            .or_insert(PlannedJob { job, next_fire });
        info!(job = %name, "job enabled");
        Ok(())
    }

    /// Disarm a job without deleting it. With `cascade`, additionally
    /// best-effort-cancel any in-flight task submitted for it.
    pub fn disable_job(&self, name: &str, cascade: bool) -> Result<(), JobError> {
        self.store.set_enabled(name, false)?;
        self.planned.lock().unwrap().remove(name);
        if cascade {
            if let Some(handle) = self.in_flight.lock().unwrap().remove(name) {
                let prevented = self.engine.cancel(&handle);
                debug!(job = %name, prevented, "cascade-cancelled in-flight task");
            }
        }
        info!(job = %name, cascade, "job disabled");
        Ok(())
    }

    /// One scheduler pass: fire every due job and re-arm it from `now`, so
    /// windows missed during a pause collapse into a single immediate fire.
    /// Returns the number of tasks submitted.
    pub fn tick(&self, now: DateTime<Utc>) -> usize {
        self.in_flight
            .lock()
            .unwrap()
            .retain(|_, handle| !handle.state().is_terminal());

        let due: Vec<Job> = {
            let mut planned = self.planned.lock().unwrap();
            let mut due = Vec::new();
            let names: Vec<String> = planned
                .iter()
                .filter(|(_, entry)| entry.next_fire <= now)
                .map(|(name, _)| name.clone())
                .collect();
            for name in names {
                let Some(entry) = planned.get_mut(&name) else {
                    continue;
                };
                match next_fire_time(&entry.job.cron, now) {
                    Ok(next) => {
                        entry.next_fire = next;
                        due.push(entry.job.clone());
                    }
                    Err(e) => {
                        warn!(job = %name, error = %e, "disarming job with invalid schedule");
                        planned.remove(&name);
                    }
                }
            }
            due
        };

        let mut fired = 0;
        for job in due {
            let runner = match self.runners.get(&job.runner) {
                Ok(runner) => runner,
                Err(_) => {
                    // Left armed: it fires again next cycle, and succeeds
                    // once the runner is registered.
                    warn!(job = %job.name, runner = %job.runner, "no such job runner, leaving job armed");
                    continue;
                }
            };

            let work = Box::new(JobWork {
                name: format!("job:{}", job.name),
                runner,
                payload: job.payload.clone(),
            });
            let on_error: ErrorCallback = Box::new(|handle, error| {
                warn!(task = %handle.name(), error = %error, "job task failed");
            });

            match self
                .engine
                .submit_with_callbacks(work, TaskPriority::Low, None, Some(on_error))
            {
                Ok(handle) => {
                    debug!(job = %job.name, "job fired");
                    if let Err(e) = self.store.set_last_run(&job.name, now) {
                        warn!(job = %job.name, error = %e, "failed to stamp last run");
                    }
                    if let Some(entry) = self.planned.lock().unwrap().get_mut(&job.name) {
                        entry.job.last_run_at = Some(now);
                    }
                    if !handle.state().is_terminal() {
                        self.in_flight.lock().unwrap().insert(job.name.clone(), handle);
                    }
                    fired += 1;
                }
                Err(e) => {
                    // Engine disabled or shutting down; the job stays armed
                    // for its next window.
                    warn!(job = %job.name, error = %e, "could not submit job task");
                }
            }
        }
        fired
    }

    /// Number of armed jobs in the planned projection.
    pub fn planned_job_count(&self) -> usize {
        self.planned.lock().unwrap().len()
    }

    pub fn registered_runner_count(&self) -> usize {
        self.runners.len()
    }
}

/// Timer loop: tick the scheduler every `poll_interval`. Runs until the
/// surrounding task is aborted.
pub async fn run_scheduler_loop(scheduler: Arc<JobScheduler>, poll_interval: Duration) {
    info!("job scheduler started (poll interval: {}s)", poll_interval.as_secs());
    loop {
        tokio::time::sleep(poll_interval).await;
        let fired = scheduler.tick(Utc::now());
        if fired > 0 {
            debug!(fired, "scheduler tick submitted jobs");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use corpora_core::config::{EngineConfig, ExecutionMode};

    use crate::runner::JobReport;
    use crate::store::MemoryJobStore;

    struct CountingRunner {
        name: &'static str,
        count: Arc<AtomicUsize>,
    }

    impl JobRunner for CountingRunner {
        fn name(&self) -> &str {
            self.name
        }
        fn run(&self, _payload: &str) -> Result<JobReport, JobError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(JobReport::new(1))
        }
    }

    fn scheduler_with(
        runner_count: &Arc<AtomicUsize>,
        engine: Arc<TaskEngine>,
    ) -> (JobScheduler, Arc<MemoryJobStore>) {
        let store = Arc::new(MemoryJobStore::new());
        let runners = Arc::new(
            JobRunnerRegistry::builder()
                .register(Arc::new(CountingRunner {
                    name: "sweep",
                    count: Arc::clone(runner_count),
                }))
                .build()
                .unwrap(),
        );
        let scheduler = JobScheduler::new(Arc::clone(&store) as Arc<dyn JobStore>, runners, engine);
        (scheduler, store)
    }

    fn sync_scheduler(runner_count: &Arc<AtomicUsize>) -> (JobScheduler, Arc<MemoryJobStore>) {
        scheduler_with(runner_count, Arc::new(TaskEngine::synchronous()))
    }

    // -- planned-count bookkeeping -----------------------------------------

    #[test]
    fn add_job_arms_enabled_jobs_only() {
        let count = Arc::new(AtomicUsize::new(0));
        let (scheduler, _store) = sync_scheduler(&count);

        scheduler.add_job(Job::new("on", "sweep", "*/5 * * * *")).unwrap();
        assert_eq!(scheduler.planned_job_count(), 1);

        scheduler.add_job(Job::new("off", "sweep", "*/5 * * * *").disabled()).unwrap();
        assert_eq!(scheduler.planned_job_count(), 1);
    }

    #[test]
    fn planned_count_bookkeeping() {
        let count = Arc::new(AtomicUsize::new(0));
        let (scheduler, _store) = sync_scheduler(&count);

        scheduler.add_job(Job::new("a", "sweep", "*/5 * * * *")).unwrap();
        assert_eq!(scheduler.planned_job_count(), 1);

        scheduler.disable_job("a", false).unwrap();
        assert_eq!(scheduler.planned_job_count(), 0);

        scheduler.enable_job("a").unwrap();
        assert_eq!(scheduler.planned_job_count(), 1);

        // enabling an enabled job is idempotent
        scheduler.enable_job("a").unwrap();
        assert_eq!(scheduler.planned_job_count(), 1);

        scheduler.delete_job("a").unwrap();
        assert_eq!(scheduler.planned_job_count(), 0);

        assert!(matches!(scheduler.disable_job("a", false), Err(JobError::NotFound(_))));
        assert_eq!(scheduler.planned_job_count(), 0);
    }

    #[test]
    fn invalid_cron_is_rejected_before_persisting() {
        let count = Arc::new(AtomicUsize::new(0));
        let (scheduler, store) = sync_scheduler(&count);

        let result = scheduler.add_job(Job::new("bad", "sweep", "every tuesday"));
        assert!(matches!(result, Err(JobError::InvalidCron { .. })));
        assert!(store.get("bad").is_none());
        assert_eq!(scheduler.planned_job_count(), 0);
    }

    #[test]
    fn duplicate_job_name_is_rejected() {
        let count = Arc::new(AtomicUsize::new(0));
        let (scheduler, _store) = sync_scheduler(&count);

        scheduler.add_job(Job::new("dup", "sweep", "*/5 * * * *")).unwrap();
        let result = scheduler.add_job(Job::new("dup", "sweep", "*/5 * * * *"));
        assert!(matches!(result, Err(JobError::DuplicateJob(name)) if name == "dup"));
        assert_eq!(scheduler.planned_job_count(), 1);
    }

    // -- firing ------------------------------------------------------------

    #[test]
    fn due_job_fires_once_and_rearms() {
        let count = Arc::new(AtomicUsize::new(0));
        let (scheduler, store) = sync_scheduler(&count);
        scheduler.add_job(Job::new("sweep-job", "sweep", "*/5 * * * *")).unwrap();

        let later = Utc::now() + chrono::Duration::minutes(10);
        assert_eq!(scheduler.tick(later), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(store.get("sweep-job").unwrap().last_run_at, Some(later));

        // re-armed for the next window, not re-fired now
        assert_eq!(scheduler.planned_job_count(), 1);
        assert_eq!(scheduler.tick(later), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missed_windows_collapse_into_one_fire() {
        let count = Arc::new(AtomicUsize::new(0));
        let (scheduler, _store) = sync_scheduler(&count);
        scheduler.add_job(Job::new("minutely", "sweep", "* * * * *")).unwrap();

        // three days of missed windows fire exactly once
        let much_later = Utc::now() + chrono::Duration::days(3);
        assert_eq!(scheduler.tick(much_later), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn not_yet_due_job_does_not_fire() {
        let count = Arc::new(AtomicUsize::new(0));
        let (scheduler, _store) = sync_scheduler(&count);
        scheduler.add_job(Job::new("daily", "sweep", "0 3 * * *")).unwrap();

        assert_eq!(scheduler.tick(Utc::now()), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn disabled_job_never_fires() {
        let count = Arc::new(AtomicUsize::new(0));
        let (scheduler, _store) = sync_scheduler(&count);
        scheduler.add_job(Job::new("off", "sweep", "* * * * *").disabled()).unwrap();

        let later = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(scheduler.tick(later), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_runner_leaves_job_armed() {
        let count = Arc::new(AtomicUsize::new(0));
        let (scheduler, store) = sync_scheduler(&count);
        scheduler.add_job(Job::new("orphan", "ghost-runner", "* * * * *")).unwrap();

        let later = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(scheduler.tick(later), 0);

        // still armed for its next cycle, never permanently disabled
        assert_eq!(scheduler.planned_job_count(), 1);
        assert!(store.get("orphan").unwrap().last_run_at.is_none());
    }

    #[test]
    fn load_arms_enabled_jobs() {
        let count = Arc::new(AtomicUsize::new(0));
        let (scheduler, store) = sync_scheduler(&count);
        store.insert(Job::new("a", "sweep", "* * * * *")).unwrap();
        store.insert(Job::new("b", "sweep", "*/5 * * * *")).unwrap();
        store.insert(Job::new("c", "sweep", "* * * * *").disabled()).unwrap();

        assert_eq!(scheduler.load(), 2);
        assert_eq!(scheduler.planned_job_count(), 2);
    }

    #[test]
    fn registered_runner_count_exposed() {
        let count = Arc::new(AtomicUsize::new(0));
        let (scheduler, _store) = sync_scheduler(&count);
        assert_eq!(scheduler.registered_runner_count(), 1);
    }

    // -- cascade disable ---------------------------------------------------

    #[test]
    fn cascade_disable_cancels_queued_task() {
        let count = Arc::new(AtomicUsize::new(0));
        let engine = Arc::new(TaskEngine::new(&EngineConfig {
            mode: ExecutionMode::Asynchronous,
            worker_threads: 1,
        }));
        let (scheduler, _store) = scheduler_with(&count, Arc::clone(&engine));

        // Occupy the single worker so the job task stays queued.
        struct GatedWork(Arc<AtomicBool>);
        impl TaskWork for GatedWork {
            fn name(&self) -> &str {
                "filler"
            }
            fn run(&self, _ctx: &TaskContext) -> Result<TaskReport, EngineError> {
                while !self.0.load(Ordering::SeqCst) {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Ok(TaskReport::new("filler", Duration::ZERO, 0))
            }
        }
        let gate = Arc::new(AtomicBool::new(false));
        let filler = engine
            .submit(Box::new(GatedWork(Arc::clone(&gate))), TaskPriority::Asap)
            .unwrap();

        scheduler.add_job(Job::new("sweep-job", "sweep", "* * * * *")).unwrap();
        let later = Utc::now() + chrono::Duration::minutes(2);
        assert_eq!(scheduler.tick(later), 1);

        scheduler.disable_job("sweep-job", true).unwrap();

        gate.store(true, Ordering::SeqCst);
        use corpora_engine::TaskState;
        assert_eq!(filler.wait_terminal(Duration::from_secs(5)), TaskState::Completed);
        std::thread::sleep(Duration::from_millis(100));

        // The queued job task was cancelled before it could run.
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.planned_job_count(), 0);
    }
}
