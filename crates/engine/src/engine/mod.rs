//! The priority task engine.
//!
//! Tasks are ordered `Asap` before `Low`, FIFO within a class. Two
//! operating modes, selected by [`EngineConfig`]: synchronous (the caller's
//! thread runs the task inline — deterministic, used by tests and
//! single-tenant deployments) and asynchronous (a dispatcher thread feeds a
//! bounded `rayon` worker pool). Task failures are wrapped into the uniform
//! [`EngineError::TaskFailed`] envelope and delivered via the error
//! callback; they never propagate to the submitter or take down a worker.

mod dispatch;


use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread::JoinHandle;

use tracing::{debug, info};

use corpora_core::config::{EngineConfig, ExecutionMode};

use crate::error::EngineError;
use crate::metrics::EngineMetrics;
use crate::queue::{CompletionCallback, ErrorCallback, QueuedTask, TaskQueue};
use crate::task::{TaskHandle, TaskPriority, TaskWork};

pub(crate) struct EngineShared {
    pub(crate) queue: Mutex<TaskQueue>,
    pub(crate) ready: Condvar,
    pub(crate) enabled: AtomicBool,
    pub(crate) shutdown: AtomicBool,
    pub(crate) active_workers: AtomicUsize,
    pub(crate) metrics: RwLock<EngineMetrics>,
    pub(crate) workers: usize,
}

/// Priority-ordered task executor. See the module docs for the contract.
pub struct TaskEngine {
    mode: ExecutionMode,
    shared: Arc<EngineShared>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl TaskEngine {
    /// Build an engine. In asynchronous mode this starts the dispatcher
    /// thread and its worker pool immediately.
    pub fn new(config: &EngineConfig) -> Self {
        let workers = config.resolved_worker_threads();
        let shared = Arc::new(EngineShared {
            queue: Mutex::new(TaskQueue::new()),
            ready: Condvar::new(),
            enabled: AtomicBool::new(true),
            shutdown: AtomicBool::new(false),
            active_workers: AtomicUsize::new(0),
            metrics: RwLock::new(EngineMetrics::default()),
            workers,
        });

        let dispatcher = match config.mode {
            ExecutionMode::Synchronous => None,
            ExecutionMode::Asynchronous => {
                info!("task engine starting with {} workers", workers);
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(|i| format!("engine-worker-{i}"))
                    .build()
                    .expect("failed to build engine worker pool");
                let loop_shared = Arc::clone(&shared);
                let handle = std::thread::Builder::new()
                    .name("engine-dispatch".to_string())
                    .spawn(move || dispatch::dispatcher_loop(loop_shared, pool))
                    .expect("failed to spawn engine dispatcher");
                Some(handle)
            }
        };

        Self {
            mode: config.mode,
            shared,
            dispatcher: Mutex::new(dispatcher),
        }
    }

    /// Convenience constructor for the deterministic inline mode.
    pub fn synchronous() -> Self {
        Self::new(&EngineConfig {
            mode: ExecutionMode::Synchronous,
            worker_threads: 1,
        })
    }

    /// Submit work at the given priority. In synchronous mode this blocks
    /// for the task's full duration; in asynchronous mode it returns
    /// immediately with a handle to observe.
    pub fn submit(
        &self,
        work: Box<dyn TaskWork>,
        priority: TaskPriority,
    ) -> Result<Arc<TaskHandle>, EngineError> {
        self.submit_with_callbacks(work, priority, None, None)
    }

    /// Submit work with completion/error callbacks. Callbacks fire on the
    /// executing thread, after the outcome is stored in the handle. While
    /// the engine is disabled this returns [`EngineError::Disabled`] and
    /// nothing is queued.
    pub fn submit_with_callbacks(
        &self,
        work: Box<dyn TaskWork>,
        priority: TaskPriority,
        on_complete: Option<CompletionCallback>,
        on_error: Option<ErrorCallback>,
    ) -> Result<Arc<TaskHandle>, EngineError> {
        if !self.is_enabled() {
            return Err(EngineError::Disabled);
        }

        let handle = TaskHandle::new(work.name(), priority);
        match self.mode {
            ExecutionMode::Synchronous => {
                let entry = QueuedTask {
                    seq: 0,
                    handle: Arc::clone(&handle),
                    work,
                    on_complete,
                    on_error,
                };
                dispatch::execute_task(&self.shared, entry);
                Ok(handle)
            }
            ExecutionMode::Asynchronous => {
                {
                    let mut queue = self.shared.queue.lock().unwrap();
                    queue.push(Arc::clone(&handle), work, on_complete, on_error);
                }
                self.shared.ready.notify_all();
                Ok(handle)
            }
        }
    }

    /// Best-effort cancellation: a `Pending` task is moved to `Cancelled`
    /// and will be skipped at dispatch; a `Running` task only gets its
    /// cooperative cancel flag raised. Returns true if the task was
    /// prevented from ever running.
    pub fn cancel(&self, handle: &TaskHandle) -> bool {
        let prevented = handle.request_cancel();
        if prevented {
            debug!(task = %handle.name(), "cancelled pending task");
            if let Ok(mut m) = self.shared.metrics.write() {
                m.tasks_cancelled += 1;
            }
        } else {
            debug!(task = %handle.name(), "cancel requested for task already past pending");
        }
        prevented
    }

    /// Stop accepting work and drop everything still queued. Dropped tasks
    /// stay `Pending` forever and fire no callbacks; re-enabling does not
    /// resurrect them — callers must resubmit.
    pub fn disable(&self) {
        self.shared.enabled.store(false, Ordering::SeqCst);
        let dropped = self.shared.queue.lock().unwrap().clear();
        if dropped > 0 {
            info!(dropped, "engine disabled, queued tasks dropped");
        } else {
            info!("engine disabled");
        }
    }

    /// Resume accepting work.
    pub fn enable(&self) {
        self.shared.enabled.store(true, Ordering::SeqCst);
        info!("engine enabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    /// Snapshot of the engine metrics, including live queue depths.
    pub fn metrics(&self) -> EngineMetrics {
        let mut snapshot = self.shared.metrics.read().unwrap().clone();
        {
            let queue = self.shared.queue.lock().unwrap();
            snapshot.queued_asap = queue.depth(TaskPriority::Asap);
            snapshot.queued_low = queue.depth(TaskPriority::Low);
        }
        snapshot.active_workers = self.shared.active_workers.load(Ordering::SeqCst);
        snapshot
    }

    /// Stop the dispatcher. Running tasks finish; queued tasks are
    /// abandoned. Idempotent.
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.ready.notify_all();
        if let Some(handle) = self.dispatcher.lock().unwrap().take() {
            let _ = handle.join();
        }
        info!("task engine stopped");
    }
}

impl Drop for TaskEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
