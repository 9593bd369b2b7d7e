//! Dispatcher loop and task execution shared by both engine modes.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::queue::QueuedTask;
use crate::task::{TaskContext, TaskState};

use super::EngineShared;

/// Upper bound on how long the dispatcher sleeps before re-checking the
/// shutdown flag.
const DISPATCH_WAIT: Duration = Duration::from_millis(50);

/// Pop tasks in priority order and hand them to the worker pool, one per
/// free worker slot. Runs until shutdown is signalled.
pub(super) fn dispatcher_loop(shared: Arc<EngineShared>, pool: rayon::ThreadPool) {
    loop {
        let entry = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if shared.shutdown.load(Ordering::SeqCst) {
                    return;
                }
                let slot_free =
                    shared.active_workers.load(Ordering::SeqCst) < shared.workers;
                if slot_free {
                    if let Some(entry) = queue.pop() {
                        break entry;
                    }
                }
                let (guard, _) = shared
                    .ready
                    .wait_timeout(queue, DISPATCH_WAIT)
                    .unwrap();
                queue = guard;
            }
        };

        if entry.handle.state() == TaskState::Cancelled {
            debug!(task = %entry.handle.name(), "skipping cancelled task at dispatch");
            continue;
        }

        shared.active_workers.fetch_add(1, Ordering::SeqCst);
        let task_shared = Arc::clone(&shared);
        pool.spawn(move || {
            execute_task(&task_shared, entry);
            task_shared.active_workers.fetch_sub(1, Ordering::SeqCst);
            task_shared.ready.notify_all();
        });
    }
}

/// Run one task to its terminal state: execute the work, store the outcome,
/// record metrics, fire the matching callback on this thread.
pub(super) fn execute_task(shared: &EngineShared, entry: QueuedTask) {
    let QueuedTask {
        handle,
        work,
        on_complete,
        on_error,
        ..
    } = entry;

    // A cancel can race in between the dispatch check and here.
    if !handle.transition(TaskState::Running) {
        return;
    }

    debug!(task = %handle.name(), "task starting");
    let started = Instant::now();
    let ctx = TaskContext::new(handle.cancel_flag());

    // A panicking task must not take the worker thread (and its siblings)
    // down with it; it becomes an ordinary failure envelope.
    let result = match std::panic::catch_unwind(AssertUnwindSafe(|| work.run(&ctx))) {
        Ok(result) => result,
        Err(panic) => Err(crate::error::EngineError::failed(panic_message(&panic))),
    };

    match result {
        Ok(report) => {
            if let Ok(mut m) = shared.metrics.write() {
                m.record_execution(handle.name(), started.elapsed());
            }
            debug!(task = %handle.name(), duration = ?report.duration, "task completed");
            handle.finish(Ok(report));
            if let Some(cb) = on_complete {
                cb(&handle);
            }
        }
        Err(e) => {
            let envelope = e.into_envelope();
            if let Ok(mut m) = shared.metrics.write() {
                m.record_failure(handle.name());
            }
            handle.finish(Err(envelope.clone()));
            match on_error {
                Some(cb) => cb(&handle, &envelope),
                None => warn!(task = %handle.name(), error = %envelope, "task failed"),
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("task panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("task panicked: {s}")
    } else {
        "task panicked".to_string()
    }
}
