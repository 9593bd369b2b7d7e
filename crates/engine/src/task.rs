use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::EngineError;

/// Unique task identifier.
pub type TaskId = Uuid;

/// Task execution priority. Lower ordinal = more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Dispatched strictly before any queued `Low` task.
    Asap = 0,
    /// Bulk/background work.
    Low = 1,
}

/// Task lifecycle state. Transitions are monotonic; exactly one terminal
/// state (`Completed`, `Failed`, or `Cancelled`) is ever reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed | TaskState::Cancelled)
    }
}

/// Result of a successfully executed task.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TaskReport {
    /// Name of the task that produced this report.
    pub task: String,
    /// How long the task took.
    pub duration: Duration,
    /// Number of items processed (documents, entities, jobs, etc.).
    pub items_processed: usize,
    /// Optional human-readable summary.
    pub detail: Option<String>,
}

impl TaskReport {
    pub fn new(task: impl Into<String>, duration: Duration, items_processed: usize) -> Self {
        Self {
            task: task.into(),
            duration,
            items_processed,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Execution context handed to a running task.
///
/// Cancellation is cooperative: the engine never interrupts a running task,
/// it only raises the flag. Long-running work should poll
/// [`cancel_requested`](TaskContext::cancel_requested) at natural
/// checkpoints and bail out early.
pub struct TaskContext {
    cancel: Arc<AtomicBool>,
}

impl TaskContext {
    pub(crate) fn new(cancel: Arc<AtomicBool>) -> Self {
        Self { cancel }
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// A unit of work the engine can execute.
pub trait TaskWork: Send + Sync {
    /// Name for logging and metrics.
    fn name(&self) -> &str;

    /// Execute the work. Any `Err` is wrapped into the uniform
    /// [`EngineError::TaskFailed`] envelope and delivered via the error
    /// callback — it never propagates to the submitter.
    fn run(&self, ctx: &TaskContext) -> Result<TaskReport, EngineError>;
}

struct HandleInner {
    state: TaskState,
    outcome: Option<Result<TaskReport, EngineError>>,
}

/// Shared view of a submitted task: its state and, once terminal, its
/// outcome. Owned by the engine, observed by submitters via `Arc`.
pub struct TaskHandle {
    id: TaskId,
    name: String,
    priority: TaskPriority,
    inner: Mutex<HandleInner>,
    terminal: Condvar,
    cancel: Arc<AtomicBool>,
}

impl TaskHandle {
    pub(crate) fn new(name: impl Into<String>, priority: TaskPriority) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            priority,
            inner: Mutex::new(HandleInner {
                state: TaskState::Pending,
                outcome: None,
            }),
            terminal: Condvar::new(),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn state(&self) -> TaskState {
        self.inner.lock().unwrap().state
    }

    /// The stored result, once the task reached `Completed` or `Failed`.
    /// `None` while non-terminal and for cancelled tasks.
    pub fn outcome(&self) -> Option<Result<TaskReport, EngineError>> {
        self.inner.lock().unwrap().outcome.clone()
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Raise the cooperative cancel flag and, if the task has not started,
    /// move it to `Cancelled`. Returns true if the task was prevented from
    /// ever running.
    pub(crate) fn request_cancel(&self) -> bool {
        self.cancel.store(true, Ordering::Relaxed);
        self.transition(TaskState::Cancelled)
    }

    /// Apply a state transition if it is legal, refusing anything that
    /// would leave a terminal state or start a cancelled task. Returns
    /// whether the transition was applied.
    pub(crate) fn transition(&self, to: TaskState) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let legal = matches!(
            (inner.state, to),
            (TaskState::Pending, TaskState::Running)
                | (TaskState::Pending, TaskState::Cancelled)
                | (TaskState::Running, TaskState::Completed)
                | (TaskState::Running, TaskState::Failed)
        );
        if legal {
            inner.state = to;
            if to.is_terminal() {
                self.terminal.notify_all();
            }
        }
        legal
    }

    /// Store the outcome and move to the matching terminal state.
    pub(crate) fn finish(&self, outcome: Result<TaskReport, EngineError>) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state.is_terminal() {
            return;
        }
        inner.state = if outcome.is_ok() {
            TaskState::Completed
        } else {
            TaskState::Failed
        };
        inner.outcome = Some(outcome);
        self.terminal.notify_all();
    }

    /// Block until the task reaches a terminal state or the timeout
    /// elapses; returns the state observed last. Test/operator helper.
    pub fn wait_terminal(&self, timeout: Duration) -> TaskState {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().unwrap();
        while !inner.state.is_terminal() {
            let remaining = match deadline.checked_duration_since(Instant::now()) {
                Some(r) if !r.is_zero() => r,
                _ => return inner.state,
            };
            let (guard, _) = self.terminal.wait_timeout(inner, remaining).unwrap();
            inner = guard;
        }
        inner.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering() {
        assert!(TaskPriority::Asap < TaskPriority::Low);
    }

    #[test]
    fn legal_transitions() {
        let handle = TaskHandle::new("t", TaskPriority::Low);
        assert!(handle.transition(TaskState::Running));
        assert!(handle.transition(TaskState::Completed));
        assert_eq!(handle.state(), TaskState::Completed);
    }

    #[test]
    fn terminal_states_are_sticky() {
        let handle = TaskHandle::new("t", TaskPriority::Low);
        assert!(handle.transition(TaskState::Cancelled));
        // No state is reachable twice, and nothing leaves a terminal state.
        assert!(!handle.transition(TaskState::Running));
        assert!(!handle.transition(TaskState::Completed));
        assert_eq!(handle.state(), TaskState::Cancelled);
    }

    #[test]
    fn cancelled_task_never_runs() {
        let handle = TaskHandle::new("t", TaskPriority::Asap);
        assert!(handle.request_cancel());
        assert!(!handle.transition(TaskState::Running));
        assert!(handle.cancel_requested());
    }

    #[test]
    fn cancel_of_running_task_only_raises_flag() {
        let handle = TaskHandle::new("t", TaskPriority::Asap);
        assert!(handle.transition(TaskState::Running));
        assert!(!handle.request_cancel());
        assert_eq!(handle.state(), TaskState::Running);
        assert!(handle.cancel_requested());
    }

    #[test]
    fn finish_stores_outcome() {
        let handle = TaskHandle::new("t", TaskPriority::Low);
        handle.transition(TaskState::Running);
        handle.finish(Ok(TaskReport::new("t", Duration::from_millis(1), 3)));

        assert_eq!(handle.state(), TaskState::Completed);
        let report = handle.outcome().unwrap().unwrap();
        assert_eq!(report.items_processed, 3);
    }

    #[test]
    fn finish_is_ignored_after_terminal() {
        let handle = TaskHandle::new("t", TaskPriority::Low);
        handle.request_cancel();
        handle.finish(Ok(TaskReport::new("t", Duration::ZERO, 0)));
        assert_eq!(handle.state(), TaskState::Cancelled);
        assert!(handle.outcome().is_none());
    }

    #[test]
    fn wait_terminal_times_out_on_pending() {
        let handle = TaskHandle::new("t", TaskPriority::Low);
        let state = handle.wait_terminal(Duration::from_millis(20));
        assert_eq!(state, TaskState::Pending);
    }
}
