//! Shared priority queue drained by the engine.
//!
//! Ordering: `Asap` strictly before `Low`, FIFO within a priority class via
//! a monotonically increasing submission sequence number.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::error::EngineError;
use crate::task::{TaskHandle, TaskPriority, TaskWork};

/// Callback fired on the executing thread after a task completes.
pub type CompletionCallback = Box<dyn FnOnce(&TaskHandle) + Send>;
/// Callback fired on the executing thread after a task fails.
pub type ErrorCallback = Box<dyn FnOnce(&TaskHandle, &EngineError) + Send>;

pub(crate) struct QueuedTask {
    pub(crate) seq: u64,
    pub(crate) handle: Arc<TaskHandle>,
    pub(crate) work: Box<dyn TaskWork>,
    pub(crate) on_complete: Option<CompletionCallback>,
    pub(crate) on_error: Option<ErrorCallback>,
}

impl QueuedTask {
    fn priority(&self) -> TaskPriority {
        self.handle.priority()
    }
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: the "greatest" entry pops first. Urgent
        // priority (lower ordinal) and earlier sequence must win, so both
        // comparisons are reversed.
        other
            .priority()
            .cmp(&self.priority())
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue with submission-order tie-breaking.
pub(crate) struct TaskQueue {
    heap: BinaryHeap<QueuedTask>,
    next_seq: u64,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub(crate) fn push(
        &mut self,
        handle: Arc<TaskHandle>,
        work: Box<dyn TaskWork>,
        on_complete: Option<CompletionCallback>,
        on_error: Option<ErrorCallback>,
    ) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueuedTask {
            seq,
            handle,
            work,
            on_complete,
            on_error,
        });
    }

    pub(crate) fn pop(&mut self) -> Option<QueuedTask> {
        self.heap.pop()
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn depth(&self, priority: TaskPriority) -> usize {
        self.heap.iter().filter(|t| t.priority() == priority).count()
    }

    /// Drop every queued entry. Drained handles stay `Pending` and fire no
    /// callbacks — disable does not queue work for later.
    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.heap.len();
        self.heap.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{TaskContext, TaskReport};
    use std::time::Duration;

    struct Noop(&'static str);

    impl TaskWork for Noop {
        fn name(&self) -> &str {
            self.0
        }
        fn run(&self, _ctx: &TaskContext) -> Result<TaskReport, EngineError> {
            Ok(TaskReport::new(self.0, Duration::ZERO, 0))
        }
    }

    fn push(queue: &mut TaskQueue, name: &'static str, priority: TaskPriority) {
        let handle = TaskHandle::new(name, priority);
        queue.push(handle, Box::new(Noop(name)), None, None);
    }

    #[test]
    fn asap_pops_before_earlier_low() {
        let mut queue = TaskQueue::new();
        push(&mut queue, "low-1", TaskPriority::Low);
        push(&mut queue, "low-2", TaskPriority::Low);
        push(&mut queue, "asap-1", TaskPriority::Asap);

        assert_eq!(queue.pop().unwrap().handle.name(), "asap-1");
        assert_eq!(queue.pop().unwrap().handle.name(), "low-1");
        assert_eq!(queue.pop().unwrap().handle.name(), "low-2");
    }

    #[test]
    fn fifo_within_priority_class() {
        let mut queue = TaskQueue::new();
        for name in ["a", "b", "c"] {
            let handle = TaskHandle::new(name, TaskPriority::Asap);
            queue.push(handle, Box::new(Noop("x")), None, None);
        }
        assert_eq!(queue.pop().unwrap().handle.name(), "a");
        assert_eq!(queue.pop().unwrap().handle.name(), "b");
        assert_eq!(queue.pop().unwrap().handle.name(), "c");
    }

    #[test]
    fn depth_counts_per_priority() {
        let mut queue = TaskQueue::new();
        push(&mut queue, "l", TaskPriority::Low);
        push(&mut queue, "l2", TaskPriority::Low);
        push(&mut queue, "a", TaskPriority::Asap);

        assert_eq!(queue.depth(TaskPriority::Low), 2);
        assert_eq!(queue.depth(TaskPriority::Asap), 1);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn clear_drops_everything() {
        let mut queue = TaskQueue::new();
        push(&mut queue, "l", TaskPriority::Low);
        push(&mut queue, "a", TaskPriority::Asap);
        assert_eq!(queue.clear(), 2);
        assert!(queue.pop().is_none());
    }
}
