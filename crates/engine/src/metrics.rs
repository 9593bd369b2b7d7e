use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Engine operational metrics snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineMetrics {
    /// Successful executions by task name.
    pub tasks_executed: HashMap<String, u64>,
    /// Failures by task name.
    pub tasks_failed: HashMap<String, u64>,
    /// Tasks cancelled before they started.
    pub tasks_cancelled: u64,
    /// Average duration by task name.
    pub avg_task_duration: HashMap<String, Duration>,
    /// Last successful execution time by task name.
    pub last_run: HashMap<String, DateTime<Utc>>,
    /// Queued tasks awaiting an `Asap` slot.
    pub queued_asap: usize,
    /// Queued tasks awaiting a `Low` slot.
    pub queued_low: usize,
    /// Workers currently executing a task.
    pub active_workers: usize,
}

impl EngineMetrics {
    /// Record a successful task execution.
    pub fn record_execution(&mut self, task_name: &str, duration: Duration) {
        *self.tasks_executed.entry(task_name.to_string()).or_default() += 1;
        self.last_run.insert(task_name.to_string(), Utc::now());

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        let count = self.tasks_executed[task_name];
        let prev_avg = self
            .avg_task_duration
            .get(task_name)
            .copied()
            .unwrap_or_default();
        let new_avg = if count == 1 {
            duration
        } else {
            let prev_nanos = prev_avg.as_nanos() as f64;
            let cur_nanos = duration.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / count as f64;
            Duration::from_nanos(avg_nanos as u64)
        };
        self.avg_task_duration.insert(task_name.to_string(), new_avg);
    }

    /// Record a failed task execution.
    pub fn record_failure(&mut self, task_name: &str) {
        *self.tasks_failed.entry(task_name.to_string()).or_default() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_single_execution() {
        let mut m = EngineMetrics::default();
        m.record_execution("task", Duration::from_millis(100));

        assert_eq!(m.tasks_executed["task"], 1);
        assert!(m.last_run.contains_key("task"));
        assert_eq!(m.avg_task_duration["task"], Duration::from_millis(100));
    }

    #[test]
    fn record_multiple_executions_averages() {
        let mut m = EngineMetrics::default();
        m.record_execution("task", Duration::from_millis(100));
        m.record_execution("task", Duration::from_millis(200));

        assert_eq!(m.tasks_executed["task"], 2);
        // Average of 100ms and 200ms = 150ms
        let avg = m.avg_task_duration["task"].as_millis();
        assert!((140..=160).contains(&avg), "expected ~150ms, got {}ms", avg);
    }

    #[test]
    fn failures_tracked_separately() {
        let mut m = EngineMetrics::default();
        m.record_failure("task");
        m.record_failure("task");

        assert_eq!(m.tasks_failed["task"], 2);
        assert!(m.tasks_executed.is_empty());
    }
}
