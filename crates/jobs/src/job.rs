use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recurring unit of work bound to a named [`JobRunner`](crate::runner::JobRunner).
///
/// Persisted by the operator-facing layer; `name` is globally unique and
/// `payload` is an opaque blob interpreted only by the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub name: String,
    /// Name of the registered runner invoked when this job fires.
    pub runner: String,
    /// 5- or 6-field cron expression.
    pub cron: String,
    pub enabled: bool,
    pub payload: String,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(name: impl Into<String>, runner: impl Into<String>, cron: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            runner: runner.into(),
            cron: cron.into(),
            enabled: true,
            payload: String::new(),
            last_run_at: None,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_roundtrips_through_json() {
        let job = Job::new("nightly-sweep", "activate-analyses", "0 3 * * *")
            .with_payload("{\"batch\":32}");
        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();

        assert_eq!(back.name, "nightly-sweep");
        assert_eq!(back.runner, "activate-analyses");
        assert_eq!(back.payload, "{\"batch\":32}");
        assert!(back.enabled);
        assert!(back.last_run_at.is_none());
    }
}
