//! Job persistence boundary.
//!
//! The relational layer is an external collaborator; the scheduler only
//! needs the operations below. [`MemoryJobStore`] backs tests and
//! single-process deployments.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::error::JobError;
use crate::job::Job;

/// Store operations the scheduler depends on. Jobs are keyed by their
/// globally unique name.
pub trait JobStore: Send + Sync {
    /// Insert a new job; duplicate names are rejected.
    fn insert(&self, job: Job) -> Result<(), JobError>;

    fn get(&self, name: &str) -> Option<Job>;

    fn list(&self) -> Vec<Job>;

    /// Remove and return the named job.
    fn delete(&self, name: &str) -> Result<Job, JobError>;

    fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), JobError>;

    fn set_last_run(&self, name: &str, at: DateTime<Utc>) -> Result<(), JobError>;
}

/// In-memory [`JobStore`] over a `RwLock<HashMap>`.
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore for MemoryJobStore {
    fn insert(&self, job: Job) -> Result<(), JobError> {
        let mut jobs = self.jobs.write().unwrap();
        if jobs.contains_key(&job.name) {
            return Err(JobError::DuplicateJob(job.name));
        }
        jobs.insert(job.name.clone(), job);
        Ok(())
    }

    fn get(&self, name: &str) -> Option<Job> {
        self.jobs.read().unwrap().get(name).cloned()
    }

    fn list(&self) -> Vec<Job> {
        let mut all: Vec<Job> = self.jobs.read().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    fn delete(&self, name: &str) -> Result<Job, JobError> {
        self.jobs
            .write()
            .unwrap()
            .remove(name)
            .ok_or_else(|| JobError::NotFound(name.to_string()))
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), JobError> {
        let mut jobs = self.jobs.write().unwrap();
        let job = jobs
            .get_mut(name)
            .ok_or_else(|| JobError::NotFound(name.to_string()))?;
        job.enabled = enabled;
        Ok(())
    }

    fn set_last_run(&self, name: &str, at: DateTime<Utc>) -> Result<(), JobError> {
        let mut jobs = self.jobs.write().unwrap();
        let job = jobs
            .get_mut(name)
            .ok_or_else(|| JobError::NotFound(name.to_string()))?;
        job.last_run_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_rejects_duplicate_names() {
        let store = MemoryJobStore::new();
        store.insert(Job::new("sweep", "r", "* * * * *")).unwrap();

        let result = store.insert(Job::new("sweep", "other", "* * * * *"));
        assert!(matches!(result, Err(JobError::DuplicateJob(name)) if name == "sweep"));
    }

    #[test]
    fn delete_returns_the_job() {
        let store = MemoryJobStore::new();
        store.insert(Job::new("sweep", "r", "* * * * *")).unwrap();

        let job = store.delete("sweep").unwrap();
        assert_eq!(job.runner, "r");
        assert!(matches!(store.delete("sweep"), Err(JobError::NotFound(_))));
    }

    #[test]
    fn set_last_run_stamps_the_record() {
        let store = MemoryJobStore::new();
        store.insert(Job::new("sweep", "r", "* * * * *")).unwrap();

        let at = Utc::now();
        store.set_last_run("sweep", at).unwrap();
        assert_eq!(store.get("sweep").unwrap().last_run_at, Some(at));
    }

    #[test]
    fn list_is_name_ordered() {
        let store = MemoryJobStore::new();
        store.insert(Job::new("zebra", "r", "* * * * *")).unwrap();
        store.insert(Job::new("alpha", "r", "* * * * *")).unwrap();

        let names: Vec<String> = store.list().into_iter().map(|j| j.name).collect();
        assert_eq!(names, ["alpha", "zebra"]);
    }
}
