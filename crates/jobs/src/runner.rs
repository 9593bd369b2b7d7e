use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::error::JobError;

/// What one runner invocation produced.
#[derive(Debug, Clone, Default)]
pub struct JobReport {
    pub items_processed: usize,
    pub detail: Option<String>,
}

impl JobReport {
    pub fn new(items_processed: usize) -> Self {
        Self {
            items_processed,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Pluggable logic invoked when a job bound to its name becomes due.
///
/// Runners are registered once at startup; unlike analysers they are
/// stateless (`&self`) and carry no instance-capacity limit.
pub trait JobRunner: Send + Sync {
    fn name(&self) -> &str;

    /// Execute with the job's opaque payload.
    fn run(&self, payload: &str) -> Result<JobReport, JobError>;
}

/// Name → runner table, built once at startup from explicit registrations.
pub struct JobRunnerRegistry {
    runners: HashMap<String, Arc<dyn JobRunner>>,
}

/// Collects registrations and validates them as a whole.
#[derive(Default)]
pub struct JobRunnerRegistryBuilder {
    runners: Vec<Arc<dyn JobRunner>>,
}

impl JobRunnerRegistryBuilder {
    pub fn register(mut self, runner: Arc<dyn JobRunner>) -> Self {
        self.runners.push(runner);
        self
    }

    /// Validate and build. Duplicate names fail here, at startup, not at
    /// first fire.
    pub fn build(self) -> Result<JobRunnerRegistry, JobError> {
        let mut runners = HashMap::with_capacity(self.runners.len());
        for runner in self.runners {
            let name = runner.name().to_string();
            if runners.contains_key(&name) {
                return Err(JobError::DuplicateRunner(name));
            }
            info!(runner = %name, "registered job runner");
            runners.insert(name, runner);
        }
        Ok(JobRunnerRegistry { runners })
    }
}

impl JobRunnerRegistry {
    pub fn builder() -> JobRunnerRegistryBuilder {
        JobRunnerRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn JobRunner>, JobError> {
        self.runners
            .get(name)
            .cloned()
            .ok_or_else(|| JobError::UnknownRunner(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.runners.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }
}
