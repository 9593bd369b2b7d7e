use thiserror::Error;

/// Error surface of the job CRUD API and runner registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    /// No runner registered under the name a job references.
    #[error("No job runner registered for name '{0}'")]
    UnknownRunner(String),

    /// Two runners registered under one name — rejected at build time.
    #[error("Duplicate job runner name '{0}'")]
    DuplicateRunner(String),

    #[error("Invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },

    #[error("Job not found: {0}")]
    NotFound(String),

    /// Job names are globally unique.
    #[error("Duplicate job name '{0}'")]
    DuplicateJob(String),

    #[error("Job store error: {0}")]
    Store(String),

    /// Runner execution failure, wrapped into the engine envelope by the
    /// job task.
    #[error("Job failed: {0}")]
    Failed(String),
}
