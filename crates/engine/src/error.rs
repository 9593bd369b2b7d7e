use thiserror::Error;

/// Error surface of the task engine.
///
/// `TaskFailed` is the uniform envelope a task's own failure is wrapped
/// into; it is delivered through the error callback and the handle's
/// outcome slot, never thrown back at the submitter. `Disabled` is returned
/// from submit so callers can tell "engine off" apart from silent success.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("Engine is disabled")]
    Disabled,
}

impl EngineError {
    /// Wrap an arbitrary failure message into the uniform envelope.
    pub fn failed(msg: impl Into<String>) -> Self {
        EngineError::TaskFailed(msg.into())
    }

    /// Collapse any engine error into the `TaskFailed` envelope, keeping an
    /// already-wrapped message as-is.
    pub(crate) fn into_envelope(self) -> Self {
        match self {
            EngineError::TaskFailed(_) => self,
            other => EngineError::TaskFailed(other.to_string()),
        }
    }
}
