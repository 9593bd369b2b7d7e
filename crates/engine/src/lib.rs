//! Priority task engine and per-key throttle gate.
//!
//! This crate provides the concurrency primitives the rest of the system
//! is built on:
//! - [`TaskEngine`] — priority-ordered executor with synchronous and
//!   pooled-asynchronous modes, completion/error callbacks, and an
//!   enable/disable operational switch.
//! - [`ThrottleRegistry`] — per-key rate gate producing READY/BUSY
//!   decisions without blocking or queueing.

pub mod engine;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod task;
pub mod throttle;

pub use engine::TaskEngine;
pub use error::EngineError;
pub use metrics::EngineMetrics;
pub use queue::{CompletionCallback, ErrorCallback};
pub use task::{TaskContext, TaskHandle, TaskId, TaskPriority, TaskReport, TaskState, TaskWork};
pub use throttle::{GateDecision, ThrottleRegistry};
