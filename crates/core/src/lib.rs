pub mod config;
pub mod document;
pub mod error;
pub mod store;

pub use config::{Config, EngineConfig, ExecutionMode, FetchConfig, JobsConfig, ThrottleConfig};
pub use document::*;
pub use error::*;
pub use store::{DocumentStore, MemoryDocumentStore};
