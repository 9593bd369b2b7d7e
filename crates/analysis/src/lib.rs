//! Pluggable document analysers with bounded instance pools.
//!
//! This crate provides:
//! - The [`Analyser`] trait and its startup [`AnalyserRegistry`]
//! - Capacity-bounded, lazily-filled [`AnalyserPool`]s with RAII leases
//! - The [`AnalyserManager`] facade that activates pending analyses on the
//!   task engine
//! - A built-in plain-text analyser

pub mod analyser;
pub mod descriptor;
pub mod error;
pub mod manager;
pub mod pool;
pub mod text_metrics;

pub use analyser::{AnalyserFactory, AnalysisReport, Analyser, ExtractedEntity};
pub use descriptor::AnalyserDescriptor;
pub use error::AnalysisError;
pub use manager::{ActivationSummary, AnalyserManager};
pub use pool::{AnalyserLease, AnalyserPool, AnalyserRegistry, AnalyserRegistryBuilder};
pub use text_metrics::{TextMetricsAnalyser, TEXT_METRICS};
