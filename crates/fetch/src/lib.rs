//! Document downloading against throttled origin hosts.
//!
//! This crate provides:
//! - The [`SourceClient`] boundary and its blocking HTTP implementation
//! - The download task that translates HTTP failures into the engine's
//!   uniform error envelope
//! - The [`Downloader`] facade that activates pending downloads behind the
//!   per-host throttle gate

pub mod client;
pub mod download;
pub mod downloader;
pub mod error;

pub use client::{host_key, HttpSourceClient, SourceBody, SourceClient};
pub use downloader::{ActivationSummary, DownloadDispatch, Downloader};
pub use error::FetchError;
