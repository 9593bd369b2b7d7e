//! Built-in job runners: each one drives a facade's activation pass.
//!
//! The job payload may carry `{"batch": N}` to override the configured
//! activation batch size; anything else falls back to the default.

use std::sync::Arc;

use serde::Deserialize;

use corpora_analysis::AnalyserManager;
use corpora_fetch::Downloader;
use corpora_jobs::{JobError, JobReport, JobRunner};

pub const ACTIVATE_DOWNLOADS: &str = "activate-downloads";
pub const ACTIVATE_ANALYSES: &str = "activate-analyses";

#[derive(Debug, Default, Deserialize)]
struct BatchPayload {
    batch: Option<usize>,
}

fn batch_from(payload: &str, default: usize) -> usize {
    if payload.trim().is_empty() {
        return default;
    }
    serde_json::from_str::<BatchPayload>(payload)
        .ok()
        .and_then(|p| p.batch)
        .unwrap_or(default)
}

/// Fires the downloader's activation pass.
pub struct ActivateDownloadsRunner {
    downloader: Arc<Downloader>,
    default_batch: usize,
}

impl ActivateDownloadsRunner {
    pub fn new(downloader: Arc<Downloader>, default_batch: usize) -> Self {
        Self {
            downloader,
            default_batch,
        }
    }
}

impl JobRunner for ActivateDownloadsRunner {
    fn name(&self) -> &str {
        ACTIVATE_DOWNLOADS
    }

    fn run(&self, payload: &str) -> Result<JobReport, JobError> {
        let batch = batch_from(payload, self.default_batch);
        let summary = self.downloader.activate_pending(batch);
        Ok(JobReport::new(summary.activated).with_detail(format!(
            "{} activated, {} throttled, {} failed",
            summary.activated, summary.skipped, summary.failed
        )))
    }
}

/// Fires the analyser manager's activation pass.
pub struct ActivateAnalysesRunner {
    manager: Arc<AnalyserManager>,
    default_batch: usize,
}

impl ActivateAnalysesRunner {
    pub fn new(manager: Arc<AnalyserManager>, default_batch: usize) -> Self {
        Self {
            manager,
            default_batch,
        }
    }
}

impl JobRunner for ActivateAnalysesRunner {
    fn name(&self) -> &str {
        ACTIVATE_ANALYSES
    }

    fn run(&self, payload: &str) -> Result<JobReport, JobError> {
        let batch = batch_from(payload, self.default_batch);
        let summary = self.manager.activate_pending(batch);
        Ok(JobReport::new(summary.activated).with_detail(format!(
            "{} activated, {} capacity-skipped, {} failed",
            summary.activated, summary.skipped, summary.failed
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_payload_overrides_default() {
        assert_eq!(batch_from("{\"batch\": 4}", 16), 4);
        assert_eq!(batch_from("", 16), 16);
        assert_eq!(batch_from("not json", 16), 16);
        assert_eq!(batch_from("{}", 16), 16);
    }
}
