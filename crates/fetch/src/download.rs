use std::sync::Arc;
use std::time::Instant;

use corpora_core::{CorpusDocument, DocumentStore};
use corpora_engine::{EngineError, TaskContext, TaskReport, TaskWork};

use crate::client::SourceClient;

/// Task that fetches one document body from its origin and stores it.
///
/// Every client failure (connect error, non-success status, empty body) is
/// translated into the uniform `TaskFailed` envelope here; the engine
/// performs no HTTP retries of its own.
pub(crate) struct DownloadWork {
    pub(crate) name: String,
    pub(crate) doc: CorpusDocument,
    pub(crate) client: Arc<dyn SourceClient>,
    pub(crate) store: Arc<dyn DocumentStore>,
}

impl TaskWork for DownloadWork {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &TaskContext) -> Result<TaskReport, EngineError> {
        if ctx.cancel_requested() {
            return Err(EngineError::failed("download cancelled before it began"));
        }

        let started = Instant::now();
        let fetched = self
            .client
            .fetch(&self.doc.origin_url)
            .map_err(|e| EngineError::failed(e.to_string()))?;

        let bytes = fetched.body.len();
        self.store.store_content(self.doc.id, fetched.body);

        Ok(TaskReport::new(&self.name, started.elapsed(), 1)
            .with_detail(format!("{bytes} bytes from {}", fetched.url)))
    }
}
