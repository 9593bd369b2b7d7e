//! Downloader — the domain facade over engine + throttle gate.
//!
//! Policy: download tasks run at `Asap` priority (they feed the analysis
//! pipeline), at most one request per origin host per throttle window, and
//! a host whose window is still open is skipped this cycle — the document
//! stays pending and is retried on a later pass.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use corpora_core::{AnalysisStatus, DocId, DocumentStore, DownloadStatus};
use corpora_engine::{
    CompletionCallback, ErrorCallback, TaskEngine, TaskHandle, TaskPriority, ThrottleRegistry,
};

use crate::client::{host_key, SourceClient};
use crate::download::DownloadWork;
use crate::error::FetchError;

/// Outcome of asking for one download. `Busy` is a scheduling outcome,
/// not an error.
pub enum DownloadDispatch {
    Submitted(Arc<TaskHandle>),
    Busy,
}

/// Result of one activation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActivationSummary {
    /// Tasks submitted this pass.
    pub activated: usize,
    /// Documents skipped because their host's throttle window is open.
    pub skipped: usize,
    /// Documents with unusable origin URLs, marked failed.
    pub failed: usize,
}

/// Facade composing the task engine, the per-host throttle registry, the
/// source client, and the document store.
pub struct Downloader {
    engine: Arc<TaskEngine>,
    throttle: Arc<ThrottleRegistry>,
    client: Arc<dyn SourceClient>,
    store: Arc<dyn DocumentStore>,
    host_interval: Duration,
    in_flight: Mutex<HashMap<DocId, Arc<TaskHandle>>>,
}

impl Downloader {
    pub fn new(
        engine: Arc<TaskEngine>,
        throttle: Arc<ThrottleRegistry>,
        client: Arc<dyn SourceClient>,
        store: Arc<dyn DocumentStore>,
        host_interval: Duration,
    ) -> Self {
        Self {
            engine,
            throttle,
            client,
            store,
            host_interval,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Try to dispatch one download: check the host's throttle window, and
    /// if it is ours, submit an `Asap` task that fetches and stores the
    /// body. A `Busy` gate is reported as such, never as an error.
    pub fn download(&self, id: DocId) -> Result<DownloadDispatch, FetchError> {
        let doc = self.store.get(id).ok_or(FetchError::DocumentMissing(id))?;
        if doc.download == DownloadStatus::Completed {
            return Err(FetchError::AlreadyDownloaded(id));
        }

        let host = host_key(&doc.origin_url)?;
        if !self
            .throttle
            .throttle_or_busy(&host, self.host_interval)
            .is_ready()
        {
            return Ok(DownloadDispatch::Busy);
        }

        self.store.set_download_status(id, DownloadStatus::Running);

        let complete_store = Arc::clone(&self.store);
        let on_complete: CompletionCallback = Box::new(move |_handle| {
            complete_store.set_download_status(id, DownloadStatus::Completed);
            // the body is in place; the document is now eligible for analysis
            complete_store.set_analysis_status(id, AnalysisStatus::Pending);
        });
        let error_store = Arc::clone(&self.store);
        let on_error: ErrorCallback = Box::new(move |handle, error| {
            warn!(task = %handle.name(), error = %error, "download task failed");
            error_store.set_download_status(id, DownloadStatus::Failed);
        });

        let work = Box::new(DownloadWork {
            name: format!("download:{host}"),
            doc,
            client: Arc::clone(&self.client),
            store: Arc::clone(&self.store),
        });

        match self
            .engine
            .submit_with_callbacks(work, TaskPriority::Asap, Some(on_complete), Some(on_error))
        {
            Ok(handle) => {
                if !handle.state().is_terminal() {
                    self.in_flight
                        .lock()
                        .unwrap()
                        .insert(id, Arc::clone(&handle));
                }
                Ok(DownloadDispatch::Submitted(handle))
            }
            Err(e) => {
                self.store.set_download_status(id, DownloadStatus::Pending);
                Err(FetchError::Engine(e.to_string()))
            }
        }
    }

    /// Activate up to `max` pending downloads. Throttled hosts are skipped,
    /// not queued; unusable origin URLs are marked failed.
    pub fn activate_pending(&self, max: usize) -> ActivationSummary {
        self.prune_in_flight();

        let mut summary = ActivationSummary::default();
        for doc in self.store.pending_downloads(max) {
            match self.download(doc.id) {
                Ok(DownloadDispatch::Submitted(_)) => summary.activated += 1,
                Ok(DownloadDispatch::Busy) => {
                    debug!(doc = %doc.id, url = %doc.origin_url, "host throttled, skipping this cycle");
                    summary.skipped += 1;
                }
                Err(FetchError::InvalidUrl(url)) => {
                    warn!(doc = %doc.id, url = %url, "unusable origin URL, marking download failed");
                    self.store.set_download_status(doc.id, DownloadStatus::Failed);
                    summary.failed += 1;
                }
                Err(FetchError::AlreadyDownloaded(_)) => {}
                Err(e) => {
                    warn!(doc = %doc.id, error = %e, "download activation failed");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Mark the document cancelled and best-effort-cancel its in-flight
    /// task. Returns true if the task was prevented from running.
    pub fn cancel(&self, id: DocId) -> bool {
        let handle = self.in_flight.lock().unwrap().remove(&id);
        let prevented = handle.map(|h| self.engine.cancel(&h)).unwrap_or(false);
        self.store.set_download_status(id, DownloadStatus::Cancelled);
        prevented
    }

    fn prune_in_flight(&self) {
        self.in_flight
            .lock()
            .unwrap()
            .retain(|_, handle| !handle.state().is_terminal());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use corpora_core::{CorpusDocument, MemoryDocumentStore};

    use crate::client::SourceBody;

    /// Stub client: behavior keyed off the URL path.
    struct StubClient;

    impl SourceClient for StubClient {
        fn fetch(&self, url: &str) -> Result<SourceBody, FetchError> {
            if url.contains("missing") {
                Err(FetchError::Status {
                    status: 404,
                    url: url.to_string(),
                })
            } else if url.contains("empty") {
                Err(FetchError::EmptyBody(url.to_string()))
            } else {
                Ok(SourceBody {
                    url: url.to_string(),
                    body: "fetched body".to_string(),
                    content_type: Some("text/plain".to_string()),
                })
            }
        }
    }

    fn downloader(store: &Arc<MemoryDocumentStore>, host_interval: Duration) -> Downloader {
        Downloader::new(
            Arc::new(TaskEngine::synchronous()),
            Arc::new(ThrottleRegistry::new()),
            Arc::new(StubClient),
            Arc::clone(store) as Arc<dyn DocumentStore>,
            host_interval,
        )
    }

    fn seed(store: &Arc<MemoryDocumentStore>, title: &str, url: &str) -> DocId {
        let doc = CorpusDocument::new(title, url, "text-metrics");
        let id = doc.id;
        store.upsert(doc);
        id
    }

    #[test]
    fn activate_pending_downloads_and_stores_bodies() {
        let store = Arc::new(MemoryDocumentStore::new());
        let a = seed(&store, "a-doc", "https://host-a.example.org/a.txt");
        let b = seed(&store, "b-doc", "https://host-b.example.org/b.txt");
        let downloader = downloader(&store, Duration::from_secs(60));

        let summary = downloader.activate_pending(10);

        assert_eq!(summary, ActivationSummary { activated: 2, skipped: 0, failed: 0 });
        for id in [a, b] {
            let doc = store.get(id).unwrap();
            assert_eq!(doc.download, DownloadStatus::Completed);
            assert_eq!(doc.analysis, AnalysisStatus::Pending);
            assert_eq!(doc.content.as_deref(), Some("fetched body"));
        }
    }

    #[test]
    fn same_host_is_throttled_within_one_pass() {
        let store = Arc::new(MemoryDocumentStore::new());
        let a = seed(&store, "a-doc", "https://shared.example.org/a.txt");
        let b = seed(&store, "b-doc", "https://shared.example.org/b.txt");
        let downloader = downloader(&store, Duration::from_secs(60));

        let summary = downloader.activate_pending(10);

        assert_eq!(summary, ActivationSummary { activated: 1, skipped: 1, failed: 0 });
        assert_eq!(store.get(a).unwrap().download, DownloadStatus::Completed);
        // the second document stays pending for a later pass
        assert_eq!(store.get(b).unwrap().download, DownloadStatus::Pending);
    }

    #[test]
    fn throttled_document_recovers_on_a_later_pass() {
        let store = Arc::new(MemoryDocumentStore::new());
        seed(&store, "a-doc", "https://shared.example.org/a.txt");
        let b = seed(&store, "b-doc", "https://shared.example.org/b.txt");
        let downloader = downloader(&store, Duration::from_millis(20));

        assert_eq!(downloader.activate_pending(10).activated, 1);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(downloader.activate_pending(10).activated, 1);
        assert_eq!(store.get(b).unwrap().download, DownloadStatus::Completed);
    }

    #[test]
    fn http_failure_marks_download_failed() {
        let store = Arc::new(MemoryDocumentStore::new());
        let id = seed(&store, "gone", "https://host.example.org/missing.txt");
        let downloader = downloader(&store, Duration::from_secs(60));

        // the task submits fine; the failure arrives via the error callback
        let summary = downloader.activate_pending(10);
        assert_eq!(summary.activated, 1);

        let doc = store.get(id).unwrap();
        assert_eq!(doc.download, DownloadStatus::Failed);
        assert!(doc.content.is_none());
    }

    #[test]
    fn empty_body_marks_download_failed() {
        let store = Arc::new(MemoryDocumentStore::new());
        let id = seed(&store, "blank", "https://host.example.org/empty.txt");
        let downloader = downloader(&store, Duration::from_secs(60));

        downloader.activate_pending(10);
        assert_eq!(store.get(id).unwrap().download, DownloadStatus::Failed);
    }

    #[test]
    fn invalid_origin_url_marks_download_failed() {
        let store = Arc::new(MemoryDocumentStore::new());
        let id = seed(&store, "bad", "not a url at all");
        let downloader = downloader(&store, Duration::from_secs(60));

        let summary = downloader.activate_pending(10);

        assert_eq!(summary, ActivationSummary { activated: 0, skipped: 0, failed: 1 });
        assert_eq!(store.get(id).unwrap().download, DownloadStatus::Failed);
    }

    #[test]
    fn already_downloaded_is_refused() {
        let store = Arc::new(MemoryDocumentStore::new());
        let doc = CorpusDocument::with_content("done", "text-metrics", "body");
        let id = doc.id;
        store.upsert(doc);
        let downloader = downloader(&store, Duration::from_secs(60));

        assert!(matches!(
            downloader.download(id),
            Err(FetchError::AlreadyDownloaded(got)) if got == id
        ));
    }

    #[test]
    fn cancel_marks_document_cancelled() {
        let store = Arc::new(MemoryDocumentStore::new());
        let id = seed(&store, "doc", "https://host.example.org/a.txt");
        let downloader = downloader(&store, Duration::from_secs(60));

        downloader.cancel(id);
        assert_eq!(store.get(id).unwrap().download, DownloadStatus::Cancelled);
    }
}
