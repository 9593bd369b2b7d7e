//! Document persistence boundary.
//!
//! The relational layer is an external collaborator; the orchestration core
//! only needs the operations below. [`MemoryDocumentStore`] backs tests and
//! single-process deployments.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use crate::document::{AnalysisStatus, CorpusDocument, DocId, DownloadStatus};

/// Store operations the facades depend on.
pub trait DocumentStore: Send + Sync {
    /// Documents whose download has not started, oldest first, up to `limit`.
    fn pending_downloads(&self, limit: usize) -> Vec<CorpusDocument>;

    /// Documents downloaded but not yet analysed, oldest first, up to `limit`.
    fn pending_analyses(&self, limit: usize) -> Vec<CorpusDocument>;

    fn get(&self, id: DocId) -> Option<CorpusDocument>;

    fn upsert(&self, doc: CorpusDocument);

    fn set_download_status(&self, id: DocId, status: DownloadStatus);

    fn set_analysis_status(&self, id: DocId, status: AnalysisStatus);

    /// Record a fetched body and stamp `fetched_at`.
    fn store_content(&self, id: DocId, body: String);

    fn count(&self) -> usize;
}

/// In-memory [`DocumentStore`] over a `RwLock<HashMap>`.
pub struct MemoryDocumentStore {
    docs: RwLock<HashMap<DocId, CorpusDocument>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
        }
    }

    /// Ordered snapshot used by the pending_* queries. `HashMap` iteration
    /// order is arbitrary, so sort by title for deterministic batches.
    fn sorted_snapshot(&self) -> Vec<CorpusDocument> {
        let docs = self.docs.read().unwrap();
        let mut all: Vec<CorpusDocument> = docs.values().cloned().collect();
        all.sort_by(|a, b| a.title.cmp(&b.title));
        all
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn pending_downloads(&self, limit: usize) -> Vec<CorpusDocument> {
        self.sorted_snapshot()
            .into_iter()
            .filter(|d| d.download == DownloadStatus::Pending)
            .take(limit)
            .collect()
    }

    fn pending_analyses(&self, limit: usize) -> Vec<CorpusDocument> {
        self.sorted_snapshot()
            .into_iter()
            .filter(|d| d.download == DownloadStatus::Completed && d.analysis == AnalysisStatus::Pending)
            .take(limit)
            .collect()
    }

    fn get(&self, id: DocId) -> Option<CorpusDocument> {
        self.docs.read().unwrap().get(&id).cloned()
    }

    fn upsert(&self, doc: CorpusDocument) {
        self.docs.write().unwrap().insert(doc.id, doc);
    }

    fn set_download_status(&self, id: DocId, status: DownloadStatus) {
        if let Some(doc) = self.docs.write().unwrap().get_mut(&id) {
            doc.download = status;
        }
    }

    fn set_analysis_status(&self, id: DocId, status: AnalysisStatus) {
        if let Some(doc) = self.docs.write().unwrap().get_mut(&id) {
            doc.analysis = status;
            if status == AnalysisStatus::Completed {
                doc.analysed_at = Some(Utc::now());
            }
        }
    }

    fn store_content(&self, id: DocId, body: String) {
        if let Some(doc) = self.docs.write().unwrap().get_mut(&id) {
            doc.content = Some(body);
            doc.fetched_at = Some(Utc::now());
        }
    }

    fn count(&self) -> usize {
        self.docs.read().unwrap().len()
    }
}
