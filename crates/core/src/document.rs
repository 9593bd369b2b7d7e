use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique document identifier.
pub type DocId = Uuid;

/// Lifecycle of a document's download from its origin source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Lifecycle of a document's analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// An externally-sourced document tracked by the orchestration core.
///
/// The relational layer owns the full entity graph (versions, metadata);
/// this is the projection the facades operate on: where the document came
/// from, which analyser is responsible for it, and where it stands in the
/// download/analysis lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub id: DocId,
    pub title: String,
    /// Origin URL the document is fetched from. The downloader throttles
    /// per origin host.
    pub origin_url: String,
    /// Name of the registered analyser responsible for this document.
    pub analyser: String,
    /// Fetched body, present once the download completed.
    pub content: Option<String>,
    pub download: DownloadStatus,
    pub analysis: AnalysisStatus,
    pub fetched_at: Option<DateTime<Utc>>,
    pub analysed_at: Option<DateTime<Utc>>,
}

impl CorpusDocument {
    /// New document awaiting download and analysis.
    pub fn new(title: impl Into<String>, origin_url: impl Into<String>, analyser: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            origin_url: origin_url.into(),
            analyser: analyser.into(),
            content: None,
            download: DownloadStatus::Pending,
            analysis: AnalysisStatus::Pending,
            fetched_at: None,
            analysed_at: None,
        }
    }

    /// New document whose body is already present (no download needed).
    pub fn with_content(
        title: impl Into<String>,
        analyser: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut doc = Self::new(title, "", analyser);
        doc.content = Some(content.into());
        doc.download = DownloadStatus::Completed;
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_starts_pending() {
        let doc = CorpusDocument::new("paper", "https://example.org/p.txt", "text-metrics");
        assert_eq!(doc.download, DownloadStatus::Pending);
        assert_eq!(doc.analysis, AnalysisStatus::Pending);
        assert!(doc.content.is_none());
    }

    #[test]
    fn with_content_skips_download() {
        let doc = CorpusDocument::with_content("inline", "text-metrics", "body text");
        assert_eq!(doc.download, DownloadStatus::Completed);
        assert_eq!(doc.analysis, AnalysisStatus::Pending);
        assert_eq!(doc.content.as_deref(), Some("body text"));
    }

    #[test]
    fn status_serde_snake_case() {
        let json = serde_json::to_string(&AnalysisStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
