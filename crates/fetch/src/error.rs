use thiserror::Error;

use corpora_core::DocId;

/// Failure modes of the download path.
///
/// The HTTP-shaped variants (`Http`, `Status`, `EmptyBody`) are produced by
/// the source client and translated into the engine's `TaskFailed`
/// envelope inside the download task — the core never retries HTTP calls.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid origin URL '{0}'")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Origin returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Origin returned an empty body for {0}")]
    EmptyBody(String),

    #[error("Document not found: {0}")]
    DocumentMissing(DocId),

    #[error("Document already downloaded: {0}")]
    AlreadyDownloaded(DocId),

    #[error("Engine rejected the download task: {0}")]
    Engine(String),
}
