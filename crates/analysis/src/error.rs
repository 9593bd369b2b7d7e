use thiserror::Error;

use corpora_core::DocId;

/// Error surface of the analyser registry, pool, and manager.
///
/// `NotFound` and `PoolExhausted` are returned synchronously to whoever is
/// asking for a slot; neither is fatal — the facade decides whether to
/// skip-and-retry-later. Failures inside an analyser are wrapped into the
/// engine's `TaskFailed` envelope before they reach a callback.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// Unknown or disabled analyser name.
    #[error("No analyser registered for name '{0}'")]
    NotFound(String),

    /// Every instance is live and busy; retry on a later pass.
    #[error("Instance pool exhausted for analyser '{0}'")]
    PoolExhausted(String),

    /// Two registrations share a name — rejected at registry build time.
    #[error("Duplicate analyser name '{0}'")]
    DuplicateAnalyser(String),

    /// The document to analyse is not in the store.
    #[error("Document not found: {0}")]
    DocumentMissing(DocId),

    /// The document has already been analysed; it is never re-analysed.
    #[error("Document already analysed: {0}")]
    AlreadyCompleted(DocId),

    /// Analyser execution failure.
    #[error("Analysis failed: {0}")]
    Failed(String),
}
