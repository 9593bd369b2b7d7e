use serde::Serialize;

use corpora_core::CorpusDocument;

use crate::error::AnalysisError;

/// An entity pulled out of a document by an analyser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedEntity {
    pub entity_type: String,
    pub value: String,
}

impl ExtractedEntity {
    pub fn new(entity_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            value: value.into(),
        }
    }
}

/// What one analysis pass produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Name of the analyser that produced this report.
    pub analyser: String,
    pub entities: Vec<ExtractedEntity>,
    /// Optional human-readable summary.
    pub detail: Option<String>,
}

/// A pluggable analysis unit.
///
/// Instances may hold expensive state (models, dictionaries, native
/// handles), which is why they are pooled and reused instead of rebuilt per
/// document. `&mut self` because an instance is exclusively leased to one
/// task at a time.
pub trait Analyser: Send {
    fn analyse(&mut self, doc: &CorpusDocument) -> Result<AnalysisReport, AnalysisError>;
}

/// Factory invoked by the pool to lazily create instances up to capacity.
pub type AnalyserFactory = Box<dyn Fn() -> Box<dyn Analyser> + Send + Sync>;
