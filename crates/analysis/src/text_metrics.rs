//! Built-in plain-text analyser.
//!
//! Counts words and lines and captures capitalised tokens as crude keyword
//! entities. Deliberately cheap — it exists so deployments have a working
//! analyser out of the box and the pool/facade path is exercised end to
//! end.

use std::collections::BTreeSet;

use corpora_core::CorpusDocument;

use crate::analyser::{AnalysisReport, Analyser, ExtractedEntity};
use crate::descriptor::AnalyserDescriptor;
use crate::error::AnalysisError;

/// Name the analyser registers under.
pub const TEXT_METRICS: &str = "text-metrics";

/// Cap on captured keyword entities per document.
const MAX_KEYWORDS: usize = 16;

pub struct TextMetricsAnalyser;

impl TextMetricsAnalyser {
    /// Descriptor for startup registration. Text analysis is CPU-bound, so
    /// instances are capped at the physical core count.
    pub fn descriptor() -> AnalyserDescriptor {
        AnalyserDescriptor::new(TEXT_METRICS)
            .produces("keyword")
            .limit_to_physical_cores()
    }
}

impl Analyser for TextMetricsAnalyser {
    fn analyse(&mut self, doc: &CorpusDocument) -> Result<AnalysisReport, AnalysisError> {
        let body = doc
            .content
            .as_deref()
            .ok_or_else(|| AnalysisError::Failed(format!("document {} has no content", doc.id)))?;

        let words = body.split_whitespace().count();
        let lines = body.lines().count();

        let mut seen = BTreeSet::new();
        let mut entities = Vec::new();
        for token in body.split_whitespace() {
            let token = token.trim_matches(|c: char| !c.is_alphanumeric());
            if token.len() > 3
                && token.chars().next().is_some_and(|c| c.is_uppercase())
                && seen.insert(token.to_string())
            {
                entities.push(ExtractedEntity::new("keyword", token));
                if entities.len() == MAX_KEYWORDS {
                    break;
                }
            }
        }

        Ok(AnalysisReport {
            analyser: TEXT_METRICS.to_string(),
            entities,
            detail: Some(format!("{words} words, {lines} lines")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_and_lines() {
        let doc = CorpusDocument::with_content("t", TEXT_METRICS, "Hello world\nSecond Line here");
        let report = TextMetricsAnalyser.analyse(&doc).unwrap();
        assert_eq!(report.detail.as_deref(), Some("5 words, 2 lines"));
    }

    #[test]
    fn captures_capitalised_keywords_once() {
        let doc = CorpusDocument::with_content("t", TEXT_METRICS, "Paris is big. Paris is old. Tokyo too.");
        let report = TextMetricsAnalyser.analyse(&doc).unwrap();
        let values: Vec<&str> = report.entities.iter().map(|e| e.value.as_str()).collect();
        assert_eq!(values, ["Paris", "Tokyo"]);
    }

    #[test]
    fn missing_content_fails() {
        let doc = CorpusDocument::new("t", "https://example.org/x", TEXT_METRICS);
        assert!(matches!(
            TextMetricsAnalyser.analyse(&doc),
            Err(AnalysisError::Failed(_))
        ));
    }
}
