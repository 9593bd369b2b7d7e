//! Analyser manager — the domain facade over engine + instance pools.
//!
//! Policy: analysis work runs at `Low` priority (CPU-bound bulk work), a
//! completed document is never re-analysed, a document whose pool is
//! saturated is skipped this cycle and stays eligible for the next one,
//! and a document referencing an unknown analyser is marked failed — it
//! could never succeed, unlike a capacity miss.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, warn};

use corpora_core::{AnalysisStatus, CorpusDocument, DocId, DocumentStore};
use corpora_engine::{
    CompletionCallback, EngineError, ErrorCallback, TaskContext, TaskEngine, TaskHandle,
    TaskPriority, TaskReport, TaskWork,
};

use crate::error::AnalysisError;
use crate::pool::{AnalyserLease, AnalyserRegistry};

/// Result of one activation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActivationSummary {
    /// Tasks submitted this pass.
    pub activated: usize,
    /// Documents skipped for capacity; they stay pending and are retried
    /// on a later pass.
    pub skipped: usize,
    /// Documents that can never be processed (unknown analyser, missing
    /// content) and were marked failed.
    pub failed: usize,
}

/// Task that runs one leased analyser instance over one document.
struct AnalysisWork {
    name: String,
    doc: CorpusDocument,
    lease: Mutex<Option<AnalyserLease>>,
}

impl TaskWork for AnalysisWork {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &TaskContext) -> Result<TaskReport, EngineError> {
        if ctx.cancel_requested() {
            return Err(EngineError::failed("analysis cancelled before it began"));
        }
        let mut lease = self
            .lease
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| EngineError::failed("analysis lease already consumed"))?;

        let started = Instant::now();
        let report = lease
            .analyser()
            .analyse(&self.doc)
            .map_err(|e| EngineError::failed(e.to_string()))?;
        // the lease drops here and the instance returns to its pool

        let mut task_report =
            TaskReport::new(&self.name, started.elapsed(), report.entities.len());
        if let Some(detail) = report.detail {
            task_report = task_report.with_detail(detail);
        }
        Ok(task_report)
    }
}

/// Facade composing the task engine, the analyser registry/pools, and the
/// document store.
pub struct AnalyserManager {
    engine: Arc<TaskEngine>,
    registry: Arc<AnalyserRegistry>,
    store: Arc<dyn DocumentStore>,
    in_flight: Mutex<HashMap<DocId, Arc<TaskHandle>>>,
}

impl AnalyserManager {
    pub fn new(
        engine: Arc<TaskEngine>,
        registry: Arc<AnalyserRegistry>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            engine,
            registry,
            store,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Submit an analysis task for one document. Capacity and lookup
    /// failures surface synchronously; execution failures arrive via the
    /// document's status and the returned handle.
    pub fn analyse(&self, id: DocId) -> Result<Arc<TaskHandle>, AnalysisError> {
        let doc = self.store.get(id).ok_or(AnalysisError::DocumentMissing(id))?;
        if doc.analysis == AnalysisStatus::Completed {
            return Err(AnalysisError::AlreadyCompleted(id));
        }

        let pool = self.registry.get(&doc.analyser)?;
        let lease = pool.acquire()?;

        let name = format!("analyse:{}", doc.analyser);
        self.store.set_analysis_status(id, AnalysisStatus::Running);

        let complete_store = Arc::clone(&self.store);
        let on_complete: CompletionCallback = Box::new(move |_handle| {
            complete_store.set_analysis_status(id, AnalysisStatus::Completed);
        });
        let error_store = Arc::clone(&self.store);
        let on_error: ErrorCallback = Box::new(move |handle, error| {
            warn!(task = %handle.name(), error = %error, "analysis task failed");
            error_store.set_analysis_status(id, AnalysisStatus::Failed);
        });

        let work = Box::new(AnalysisWork {
            name,
            doc,
            lease: Mutex::new(Some(lease)),
        });

        match self
            .engine
            .submit_with_callbacks(work, TaskPriority::Low, Some(on_complete), Some(on_error))
        {
            Ok(handle) => {
                if !handle.state().is_terminal() {
                    self.in_flight
                        .lock()
                        .unwrap()
                        .insert(id, Arc::clone(&handle));
                }
                Ok(handle)
            }
            Err(e) => {
                // the dropped work returned its lease to the pool already
                self.store.set_analysis_status(id, AnalysisStatus::Pending);
                Err(AnalysisError::Failed(e.to_string()))
            }
        }
    }

    /// Activate up to `max` pending analyses. Capacity misses are skipped,
    /// not queued; permanently hopeless documents are marked failed.
    pub fn activate_pending(&self, max: usize) -> ActivationSummary {
        self.prune_in_flight();

        let mut summary = ActivationSummary::default();
        for doc in self.store.pending_analyses(max) {
            match self.analyse(doc.id) {
                Ok(_) => summary.activated += 1,
                Err(AnalysisError::PoolExhausted(name)) => {
                    debug!(analyser = %name, doc = %doc.id, "pool saturated, skipping this cycle");
                    summary.skipped += 1;
                }
                Err(AnalysisError::NotFound(name)) => {
                    warn!(analyser = %name, doc = %doc.id, "no such analyser, marking document failed");
                    self.store.set_analysis_status(doc.id, AnalysisStatus::Failed);
                    summary.failed += 1;
                }
                Err(AnalysisError::AlreadyCompleted(_)) => {}
                Err(e) => {
                    warn!(doc = %doc.id, error = %e, "activation failed");
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
        self.store.set_analysis_status(id, AnalysisStatus::Cancelled);
        prevented
    }

    pub fn live_instance_count(&self, analyser: &str) -> usize {
        self.registry.live_instance_count(analyser)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }

    fn prune_in_flight(&self) {
        self.in_flight
            .lock()
            .unwrap()
            .retain(|_, handle| !handle.state().is_terminal());
    }
}
