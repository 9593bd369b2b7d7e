use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Static declaration of an analyser, registered once at startup and
/// immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyserDescriptor {
    /// Unique analyser name — documents reference it.
    pub name: String,
    /// Entity types this analyser can produce.
    pub produced_entity_types: BTreeSet<String>,
    /// Instance cap. `None` = unbounded.
    pub max_instances: Option<usize>,
    /// With `max_instances = None`, cap instances at the physical core
    /// count instead — analysis work is CPU-bound.
    pub limit_to_physical_cores: bool,
    /// Disabled analysers fail every lookup with NotFound.
    pub enabled: bool,
}

impl AnalyserDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            produced_entity_types: BTreeSet::new(),
            max_instances: None,
            limit_to_physical_cores: false,
            enabled: true,
        }
    }

    pub fn produces(mut self, entity_type: impl Into<String>) -> Self {
        self.produced_entity_types.insert(entity_type.into());
        self
    }

    pub fn with_max_instances(mut self, max: usize) -> Self {
        self.max_instances = Some(max);
        self
    }

    pub fn limit_to_physical_cores(mut self) -> Self {
        self.limit_to_physical_cores = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Resolve the live-instance capacity for this analyser.
    pub fn capacity(&self) -> usize {
        match self.max_instances {
            Some(n) => n,
            None if self.limit_to_physical_cores => num_cpus::get_physical().max(1),
            None => usize::MAX,
        }
    }
}
