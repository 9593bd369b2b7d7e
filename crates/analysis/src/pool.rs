//! Bounded, lazily-filled pools of analyser instances.
//!
//! A pool creates at most `capacity` instances over its lifetime and never
//! evicts one — instances are expensive to construct, so a released
//! instance goes back on the idle list for reuse. Acquisition never
//! blocks: a saturated pool answers [`AnalysisError::PoolExhausted`]
//! immediately and the caller retries on a later scheduling pass.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::analyser::{Analyser, AnalyserFactory};
use crate::descriptor::AnalyserDescriptor;
use crate::error::AnalysisError;

struct PoolInner {
    idle: Vec<Box<dyn Analyser>>,
    live: usize,
}

/// One pool per registered analyser descriptor.
pub struct AnalyserPool {
    descriptor: AnalyserDescriptor,
    capacity: usize,
    factory: AnalyserFactory,
    inner: Mutex<PoolInner>,
}

impl AnalyserPool {
    fn new(descriptor: AnalyserDescriptor, factory: AnalyserFactory) -> Self {
        let capacity = descriptor.capacity();
        Self {
            descriptor,
            capacity,
            factory,
            inner: Mutex::new(PoolInner {
                idle: Vec::new(),
                live: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &AnalyserDescriptor {
        &self.descriptor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Instances created so far (idle + leased out).
    pub fn live_instances(&self) -> usize {
        self.inner.lock().unwrap().live
    }

    pub fn idle_instances(&self) -> usize {
        self.inner.lock().unwrap().idle.len()
    }

    /// Lease an instance: reuse an idle one, or lazily create while under
    /// capacity. Saturated and nothing idle → `PoolExhausted`, immediately.
    pub fn acquire(self: &Arc<Self>) -> Result<AnalyserLease, AnalysisError> {
        let instance = {
            let mut inner = self.inner.lock().unwrap();
            if let Some(instance) = inner.idle.pop() {
                Some(instance)
            } else if inner.live >= self.capacity {
                debug!(analyser = %self.descriptor.name, live = inner.live, "pool exhausted");
                return Err(AnalysisError::PoolExhausted(self.descriptor.name.clone()));
            } else {
                // Claim the slot under the lock; construct outside it —
                // construction can be expensive and must not serialize
                // unrelated acquisitions.
                inner.live += 1;
                None
            }
        };

        let instance = match instance {
            Some(instance) => instance,
            None => {
                debug!(analyser = %self.descriptor.name, "creating analyser instance");
                (self.factory)()
            }
        };

        Ok(AnalyserLease {
            pool: Arc::clone(self),
            instance: Some(instance),
        })
    }

    fn release(&self, instance: Box<dyn Analyser>) {
        self.inner.lock().unwrap().idle.push(instance);
    }
}

/// Exclusive lease on one analyser instance; the instance returns to the
/// pool's idle list when the lease drops.
pub struct AnalyserLease {
    pool: Arc<AnalyserPool>,
    instance: Option<Box<dyn Analyser>>,
}

impl AnalyserLease {
    pub fn analyser(&mut self) -> &mut dyn Analyser {
        self.instance
            .as_mut()
            .expect("lease instance taken")
            .as_mut()
    }

    pub fn pool_name(&self) -> &str {
        self.pool.name()
    }
}

impl Drop for AnalyserLease {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.take() {
            self.pool.release(instance);
        }
    }
}

/// Name → pool table, built once at startup from explicit registrations.
pub struct AnalyserRegistry {
    pools: HashMap<String, Arc<AnalyserPool>>,
}

/// Collects registrations and validates them as a whole.
#[derive(Default)]
pub struct AnalyserRegistryBuilder {
    entries: Vec<(AnalyserDescriptor, AnalyserFactory)>,
}

impl AnalyserRegistryBuilder {
    pub fn register(mut self, descriptor: AnalyserDescriptor, factory: AnalyserFactory) -> Self {
        self.entries.push((descriptor, factory));
        self
    }

    /// Validate and build. Duplicate names fail here, at startup, not at
    /// first lookup.
    pub fn build(self) -> Result<AnalyserRegistry, AnalysisError> {
        let mut pools = HashMap::with_capacity(self.entries.len());
        for (descriptor, factory) in self.entries {
            let name = descriptor.name.clone();
            if pools.contains_key(&name) {
                return Err(AnalysisError::DuplicateAnalyser(name));
            }
            info!(
                analyser = %name,
                capacity = descriptor.capacity(),
                enabled = descriptor.enabled,
                "registered analyser"
            );
            pools.insert(name, Arc::new(AnalyserPool::new(descriptor, factory)));
        }
        Ok(AnalyserRegistry { pools })
    }
}

impl AnalyserRegistry {
    pub fn builder() -> AnalyserRegistryBuilder {
        AnalyserRegistryBuilder::default()
    }

    /// Look up a pool by analyser name. Unknown and disabled names are
    /// indistinguishable to callers: both are `NotFound`.
    pub fn get(&self, name: &str) -> Result<Arc<AnalyserPool>, AnalysisError> {
        match self.pools.get(name) {
            Some(pool) if pool.descriptor().enabled => Ok(Arc::clone(pool)),
            _ => Err(AnalysisError::NotFound(name.to_string())),
        }
    }

    /// Lease an instance for the named analyser.
    pub fn acquire(&self, name: &str) -> Result<AnalyserLease, AnalysisError> {
        self.get(name)?.acquire()
    }

    pub fn live_instance_count(&self, name: &str) -> usize {
        self.pools.get(name).map(|p| p.live_instances()).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
