//! Per-key throttle gate for external resources.
//!
//! One [`ThrottleRegistry`] is constructed by the orchestrator and shared
//! (`Arc`) into every task or facade that talks to a rate-limited resource.
//! A slot is created lazily on first use of a key and lives for the process
//! lifetime. The gate never queues or blocks: callers that observe
//! [`GateDecision::Busy`] decide for themselves whether to retry on a later
//! scheduling pass.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

/// Outcome of a throttle check. `Busy` is a normal scheduling outcome, not
/// an error — it must never end up in an error log as a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The caller won this window and may proceed.
    Ready,
    /// The window has not elapsed; try again on a later pass.
    Busy,
}

impl GateDecision {
    pub fn is_ready(self) -> bool {
        matches!(self, GateDecision::Ready)
    }
}

struct ThrottleSlot {
    last_ready: Option<Instant>,
}

/// Registry of per-key throttle slots.
///
/// The registry mutex is held only to look up or insert a slot; the
/// check-and-set runs under the slot's own mutex, so unrelated keys never
/// serialize behind each other.
pub struct ThrottleRegistry {
    slots: Mutex<HashMap<String, Arc<Mutex<ThrottleSlot>>>>,
}

impl ThrottleRegistry {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Atomically check the key's window: at most one caller observes
    /// `Ready` per `min_interval`; everyone else observes `Busy` until the
    /// window elapses.
    pub fn throttle_or_busy(&self, key: &str, min_interval: Duration) -> GateDecision {
        let slot = {
            let mut slots = self.slots.lock().unwrap();
            Arc::clone(slots.entry(key.to_string()).or_insert_with(|| {
                Arc::new(Mutex::new(ThrottleSlot { last_ready: None }))
            }))
        };

        let mut slot = slot.lock().unwrap();
        match slot.last_ready {
            Some(last) if last.elapsed() < min_interval => {
                debug!(key = %key, "throttle window open, busy");
                GateDecision::Busy
            }
            _ => {
                slot.last_ready = Some(Instant::now());
                debug!(key = %key, "throttle ready");
                GateDecision::Ready
            }
        }
    }

    /// Number of keys seen so far.
    pub fn tracked_keys(&self) -> usize {
        self.slots.lock().unwrap().len()
    }
}

impl Default for ThrottleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
