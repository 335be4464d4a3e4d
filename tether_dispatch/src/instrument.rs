//! Call-count instrumentation.
//!
//! One atomic slot per native entry point, bumped on entry when enabled.
//! The snapshot is the read-only profiling interface dead-code analysis
//! tooling consumes: a wrapper whose slot stays zero across a workload is a
//! candidate for the named-exclusion build switches.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Per-entry-point call counters.
#[derive(Debug)]
pub struct CallCounters {
    enabled: AtomicBool,
    slots: Box<[AtomicU64]>,
}

impl CallCounters {
    /// Counter array with one slot per entry point. Disabled until
    /// [`CallCounters::enable`] is called; recording while disabled is a
    /// single relaxed load.
    pub fn new(entry_points: usize) -> Self {
        let slots = (0..entry_points).map(|_| AtomicU64::new(0)).collect();
        Self {
            enabled: AtomicBool::new(false),
            slots,
        }
    }

    /// Turn recording on.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Turn recording off; counts are kept.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Whether recording is on.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Bump the slot for one entry point. Out-of-range ids are ignored
    /// rather than panicking: the id space is generated and a stale id
    /// must not take down a call path.
    #[inline]
    pub fn record(&self, entry_point: usize) {
        if !self.is_enabled() {
            return;
        }
        if let Some(slot) = self.slots.get(entry_point) {
            slot.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Current count for one entry point.
    pub fn count(&self, entry_point: usize) -> u64 {
        self.slots
            .get(entry_point)
            .map(|s| s.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Copy of all counts, indexed by entry point.
    pub fn snapshot(&self) -> Vec<u64> {
        self.slots
            .iter()
            .map(|s| s.load(Ordering::Relaxed))
            .collect()
    }

    /// Zero every slot.
    pub fn reset(&self) {
        for slot in self.slots.iter() {
            slot.store(0, Ordering::Relaxed);
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the counter array has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
