use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time copy of the recorder counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderStats {
    pub ticks: u64,
    pub records_written: u64,
    /// Ticks skipped because no location fix was available.
    pub skipped: u64,
    pub failed_writes: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    ticks: AtomicU64,
    records_written: AtomicU64,
    skipped: AtomicU64,
    failed_writes: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn written(&self) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self) {
        self.failed_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> RecorderStats {
        RecorderStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed_writes: self.failed_writes.load(Ordering::Relaxed),
        }
    }
}
