//! Delivery counters shared by the ingress sink and the delivery worker.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of a session's delivery counters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SessionStats {
    /// Listener invocations that returned, successfully or not.
    pub delivered: u64,
    /// Samples dropped by best-effort backpressure, in the ingress queue or a pull buffer.
    pub dropped: u64,
    /// Samples discarded for an invalid handle or no active subscriber.
    pub discarded: u64,
    /// Listener invocations that returned an error or panicked.
    pub faults: u64,
}

#[derive(Default)]
pub(crate) struct DeliveryCounters {
    delivered: AtomicU64,
    dropped: AtomicU64,
    discarded: AtomicU64,
    faults: AtomicU64,
}

impl DeliveryCounters {
    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SessionStats {
        SessionStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
        }
    }
}
