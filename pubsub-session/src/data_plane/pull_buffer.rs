//! Bounded FIFO buffer backing one pull-mode subscription.

use crate::routing::subscription_registry::{ReliabilityPolicy, SubscriptionId};
use crate::sample::Sample;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum PullPushOutcome {
    Buffered,
    /// The buffer was full and its oldest sample was discarded.
    DroppedOldest,
    /// A reliable buffer got a sample without a slot reserved for it.
    Unreserved,
    /// The subscription was deactivated; the sample was not buffered.
    Closed,
}

/// Slot claimed in a reliable pull buffer by the producer, before the sample
/// entered the ingress queue. Dropping it unused hands the slot back.
pub(crate) struct PullReservation {
    subscription: SubscriptionId,
    permit: OwnedSemaphorePermit,
}

impl PullReservation {
    pub(crate) fn subscription(&self) -> SubscriptionId {
        self.subscription
    }
}

/// Overflow policy follows the subscription's reliability: best-effort drops the
/// oldest sample, reliable makes the producer wait in [`PullBuffer::reserve`]
/// until a slot frees up. Pushing never waits for capacity.
pub(crate) struct PullBuffer {
    reliability: ReliabilityPolicy,
    capacity: usize,
    queue: Mutex<VecDeque<Sample>>,
    free_slots: Arc<Semaphore>,
}

impl PullBuffer {
    pub(crate) fn new(capacity: usize, reliability: ReliabilityPolicy) -> Self {
        Self {
            reliability,
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            free_slots: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// Waits for a free slot in a reliable buffer.
    ///
    /// Returns `None` for best-effort buffers and once the buffer is closed.
    pub(crate) async fn reserve(&self, subscription: SubscriptionId) -> Option<PullReservation> {
        if self.reliability != ReliabilityPolicy::Reliable {
            return None;
        }
        let permit = self.free_slots.clone().acquire_owned().await.ok()?;
        Some(PullReservation {
            subscription,
            permit,
        })
    }

    pub(crate) async fn push(
        &self,
        sample: Sample,
        reservation: Option<PullReservation>,
    ) -> PullPushOutcome {
        if self.free_slots.is_closed() {
            return PullPushOutcome::Closed;
        }

        match self.reliability {
            ReliabilityPolicy::BestEffort => {
                let mut queue = self.queue.lock().await;
                let outcome = if queue.len() >= self.capacity {
                    queue.pop_front();
                    PullPushOutcome::DroppedOldest
                } else {
                    PullPushOutcome::Buffered
                };
                queue.push_back(sample);
                outcome
            }
            ReliabilityPolicy::Reliable => {
                let Some(reservation) = reservation else {
                    return PullPushOutcome::Unreserved;
                };
                // the slot is handed back by `pop`
                reservation.permit.forget();
                self.queue.lock().await.push_back(sample);
                PullPushOutcome::Buffered
            }
        }
    }

    /// Dequeues the oldest buffered sample.
    pub(crate) async fn pop(&self) -> Option<Sample> {
        let sample = self.queue.lock().await.pop_front();
        if sample.is_some() && self.reliability == ReliabilityPolicy::Reliable {
            self.free_slots.add_permits(1);
        }
        sample
    }

    /// Wakes a producer waiting in `reserve`; later pushes are refused.
    pub(crate) fn close(&self) {
        self.free_slots.close();
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }
}
