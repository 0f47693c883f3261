//! Ingress sink handed to the transport at connect time.

use crate::control_plane::session_state::SessionShared;
use crate::data_plane::pull_buffer::PullReservation;
use crate::error::SessionError;
use crate::observability::events;
use crate::routing::subscription_registry::SubscriptionId;
use crate::sample::Sample;
use std::sync::Weak;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

const COMPONENT: &str = "sample_sink";

/// A sample on its way to the delivery worker, with the reliable pull slots
/// already claimed for it.
pub(crate) struct IngressSample {
    sample: Sample,
    reservations: Vec<PullReservation>,
}

impl IngressSample {
    pub(crate) fn sample(&self) -> &Sample {
        &self.sample
    }

    /// Splits into the sample and its reservations.
    pub(crate) fn into_parts(self) -> (Sample, Vec<PullReservation>) {
        (self.sample, self.reservations)
    }
}

impl From<Sample> for IngressSample {
    fn from(sample: Sample) -> Self {
        Self {
            sample,
            reservations: Vec::new(),
        }
    }
}

/// Removes and returns the reservation made for `subscription`, if any.
pub(crate) fn take_reservation(
    reservations: &mut Vec<PullReservation>,
    subscription: SubscriptionId,
) -> Option<PullReservation> {
    let position = reservations
        .iter()
        .position(|reservation| reservation.subscription() == subscription)?;
    Some(reservations.swap_remove(position))
}

/// Entry point through which a [`Transport`](crate::Transport) hands inbound
/// samples to the session.
///
/// Samples for a handle with at least one reliable subscription wait for room in
/// the bounded ingress queue, which back-pressures the transport. A full reliable
/// pull buffer on the handle holds the producer here until the subscriber pulls,
/// so the delivery worker never waits on it. All other samples are dropped and
/// counted when the queue is full.
#[derive(Clone)]
pub struct SampleSink {
    sender: mpsc::Sender<IngressSample>,
    shared: Weak<SessionShared>,
}

impl SampleSink {
    pub(crate) fn new(sender: mpsc::Sender<IngressSample>, shared: Weak<SessionShared>) -> Self {
        Self { sender, shared }
    }

    /// Queues a sample for delivery.
    ///
    /// Fails with [`SessionError::SessionClosed`] once the owning session has
    /// started closing or has been dropped.
    pub async fn deliver(&self, sample: Sample) -> Result<(), SessionError> {
        let Some(shared) = self.shared.upgrade() else {
            return Err(SessionError::SessionClosed);
        };
        if shared.is_closing() {
            return Err(SessionError::SessionClosed);
        }

        let (reliable, reliable_pulls) = {
            let tables = shared.tables().read().await;
            (
                tables.subscriptions.has_reliable(sample.handle()),
                tables.subscriptions.reliable_pulls(sample.handle()),
            )
        };

        if reliable {
            drop(shared);

            let mut reservations = Vec::with_capacity(reliable_pulls.len());
            for entry in reliable_pulls {
                let Some(buffer) = entry.pull_buffer() else {
                    continue;
                };
                if let Some(reservation) = buffer.reserve(entry.id()).await {
                    reservations.push(reservation);
                }
            }
            if !self.is_open() {
                return Err(SessionError::SessionClosed);
            }

            return self
                .sender
                .send(IngressSample {
                    sample,
                    reservations,
                })
                .await
                .map_err(|_| SessionError::SessionClosed);
        }

        match self.sender.try_send(sample.into()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(ingress)) => {
                shared.counters().record_dropped();
                debug!(
                    event = events::INGRESS_DROP_QUEUE_FULL,
                    component = COMPONENT,
                    session_id = shared.session_id(),
                    handle = %ingress.sample().handle(),
                    "ingress queue full; dropping best-effort sample"
                );
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(SessionError::SessionClosed),
        }
    }

    /// `true` while the owning session accepts samples.
    pub fn is_open(&self) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| !shared.is_closing())
            && !self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::{take_reservation, SampleSink};
    use crate::config::SessionConfig;
    use crate::control_plane::session_state::SessionShared;
    use crate::error::SessionError;
    use crate::listener::{listener_fn, ListenerAction};
    use crate::observability::fields;
    use crate::routing::subscription_registry::{DeliveryMode, ReliabilityPolicy};
    use crate::sample::Sample;
    use crate::transport::LoopbackTransport;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn shared() -> Arc<SessionShared> {
        Arc::new(SessionShared::new(
            "sink-test".to_string(),
            Arc::new(SessionConfig::default()),
            Arc::new(LoopbackTransport::new()),
        ))
    }

    #[tokio::test]
    async fn best_effort_samples_are_dropped_when_queue_is_full() {
        let shared = shared();
        let handle = shared.tables().write().await.resources.declare("/be").unwrap();
        let (sender, mut receiver) = mpsc::channel(1);
        let sink = SampleSink::new(sender, Arc::downgrade(&shared));

        sink.deliver(Sample::new(handle, vec![1])).await.unwrap();
        sink.deliver(Sample::new(handle, vec![2])).await.unwrap();

        assert_eq!(shared.counters().snapshot().dropped, 1);
        assert_eq!(receiver.recv().await.unwrap().sample().payload(), &[1]);
    }

    #[tokio::test]
    async fn reliable_samples_wait_for_queue_room() {
        let shared = shared();
        let handle = {
            let mut guard = shared.tables().write().await;
            let tables = &mut *guard;
            let handle = tables.resources.declare("/rel").unwrap();
            tables
                .subscriptions
                .register(
                    &tables.resources,
                    handle,
                    ReliabilityPolicy::Reliable,
                    DeliveryMode::Push,
                    listener_fn(|_| Ok(ListenerAction::Continue)),
                    1,
                )
                .unwrap();
            handle
        };
        let (sender, mut receiver) = mpsc::channel(1);
        let sink = SampleSink::new(sender, Arc::downgrade(&shared));

        sink.deliver(Sample::new(handle, vec![1])).await.unwrap();
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), sink.deliver(Sample::new(handle, vec![2])))
                .await;
        assert!(blocked.is_err(), "reliable delivery must wait instead of dropping");

        assert_eq!(receiver.recv().await.unwrap().sample().payload(), &[1]);
        sink.deliver(Sample::new(handle, vec![3])).await.unwrap();
        assert_eq!(receiver.recv().await.unwrap().sample().payload(), &[3]);
        assert_eq!(shared.counters().snapshot().dropped, 0);
    }

    #[tokio::test]
    async fn full_reliable_pull_buffer_holds_the_producer_not_the_queue() {
        let shared = shared();
        let (handle, pull) = {
            let mut guard = shared.tables().write().await;
            let tables = &mut *guard;
            let handle = tables.resources.declare("/pull").unwrap();
            let pull = tables
                .subscriptions
                .register(
                    &tables.resources,
                    handle,
                    ReliabilityPolicy::Reliable,
                    DeliveryMode::Pull,
                    listener_fn(|_| Ok(ListenerAction::Continue)),
                    1,
                )
                .unwrap();
            (handle, pull)
        };
        let (sender, mut receiver) = mpsc::channel(8);
        let sink = SampleSink::new(sender, Arc::downgrade(&shared));

        sink.deliver(Sample::new(handle, vec![1])).await.unwrap();
        let (first, mut reservations) = receiver.recv().await.unwrap().into_parts();
        assert_eq!(first.payload(), &[1]);
        let reservation = take_reservation(&mut reservations, pull.id());
        assert!(reservation.is_some());
        assert!(reservations.is_empty());
        let buffer = pull.pull_buffer().unwrap();
        buffer.push(first, reservation).await;

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), sink.deliver(Sample::new(handle, vec![2])))
                .await;
        assert!(blocked.is_err(), "producer must wait for a free pull slot");
        assert!(receiver.try_recv().is_err(), "nothing may reach the worker unreserved");

        assert_eq!(buffer.pop().await.unwrap().payload(), &[1]);
        sink.deliver(Sample::new(handle, vec![3])).await.unwrap();
        let (third, reservations) = receiver.recv().await.unwrap().into_parts();
        assert_eq!(third.payload(), &[3]);
        assert_eq!(reservations.len(), 1);
    }

    #[tokio::test]
    async fn closed_or_dropped_session_rejects_samples() {
        let shared = shared();
        let (sender, _receiver) = mpsc::channel(4);
        let sink = SampleSink::new(sender, Arc::downgrade(&shared));
        let handle = shared.tables().write().await.resources.declare("/gone").unwrap();

        shared.teardown(fields::REASON_CLOSE_REQUESTED).await;
        assert_eq!(
            sink.deliver(Sample::new(handle, vec![1])).await,
            Err(SessionError::SessionClosed)
        );
        assert!(!sink.is_open());

        drop(shared);
        assert_eq!(
            sink.deliver(Sample::new(handle, vec![1])).await,
            Err(SessionError::SessionClosed)
        );
    }
}
