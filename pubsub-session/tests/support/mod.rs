use pubsub_session::{
    DeliveryMode, LoopbackPublisher, LoopbackTransport, ReliabilityPolicy, ResourceHandle,
    SampleListener, Session, SessionConfig, SubscriptionId,
};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) async fn open_loopback(config: SessionConfig) -> (Session, LoopbackPublisher) {
    let transport = LoopbackTransport::new();
    let publisher = transport.publisher();
    let session = Session::open(config, Arc::new(transport))
        .await
        .expect("loopback session should open");
    (session, publisher)
}

#[allow(dead_code)]
pub(crate) async fn declare_and_subscribe(
    session: &Session,
    expr: &str,
    listener: Arc<dyn SampleListener>,
    reliability: ReliabilityPolicy,
    mode: DeliveryMode,
) -> (ResourceHandle, SubscriptionId) {
    let handle = session
        .declare_expr(expr)
        .await
        .expect("declare should succeed");
    let id = session
        .subscribe(handle, listener, reliability, mode)
        .await
        .expect("subscribe should succeed");
    (handle, id)
}

#[allow(dead_code)]
pub(crate) async fn put_sequence(publisher: &LoopbackPublisher, handle: ResourceHandle, count: u64) {
    for seq in 0..count {
        publisher
            .put(handle, integration_test_utils::sequence_payload(seq))
            .await
            .expect("put should succeed");
    }
}
