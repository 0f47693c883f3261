/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

mod support;

use integration_test_utils::{sequence_of, wait_until, RecordingListener, SlowListener};
use pubsub_session::{DeliveryMode, ReliabilityPolicy, SessionConfig};
use std::sync::Arc;
use std::time::Duration;
use support::{declare_and_subscribe, open_loopback, put_sequence, DELIVERY_TIMEOUT};

fn sequences(listener: &RecordingListener) -> Vec<u64> {
    listener
        .payloads()
        .iter()
        .map(|payload| sequence_of(payload))
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn callbacks_follow_arrival_order() {
    integration_test_utils::init_logging();
    let (session, publisher) = open_loopback(SessionConfig::default()).await;
    let recorder = RecordingListener::new();
    let (handle, _) = declare_and_subscribe(
        &session,
        "/test/order",
        Arc::new(recorder.clone()),
        ReliabilityPolicy::Reliable,
        DeliveryMode::Push,
    )
    .await;

    put_sequence(&publisher, handle, 500).await;

    assert!(wait_until(DELIVERY_TIMEOUT, || recorder.count() == 500).await);
    assert_eq!(sequences(&recorder), (0..500).collect::<Vec<u64>>());
    session.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn two_subscriptions_on_one_handle_both_receive_everything() {
    integration_test_utils::init_logging();
    let (session, publisher) = open_loopback(SessionConfig::default()).await;
    let first = RecordingListener::new();
    let second = RecordingListener::new();
    let (handle, first_id) = declare_and_subscribe(
        &session,
        "/test/fanout",
        Arc::new(first.clone()),
        ReliabilityPolicy::Reliable,
        DeliveryMode::Push,
    )
    .await;
    let second_id = session
        .subscribe(
            handle,
            Arc::new(second.clone()),
            ReliabilityPolicy::BestEffort,
            DeliveryMode::Push,
        )
        .await
        .unwrap();

    assert_ne!(first_id, second_id);
    put_sequence(&publisher, handle, 100).await;

    assert!(
        wait_until(DELIVERY_TIMEOUT, || {
            first.count() == 100 && second.count() == 100
        })
        .await
    );
    assert_eq!(sequences(&first), sequences(&second));
    session.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn reliable_delivery_survives_a_slow_callback() {
    integration_test_utils::init_logging();
    let config = SessionConfig::default().with_ingress_queue_size(2);
    let (session, publisher) = open_loopback(config).await;
    let slow = SlowListener::new(Duration::from_millis(5));
    let (handle, _) = declare_and_subscribe(
        &session,
        "/test/reliable",
        Arc::new(slow.clone()),
        ReliabilityPolicy::Reliable,
        DeliveryMode::Push,
    )
    .await;

    put_sequence(&publisher, handle, 40).await;

    assert!(wait_until(DELIVERY_TIMEOUT, || slow.recorder().count() == 40).await);
    assert_eq!(sequences(slow.recorder()), (0..40).collect::<Vec<u64>>());
    assert_eq!(session.stats().dropped, 0);
    session.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn best_effort_overload_drops_but_stays_live() {
    integration_test_utils::init_logging();
    let config = SessionConfig::default().with_ingress_queue_size(4);
    let (session, publisher) = open_loopback(config).await;
    let slow = SlowListener::new(Duration::from_millis(2));
    let (handle, _) = declare_and_subscribe(
        &session,
        "/test/best-effort",
        Arc::new(slow.clone()),
        ReliabilityPolicy::BestEffort,
        DeliveryMode::Push,
    )
    .await;

    put_sequence(&publisher, handle, 200).await;

    assert!(
        wait_until(DELIVERY_TIMEOUT, || {
            let stats = session.stats();
            stats.delivered + stats.dropped == 200
        })
        .await
    );
    assert!(session.stats().dropped > 0);
    let delivered = sequences(slow.recorder());
    assert!(delivered.windows(2).all(|pair| pair[0] < pair[1]));

    let before = slow.recorder().count();
    publisher
        .put(handle, integration_test_utils::sequence_payload(1_000))
        .await
        .unwrap();
    assert!(wait_until(DELIVERY_TIMEOUT, || slow.recorder().count() == before + 1).await);
    session.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn undeclare_during_delivery_stops_callbacks_for_that_handle() {
    integration_test_utils::init_logging();
    let (session, publisher) = open_loopback(SessionConfig::default()).await;
    let slow = SlowListener::new(Duration::from_millis(10));
    let (handle, _) = declare_and_subscribe(
        &session,
        "/test/undeclare",
        Arc::new(slow.clone()),
        ReliabilityPolicy::Reliable,
        DeliveryMode::Push,
    )
    .await;

    put_sequence(&publisher, handle, 50).await;
    assert!(wait_until(DELIVERY_TIMEOUT, || slow.recorder().count() >= 1).await);

    session.undeclare_expr(handle).await.unwrap();
    let after_undeclare = slow.recorder().count();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(slow.recorder().count(), after_undeclare);
    assert!(after_undeclare < 50);

    let recorder = RecordingListener::new();
    let (fresh, _) = declare_and_subscribe(
        &session,
        "/test/undeclare",
        Arc::new(recorder.clone()),
        ReliabilityPolicy::Reliable,
        DeliveryMode::Push,
    )
    .await;
    assert_ne!(fresh, handle);
    publisher.put(fresh, vec![9u8; 8]).await.unwrap();
    assert!(wait_until(DELIVERY_TIMEOUT, || recorder.count() == 1).await);
    session.close().await.unwrap();
}
