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

use integration_test_utils::{
    wait_until, FaultyListener, FaultyListenerKind, RecordingListener, StopAfterListener,
};
use pubsub_session::{DeliveryMode, ReliabilityPolicy, SessionConfig, SessionError};
use std::sync::Arc;
use support::{declare_and_subscribe, open_loopback, put_sequence, DELIVERY_TIMEOUT};

#[tokio::test(flavor = "multi_thread")]
async fn stop_session_closes_the_session_cooperatively() {
    integration_test_utils::init_logging();
    let (session, publisher) = open_loopback(SessionConfig::default()).await;
    let stopper = StopAfterListener::new(3);
    let (handle, _) = declare_and_subscribe(
        &session,
        "/test/stop",
        Arc::new(stopper.clone()),
        ReliabilityPolicy::Reliable,
        DeliveryMode::Push,
    )
    .await;

    for seq in 0..10u64 {
        // later puts race with the teardown and may be refused
        let _ = publisher
            .put(handle, integration_test_utils::sequence_payload(seq))
            .await;
    }

    tokio::time::timeout(DELIVERY_TIMEOUT, session.closed())
        .await
        .expect("session should close after StopSession");

    assert!(session.is_closed());
    assert_eq!(stopper.seen(), 3);
    assert_eq!(
        publisher.put(handle, vec![0u8; 8]).await,
        Err(SessionError::SessionClosed)
    );
    assert_eq!(
        session.declare_expr("/test/stop").await,
        Err(SessionError::SessionClosed)
    );
    assert_eq!(session.close().await, Ok(()));
}

#[tokio::test(flavor = "multi_thread")]
async fn panicking_subscriber_does_not_starve_its_neighbour() {
    integration_test_utils::init_logging();
    let (session, publisher) = open_loopback(SessionConfig::default()).await;
    let faulty = Arc::new(FaultyListener::new(FaultyListenerKind::Panics));
    let recorder = RecordingListener::new();
    let (handle, _) = declare_and_subscribe(
        &session,
        "/test/faults",
        faulty.clone(),
        ReliabilityPolicy::Reliable,
        DeliveryMode::Push,
    )
    .await;
    session
        .subscribe(
            handle,
            Arc::new(recorder.clone()),
            ReliabilityPolicy::Reliable,
            DeliveryMode::Push,
        )
        .await
        .unwrap();

    put_sequence(&publisher, handle, 10).await;

    assert!(wait_until(DELIVERY_TIMEOUT, || recorder.count() == 10).await);
    assert_eq!(faulty.calls(), 10);
    assert_eq!(session.stats().faults, 10);
    assert!(!session.is_closed());
    session.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn erroring_subscriber_is_counted_and_isolated() {
    integration_test_utils::init_logging();
    let (session, publisher) = open_loopback(SessionConfig::default()).await;
    let faulty = Arc::new(FaultyListener::new(FaultyListenerKind::Errors));
    let (handle, _) = declare_and_subscribe(
        &session,
        "/test/errors",
        faulty.clone(),
        ReliabilityPolicy::BestEffort,
        DeliveryMode::Push,
    )
    .await;

    put_sequence(&publisher, handle, 5).await;

    assert!(wait_until(DELIVERY_TIMEOUT, || session.stats().faults == 5).await);
    assert_eq!(faulty.calls(), 5);
    session.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn unsubscribe_stops_further_callbacks() {
    integration_test_utils::init_logging();
    let (session, publisher) = open_loopback(SessionConfig::default()).await;
    let recorder = RecordingListener::new();
    let (handle, id) = declare_and_subscribe(
        &session,
        "/test/unsubscribe",
        Arc::new(recorder.clone()),
        ReliabilityPolicy::Reliable,
        DeliveryMode::Push,
    )
    .await;

    put_sequence(&publisher, handle, 3).await;
    assert!(wait_until(DELIVERY_TIMEOUT, || recorder.count() == 3).await);

    session.unsubscribe(id).await.unwrap();
    put_sequence(&publisher, handle, 3).await;
    assert!(wait_until(DELIVERY_TIMEOUT, || session.stats().discarded == 3).await);

    assert_eq!(recorder.count(), 3);
    session.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn dropping_an_open_session_releases_the_transport() {
    integration_test_utils::init_logging();
    let (session, publisher) = open_loopback(SessionConfig::default()).await;
    let handle = session.declare_expr("/test/drop").await.unwrap();

    drop(session);

    let mut released = false;
    for _ in 0..200 {
        if publisher.put(handle, vec![0u8; 8]).await == Err(SessionError::SessionClosed) {
            released = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert!(released);
}

#[tokio::test(flavor = "multi_thread")]
async fn dropping_a_session_with_a_producer_held_by_a_full_pull_buffer_tears_down() {
    integration_test_utils::init_logging();
    let config = SessionConfig::default().with_pull_buffer_capacity(1);
    let (session, publisher) = open_loopback(config).await;
    let (handle, _) = declare_and_subscribe(
        &session,
        "/test/drop-pull",
        Arc::new(RecordingListener::new()),
        ReliabilityPolicy::Reliable,
        DeliveryMode::Pull,
    )
    .await;

    let producer = {
        let publisher = publisher.clone();
        tokio::spawn(async move {
            for seq in 0..3u64 {
                let put = publisher
                    .put(handle, integration_test_utils::sequence_payload(seq))
                    .await;
                if put.is_err() {
                    return put;
                }
            }
            Ok(())
        })
    };
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    drop(session);

    let put = tokio::time::timeout(DELIVERY_TIMEOUT, producer)
        .await
        .expect("teardown must release the waiting producer")
        .unwrap();
    assert_eq!(put, Err(SessionError::SessionClosed));

    let mut disconnected = false;
    for _ in 0..200 {
        if !publisher.is_connected().await {
            disconnected = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert!(disconnected, "dropped session must release the transport");
}
