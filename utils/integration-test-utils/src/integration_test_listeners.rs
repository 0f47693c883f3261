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

use async_trait::async_trait;
use pubsub_session::{ListenerAction, ListenerError, ListenerResult, Sample, SampleListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Stores every payload it receives, in call order.
#[derive(Clone, Default)]
pub struct RecordingListener {
    payloads: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.payloads.lock().map(|payloads| payloads.len()).unwrap_or(0)
    }

    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads
            .lock()
            .map(|payloads| payloads.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SampleListener for RecordingListener {
    async fn on_sample(&self, sample: Sample) -> ListenerResult {
        if let Ok(mut payloads) = self.payloads.lock() {
            payloads.push(sample.payload().to_vec());
        }
        Ok(ListenerAction::Continue)
    }
}

/// Sleeps before recording, to hold the delivery worker busy.
#[derive(Clone)]
pub struct SlowListener {
    delay: Duration,
    inner: RecordingListener,
}

impl SlowListener {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: RecordingListener::new(),
        }
    }

    pub fn recorder(&self) -> &RecordingListener {
        &self.inner
    }
}

#[async_trait]
impl SampleListener for SlowListener {
    async fn on_sample(&self, sample: Sample) -> ListenerResult {
        tokio::time::sleep(self.delay).await;
        self.inner.on_sample(sample).await
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FaultyListenerKind {
    Errors,
    Panics,
}

/// Fails on every call, either by returning an error or by panicking.
pub struct FaultyListener {
    kind: FaultyListenerKind,
    calls: AtomicUsize,
}

impl FaultyListener {
    pub fn new(kind: FaultyListenerKind) -> Self {
        Self {
            kind,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SampleListener for FaultyListener {
    async fn on_sample(&self, sample: Sample) -> ListenerResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!("faulty listener received sample on {}", sample.handle());
        match self.kind {
            FaultyListenerKind::Errors => Err(ListenerError::new("listener refused sample")),
            FaultyListenerKind::Panics => panic!("listener exploded on purpose"),
        }
    }
}

/// Asks to stop the session once it has seen `limit` samples.
#[derive(Clone)]
pub struct StopAfterListener {
    limit: usize,
    seen: Arc<AtomicUsize>,
}

impl StopAfterListener {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            seen: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn seen(&self) -> usize {
        self.seen.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SampleListener for StopAfterListener {
    async fn on_sample(&self, _sample: Sample) -> ListenerResult {
        let seen = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        if seen >= self.limit {
            Ok(ListenerAction::StopSession)
        } else {
            Ok(ListenerAction::Continue)
        }
    }
}
