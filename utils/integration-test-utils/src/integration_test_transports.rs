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
use pubsub_session::{SampleSink, SessionConfig, SessionError, Transport};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Transport whose peers are never reachable.
pub struct FailingConnectTransport {
    name: String,
}

impl FailingConnectTransport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Transport for FailingConnectTransport {
    async fn connect(&self, config: &SessionConfig, _sink: SampleSink) -> Result<(), SessionError> {
        debug!(
            "{}: refusing connection to peers {:?}",
            self.name,
            config.peers()
        );
        Err(SessionError::Connect(format!(
            "{}: no peer reachable",
            self.name
        )))
    }

    async fn disconnect(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Connects fine but reports an error on every disconnect.
#[derive(Default)]
pub struct FailingDisconnectTransport {
    disconnects: AtomicUsize,
}

impl FailingDisconnectTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FailingDisconnectTransport {
    async fn connect(&self, _config: &SessionConfig, _sink: SampleSink) -> Result<(), SessionError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SessionError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Err(SessionError::Connect("link already gone".to_string()))
    }
}
