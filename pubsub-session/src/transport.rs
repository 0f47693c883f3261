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

//! Transport seam and the in-process loopback implementation.

use crate::config::SessionConfig;
use crate::control_plane::resource_table::ResourceHandle;
use crate::data_plane::sample_sink::SampleSink;
use crate::error::SessionError;
use crate::sample::Sample;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

const COMPONENT: &str = "loopback_transport";

/// The network side of a session.
///
/// `connect` receives the session's [`SampleSink`]; every inbound sample must be
/// handed to it. `disconnect` must be safe to call more than once.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, config: &SessionConfig, sink: SampleSink) -> Result<(), SessionError>;

    async fn disconnect(&self) -> Result<(), SessionError>;
}

enum LoopbackState {
    Idle,
    Connected(SampleSink),
    Disconnected,
}

/// Transport that feeds samples published in the same process straight into the
/// connected session.
pub struct LoopbackTransport {
    state: Arc<RwLock<LoopbackState>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(LoopbackState::Idle)),
        }
    }

    /// Returns a publisher bound to this transport. Publishers may be created
    /// before the session connects and outlive it.
    pub fn publisher(&self) -> LoopbackPublisher {
        LoopbackPublisher {
            state: self.state.clone(),
        }
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn connect(&self, config: &SessionConfig, sink: SampleSink) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        if matches!(*state, LoopbackState::Connected(_)) {
            return Err(SessionError::Connect(
                "loopback transport is already connected".to_string(),
            ));
        }

        *state = LoopbackState::Connected(sink);
        info!(
            component = COMPONENT,
            mode = %config.mode(),
            peers = config.peers().len(),
            listeners = config.listeners().len(),
            "loopback transport connected"
        );
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        if matches!(*state, LoopbackState::Connected(_)) {
            debug!(component = COMPONENT, "loopback transport disconnected");
            *state = LoopbackState::Disconnected;
        }
        Ok(())
    }
}

/// Publishing end of a [`LoopbackTransport`].
#[derive(Clone)]
pub struct LoopbackPublisher {
    state: Arc<RwLock<LoopbackState>>,
}

impl LoopbackPublisher {
    /// Publishes `payload` on `handle`.
    ///
    /// Fails with `Connect` before any session connected and with
    /// `SessionClosed` once it has disconnected.
    pub async fn put(
        &self,
        handle: ResourceHandle,
        payload: impl Into<Arc<[u8]>>,
    ) -> Result<(), SessionError> {
        let sink = match &*self.state.read().await {
            LoopbackState::Idle => {
                return Err(SessionError::Connect(
                    "loopback transport is not connected".to_string(),
                ))
            }
            LoopbackState::Connected(sink) => sink.clone(),
            LoopbackState::Disconnected => return Err(SessionError::SessionClosed),
        };

        // the state lock is released here so a blocked put never stalls disconnect
        sink.deliver(Sample::new(handle, payload)).await
    }

    pub async fn is_connected(&self) -> bool {
        matches!(*self.state.read().await, LoopbackState::Connected(_))
    }
}
