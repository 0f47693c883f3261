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

//! Public session facade.

use crate::config::SessionConfig;
use crate::control_plane::resource_table::ResourceHandle;
use crate::control_plane::session_state::SessionShared;
use crate::data_plane::delivery_stats::SessionStats;
use crate::data_plane::delivery_worker::DeliveryWorker;
use crate::data_plane::listener_invocation::{invoke_listener, record_outcome};
use crate::data_plane::sample_sink::SampleSink;
use crate::error::SessionError;
use crate::listener::{ListenerAction, SampleListener};
use crate::observability::{events, fields};
use crate::routing::subscription_registry::{
    DeliveryMode, ReliabilityPolicy, SubscriptionId,
};
use crate::transport::Transport;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const COMPONENT: &str = "session";

/// A live connection to the publish/subscribe fabric.
///
/// A `Session` is only obtainable from a successful [`Session::open`] and moves
/// strictly from open to closed. Dropping an open session closes it in the
/// background; call [`Session::close`] to wait for the teardown to finish.
pub struct Session {
    shared: Arc<SessionShared>,
    worker: DeliveryWorker,
}

impl Session {
    /// Validates `config`, connects `transport` and starts the delivery worker.
    ///
    /// # Errors
    ///
    /// `Config` for invalid configuration, whatever the transport reports from
    /// `connect` (normally `Connect`), and `Runtime` if the worker thread cannot
    /// be started.
    pub async fn open(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, SessionError> {
        let session_id = Uuid::new_v4().hyphenated().to_string();

        if let Err(err) = config.validate() {
            warn!(
                event = events::SESSION_OPEN_FAILED,
                component = COMPONENT,
                session_id = session_id.as_str(),
                err = %err,
                "rejecting session configuration"
            );
            return Err(err);
        }

        let config = Arc::new(config);
        let (sample_sender, sample_receiver) = mpsc::channel(config.ingress_queue_size());
        let shared = Arc::new(SessionShared::new(
            session_id,
            config.clone(),
            transport.clone(),
        ));
        let sink = SampleSink::new(sample_sender, Arc::downgrade(&shared));

        if let Err(err) = transport.connect(&config, sink).await {
            warn!(
                event = events::SESSION_OPEN_FAILED,
                component = COMPONENT,
                session_id = shared.session_id(),
                err = %err,
                "transport connect failed"
            );
            return Err(err);
        }
        debug!(
            event = events::TRANSPORT_CONNECT_OK,
            component = COMPONENT,
            session_id = shared.session_id(),
            "transport connected"
        );

        let worker = match DeliveryWorker::spawn(shared.clone(), sample_receiver).await {
            Ok(worker) => worker,
            Err(err) => {
                let _ = transport.disconnect().await;
                return Err(err);
            }
        };

        info!(
            event = events::SESSION_OPEN_OK,
            component = COMPONENT,
            session_id = shared.session_id(),
            mode = %config.mode(),
            worker_id = worker.worker_id(),
            worker_thread = worker.runtime_thread(),
            "session opened"
        );

        Ok(Self { shared, worker })
    }

    /// Maps a resource expression to a compact handle.
    ///
    /// Declaring the same expression again returns the same handle.
    pub async fn declare_expr(&self, expr: &str) -> Result<ResourceHandle, SessionError> {
        let mut tables = self.shared.tables().write().await;
        if self.shared.is_closing() {
            return Err(SessionError::SessionClosed);
        }

        let handle = tables.resources.declare(expr)?;
        debug!(
            event = events::RESOURCE_DECLARE_OK,
            component = COMPONENT,
            session_id = self.shared.session_id(),
            expr,
            handle = %handle,
            "resource declared"
        );
        Ok(handle)
    }

    /// Invalidates `handle` and deactivates every subscription bound to it.
    ///
    /// When called outside a listener, no callback for those subscriptions runs
    /// after this returns.
    pub async fn undeclare_expr(&self, handle: ResourceHandle) -> Result<(), SessionError> {
        let (expr, retired) = {
            let mut tables = self.shared.tables().write().await;
            if self.shared.is_closing() {
                return Err(SessionError::SessionClosed);
            }
            let expr = tables.resources.undeclare(handle)?;
            let retired = tables.subscriptions.deactivate_handle(handle);
            (expr, retired)
        };
        self.shared.retire_entries(&retired).await;

        debug!(
            event = events::RESOURCE_UNDECLARE_OK,
            component = COMPONENT,
            session_id = self.shared.session_id(),
            expr = expr.as_str(),
            handle = %handle,
            retired_subscriptions = retired.len(),
            "resource undeclared"
        );
        Ok(())
    }

    /// Registers `listener` on a currently valid handle. Every call creates a
    /// fresh subscription with a fresh id.
    pub async fn subscribe(
        &self,
        handle: ResourceHandle,
        listener: Arc<dyn SampleListener>,
        reliability: ReliabilityPolicy,
        mode: DeliveryMode,
    ) -> Result<SubscriptionId, SessionError> {
        let mut guard = self.shared.tables().write().await;
        if self.shared.is_closing() {
            return Err(SessionError::SessionClosed);
        }

        let tables = &mut *guard;
        let entry = tables.subscriptions.register(
            &tables.resources,
            handle,
            reliability,
            mode,
            listener,
            self.shared.config().pull_buffer_capacity(),
        )?;

        debug!(
            event = events::SUBSCRIPTION_REGISTER_OK,
            component = COMPONENT,
            session_id = self.shared.session_id(),
            subscription = %entry.id(),
            handle = %handle,
            reliability = %reliability,
            mode = %mode,
            "subscription registered"
        );
        Ok(entry.id())
    }

    /// Deactivates a subscription. A no-op for one that is already inactive.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), SessionError> {
        let retired = self.shared.tables().write().await.subscriptions.unregister(id)?;

        if let Some(entry) = retired {
            self.shared.retire_entries(std::slice::from_ref(&entry)).await;
            debug!(
                event = events::SUBSCRIPTION_UNREGISTER_OK,
                component = COMPONENT,
                session_id = self.shared.session_id(),
                subscription = %id,
                "subscription unregistered"
            );
        }
        Ok(())
    }

    /// Hands the oldest buffered sample of a pull subscription to its listener.
    ///
    /// Returns `Ok(false)` when nothing was buffered or the subscription is no
    /// longer active. A listener answering `StopSession` closes the session.
    pub async fn pull(&self, id: SubscriptionId) -> Result<bool, SessionError> {
        let Some(entry) = self.shared.tables().read().await.subscriptions.get(id)? else {
            return Ok(false);
        };
        if entry.mode() != DeliveryMode::Pull {
            return Err(SessionError::NotPullMode(id));
        }
        let Some(buffer) = entry.pull_buffer() else {
            return Ok(false);
        };

        let Some(guard) = entry.begin_invocation().await else {
            return Ok(false);
        };
        if self.shared.is_closing() {
            return Ok(false);
        }
        let Some(sample) = buffer.pop().await else {
            return Ok(false);
        };
        let outcome = invoke_listener(entry.listener(), sample).await;
        drop(guard);

        if record_outcome(&self.shared, &entry, outcome) == ListenerAction::StopSession {
            info!(
                event = events::DELIVERY_STOP_REQUESTED,
                component = COMPONENT,
                session_id = self.shared.session_id(),
                subscription = %id,
                "pull listener asked to stop the session"
            );
            self.shared.teardown(fields::REASON_LISTENER_STOP).await;
        }
        Ok(true)
    }

    /// Closes the session: deactivates all subscriptions, invalidates all handles,
    /// disconnects the transport and stops the delivery worker.
    ///
    /// Idempotent. Called from a listener it does not wait for the teardown that
    /// is then running around it.
    pub async fn close(&self) -> Result<(), SessionError> {
        if !self.shared.teardown(fields::REASON_CLOSE_REQUESTED).await {
            debug!(
                event = events::SESSION_CLOSE_NOOP,
                component = COMPONENT,
                session_id = self.shared.session_id(),
                "session already closing"
            );
        }

        if !self.shared.is_on_worker_thread() {
            self.shared.wait_closed().await;
            self.worker.wait_finished().await;
        }
        Ok(())
    }

    /// `true` once the session has started closing, whoever initiated it.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closing()
    }

    /// Resolves once the session is fully closed, e.g. after a listener
    /// returned [`ListenerAction::StopSession`].
    pub async fn closed(&self) {
        self.shared.wait_closed().await;
    }

    pub fn config(&self) -> &SessionConfig {
        self.shared.config()
    }

    pub fn stats(&self) -> SessionStats {
        self.shared.counters().snapshot()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.shared.is_closing() {
            warn!(
                event = events::SESSION_DROPPED_OPEN,
                component = COMPONENT,
                session_id = self.shared.session_id(),
                "session dropped while open; closing in the background"
            );
        }
        self.shared.signal_shutdown();
    }
}
