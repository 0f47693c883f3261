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

//! Delivery worker that drains the ingress queue and dispatches samples to subscriptions.

use crate::control_plane::session_state::SessionShared;
use crate::data_plane::listener_invocation::invoke_entry;
use crate::data_plane::pull_buffer::PullPushOutcome;
use crate::data_plane::sample_sink::{take_reservation, IngressSample};
use crate::error::SessionError;
use crate::listener::ListenerAction;
use crate::observability::events;
use crate::observability::fields::{self, WorkerContext};
use crate::routing::subscription_registry::DeliveryMode;
use crate::runtime::worker_runtime::{
    spawn_delivery_loop, DeliveryLoopHandle, DEFAULT_DELIVERY_RUNTIME_THREAD_NAME,
};
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, info, Level};
use uuid::Uuid;

const DELIVERY_RUNTIME_THREAD_NAME_PREFIX: &str = "ps-deliver-";
const DELIVERY_RUNTIME_THREAD_NAME_MAX_LEN: usize = 15;
const COMPONENT: &str = "delivery_worker";

/// Worker state that owns the spawned delivery thread handle.
pub(crate) struct DeliveryWorker {
    worker_id: String,
    loop_handle: DeliveryLoopHandle,
}

impl DeliveryWorker {
    /// Spawns the dedicated runtime thread that serves one session.
    pub(crate) async fn spawn(
        shared: Arc<SessionShared>,
        sample_receiver: Receiver<IngressSample>,
    ) -> Result<Self, SessionError> {
        let worker_id = Uuid::new_v4().hyphenated().to_string();
        let runtime_thread_name = Self::build_runtime_thread_name(&worker_id);
        let worker_id_for_loop = worker_id.clone();

        let loop_handle = spawn_delivery_loop(runtime_thread_name, move || async move {
            Self::delivery_loop(worker_id_for_loop, shared, sample_receiver).await;
        })
        .await?;

        Ok(Self {
            worker_id,
            loop_handle,
        })
    }

    /// Returns the unique worker identifier for correlation logs.
    pub(crate) fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub(crate) fn runtime_thread(&self) -> &str {
        self.loop_handle.worker_thread()
    }

    pub(crate) async fn wait_finished(&self) {
        self.loop_handle.wait_finished().await;
    }

    fn build_runtime_thread_name(worker_id: &str) -> String {
        let suffix_len =
            DELIVERY_RUNTIME_THREAD_NAME_MAX_LEN - DELIVERY_RUNTIME_THREAD_NAME_PREFIX.len();
        let suffix: String = worker_id
            .chars()
            .filter(|ch| ch.is_ascii_hexdigit())
            .take(suffix_len)
            .collect();

        if suffix.len() == suffix_len {
            format!("{DELIVERY_RUNTIME_THREAD_NAME_PREFIX}{suffix}")
        } else {
            info!(
                event = events::RUNTIME_THREAD_NAME_FALLBACK,
                component = COMPONENT,
                worker_id,
                "worker id too short for a thread name; using default"
            );
            DEFAULT_DELIVERY_RUNTIME_THREAD_NAME.to_string()
        }
    }

    /// Drains the ingress queue until shutdown is signalled or every sender is gone.
    pub(crate) async fn delivery_loop(
        worker_id: String,
        shared: Arc<SessionShared>,
        mut sample_receiver: Receiver<IngressSample>,
    ) {
        shared.bind_worker_thread();
        let worker_context = WorkerContext::with_current_thread(worker_id);
        let mut shutdown = shared.subscribe_shutdown();

        info!(
            event = events::WORKER_START,
            component = COMPONENT,
            session_id = shared.session_id(),
            worker_id = worker_context.worker_id.as_str(),
            worker_thread = worker_context.worker_thread.as_str(),
            "delivery worker started"
        );

        let reason = loop {
            tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => break fields::REASON_CLOSE_REQUESTED,
                received = sample_receiver.recv() => match received {
                    Some(ingress) => Self::dispatch(&worker_context, &shared, ingress).await,
                    None => break fields::REASON_INGRESS_CLOSED,
                },
            }
        };

        // Shutdown without a teardown means the session handle was dropped while open.
        if reason == fields::REASON_CLOSE_REQUESTED && !shared.is_closing() {
            shared.teardown(fields::REASON_SESSION_DROPPED).await;
        }

        info!(
            event = events::WORKER_STOP,
            component = COMPONENT,
            session_id = shared.session_id(),
            worker_id = worker_context.worker_id.as_str(),
            worker_thread = worker_context.worker_thread.as_str(),
            reason,
            "delivery worker stopped"
        );
    }

    /// Routes one sample to every active subscription of its handle, in registration order.
    ///
    /// Never waits for pull-buffer capacity: reliable pull slots were reserved by
    /// the producer before the sample was queued.
    async fn dispatch(
        worker_context: &WorkerContext,
        shared: &SessionShared,
        ingress: IngressSample,
    ) {
        let (sample, mut reservations) = ingress.into_parts();
        let entries = {
            let tables = shared.tables().read().await;
            if !tables.resources.is_valid(sample.handle()) {
                shared.counters().record_discarded();
                debug!(
                    event = events::DELIVERY_DISCARD_INVALID_HANDLE,
                    component = COMPONENT,
                    worker_id = worker_context.worker_id.as_str(),
                    handle = %sample.handle(),
                    "discarding sample for an invalid handle"
                );
                return;
            }
            tables.subscriptions.lookup(sample.handle())
        };

        if entries.is_empty() {
            shared.counters().record_discarded();
            if tracing::enabled!(Level::DEBUG) {
                let expr = shared
                    .tables()
                    .read()
                    .await
                    .resources
                    .expr(sample.handle())
                    .map(str::to_string);
                debug!(
                    event = events::DELIVERY_DISCARD_NO_SUBSCRIBER,
                    component = COMPONENT,
                    worker_id = worker_context.worker_id.as_str(),
                    handle = %sample.handle(),
                    expr = %fields::format_expr(expr.as_deref()),
                    "discarding sample without an active subscriber"
                );
            }
            return;
        }

        for entry in entries {
            if shared.is_closing() {
                break;
            }

            match entry.mode() {
                DeliveryMode::Push => {
                    let action = invoke_entry(shared, &entry, sample.clone()).await;
                    if action == Some(ListenerAction::StopSession) {
                        info!(
                            event = events::DELIVERY_STOP_REQUESTED,
                            component = COMPONENT,
                            worker_id = worker_context.worker_id.as_str(),
                            subscription = %entry.id(),
                            "listener asked to stop the session"
                        );
                        shared.teardown(fields::REASON_LISTENER_STOP).await;
                        break;
                    }
                }
                DeliveryMode::Pull => {
                    let Some(buffer) = entry.pull_buffer() else {
                        continue;
                    };
                    let reservation = take_reservation(&mut reservations, entry.id());
                    match buffer.push(sample.clone(), reservation).await {
                        PullPushOutcome::DroppedOldest => {
                            shared.counters().record_dropped();
                            debug!(
                                event = events::DELIVERY_PULL_DROP_OLDEST,
                                component = COMPONENT,
                                worker_id = worker_context.worker_id.as_str(),
                                subscription = %entry.id(),
                                "pull buffer full; dropped oldest sample"
                            );
                        }
                        PullPushOutcome::Unreserved => {
                            debug!(
                                event = events::DELIVERY_PULL_SKIP_UNRESERVED,
                                component = COMPONENT,
                                worker_id = worker_context.worker_id.as_str(),
                                subscription = %entry.id(),
                                "sample was accepted before this pull subscription existed; skipping"
                            );
                        }
                        PullPushOutcome::Buffered | PullPushOutcome::Closed => {}
                    }
                }
            }
        }
    }
}
