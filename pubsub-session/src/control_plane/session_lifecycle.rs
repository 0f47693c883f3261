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

//! Session lifecycle orchestration: teardown and subscription retirement.

use crate::control_plane::session_state::{SessionShared, SessionState};
use crate::observability::events;
use crate::routing::subscription_registry::SubscriptionEntry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

const COMPONENT: &str = "session_lifecycle";

impl SessionShared {
    /// Closes the session. Only the first caller performs the transition and
    /// gets `true`; later callers return immediately with `false`.
    ///
    /// Order matters: new callbacks are refused first, then in-flight ones are
    /// awaited, and only then is the transport released and the worker stopped.
    pub(crate) async fn teardown(&self, reason: &'static str) -> bool {
        if self.closing.swap(true, Ordering::AcqRel) {
            return false;
        }

        info!(
            event = events::SESSION_CLOSE_START,
            component = COMPONENT,
            session_id = self.session_id(),
            reason,
            "closing session"
        );
        self.state.send_replace(SessionState::Closing);

        let (retired, cleared) = {
            let mut tables = self.tables().write().await;
            let retired = tables.subscriptions.deactivate_all();
            let cleared = tables.resources.clear();
            (retired, cleared)
        };
        self.retire_entries(&retired).await;

        if let Err(err) = self.transport().disconnect().await {
            warn!(
                event = events::TRANSPORT_DISCONNECT_FAILED,
                component = COMPONENT,
                session_id = self.session_id(),
                err = %err,
                "transport disconnect failed"
            );
        }

        self.signal_shutdown();
        self.state.send_replace(SessionState::Closed);

        info!(
            event = events::SESSION_CLOSE_OK,
            component = COMPONENT,
            session_id = self.session_id(),
            reason,
            retired_subscriptions = retired.len(),
            cleared_handles = cleared,
            "session closed"
        );
        true
    }

    /// Waits for in-flight invocations on already deactivated entries.
    ///
    /// Skipped on the delivery worker thread: the caller is then itself inside a
    /// callback and waiting would never finish.
    pub(crate) async fn retire_entries(&self, entries: &[Arc<SubscriptionEntry>]) {
        if self.is_on_worker_thread() {
            debug!(
                component = COMPONENT,
                session_id = self.session_id(),
                entries = entries.len(),
                "retiring from the delivery worker; not waiting for in-flight callbacks"
            );
            return;
        }

        for entry in entries {
            entry.wait_idle().await;
        }
    }

    /// Resolves once teardown has fully completed.
    pub(crate) async fn wait_closed(&self) {
        let mut state = self.subscribe_state();
        let _ = state.wait_for(|state| *state == SessionState::Closed).await;
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SessionConfig;
    use crate::control_plane::session_state::{SessionShared, SessionState};
    use crate::data_plane::listener_invocation::invoke_entry;
    use crate::listener::{listener_fn, ListenerAction};
    use crate::observability::fields;
    use crate::routing::subscription_registry::{DeliveryMode, ReliabilityPolicy};
    use crate::sample::Sample;
    use crate::transport::LoopbackTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn shared() -> SessionShared {
        SessionShared::new(
            "lifecycle-test".to_string(),
            Arc::new(SessionConfig::default()),
            Arc::new(LoopbackTransport::new()),
        )
    }

    #[tokio::test]
    async fn teardown_runs_once_and_invalidates_everything() {
        let shared = shared();
        let entry = {
            let mut guard = shared.tables().write().await;
            let tables = &mut *guard;
            let handle = tables.resources.declare("/test/thr").unwrap();
            tables
                .subscriptions
                .register(
                    &tables.resources,
                    handle,
                    ReliabilityPolicy::Reliable,
                    DeliveryMode::Push,
                    listener_fn(|_| Ok(ListenerAction::Continue)),
                    4,
                )
                .unwrap()
        };

        assert!(shared.teardown(fields::REASON_CLOSE_REQUESTED).await);
        assert!(!shared.teardown(fields::REASON_CLOSE_REQUESTED).await);

        assert_eq!(shared.state(), SessionState::Closed);
        assert!(!entry.is_active());
        assert!(!shared.tables().read().await.resources.is_valid(entry.handle()));
        assert!(*shared.subscribe_shutdown().borrow());
    }

    #[tokio::test]
    async fn no_callback_starts_once_closing_is_flagged() {
        let shared = shared();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let entry = {
            let mut guard = shared.tables().write().await;
            let tables = &mut *guard;
            let handle = tables.resources.declare("/test/closing").unwrap();
            tables
                .subscriptions
                .register(
                    &tables.resources,
                    handle,
                    ReliabilityPolicy::Reliable,
                    DeliveryMode::Push,
                    listener_fn(move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(ListenerAction::Continue)
                    }),
                    4,
                )
                .unwrap()
        };

        // teardown has flagged the session but not yet reached the tables
        shared.closing.store(true, Ordering::Release);
        assert!(entry.is_active());

        let action = invoke_entry(&shared, &entry, Sample::new(entry.handle(), vec![1])).await;

        assert_eq!(action, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(shared.counters().snapshot().delivered, 0);
    }

    #[tokio::test]
    async fn wait_closed_resolves_after_teardown() {
        let shared = Arc::new(shared());
        let waiter = {
            let shared = shared.clone();
            tokio::spawn(async move { shared.wait_closed().await })
        };

        shared.teardown(fields::REASON_CLOSE_REQUESTED).await;
        waiter.await.unwrap();
    }
}
