//! State shared between the session facade, the ingress sink and the delivery worker.

use crate::config::SessionConfig;
use crate::control_plane::resource_table::ResourceTable;
use crate::data_plane::delivery_stats::DeliveryCounters;
use crate::routing::subscription_registry::SubscriptionRegistry;
use crate::transport::Transport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};
use tokio::sync::{watch, RwLock};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SessionState {
    Open,
    Closing,
    Closed,
}

/// Everything the validity checks of the delivery path must observe atomically.
pub(crate) struct SessionTables {
    pub(crate) resources: ResourceTable,
    pub(crate) subscriptions: SubscriptionRegistry,
}

impl SessionTables {
    fn new() -> Self {
        Self {
            resources: ResourceTable::new(),
            subscriptions: SubscriptionRegistry::new(),
        }
    }
}

pub(crate) struct SessionShared {
    session_id: String,
    config: Arc<SessionConfig>,
    transport: Arc<dyn Transport>,
    tables: RwLock<SessionTables>,
    counters: DeliveryCounters,
    pub(super) closing: AtomicBool,
    pub(super) state: watch::Sender<SessionState>,
    shutdown: watch::Sender<bool>,
    worker_thread: OnceLock<ThreadId>,
}

impl SessionShared {
    pub(crate) fn new(
        session_id: String,
        config: Arc<SessionConfig>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Open);
        let (shutdown, _) = watch::channel(false);

        Self {
            session_id,
            config,
            transport,
            tables: RwLock::new(SessionTables::new()),
            counters: DeliveryCounters::default(),
            closing: AtomicBool::new(false),
            state,
            shutdown,
            worker_thread: OnceLock::new(),
        }
    }

    pub(crate) fn session_id(&self) -> &str {
        &self.session_id
    }

    pub(crate) fn config(&self) -> &Arc<SessionConfig> {
        &self.config
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) fn tables(&self) -> &RwLock<SessionTables> {
        &self.tables
    }

    pub(crate) fn counters(&self) -> &DeliveryCounters {
        &self.counters
    }

    /// `true` from the moment teardown starts.
    pub(crate) fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub(crate) fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub(crate) fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Asks the delivery worker to leave its loop.
    pub(crate) fn signal_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Records the calling thread as the delivery worker. Only the first call sticks.
    pub(crate) fn bind_worker_thread(&self) {
        let _ = self.worker_thread.set(thread::current().id());
    }

    pub(crate) fn is_on_worker_thread(&self) -> bool {
        self.worker_thread
            .get()
            .is_some_and(|worker| *worker == thread::current().id())
    }
}
