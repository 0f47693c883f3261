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

//! Subscription registry used by the session API and the delivery worker.

use crate::control_plane::resource_table::{ResourceHandle, ResourceTable};
use crate::data_plane::pull_buffer::PullBuffer;
use crate::error::SessionError;
use crate::listener::SampleListener;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Identity of one subscription. Never reused within a session.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Display for SubscriptionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "sid:{}", self.0)
    }
}

/// Delivery guarantee level of a subscription.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ReliabilityPolicy {
    /// May drop samples under backpressure.
    BestEffort,
    /// Never drops; may block the producer instead.
    #[default]
    Reliable,
}

impl Display for ReliabilityPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReliabilityPolicy::BestEffort => write!(f, "best_effort"),
            ReliabilityPolicy::Reliable => write!(f, "reliable"),
        }
    }
}

impl FromStr for ReliabilityPolicy {
    type Err = SessionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "best_effort" | "best-effort" | "besteffort" => Ok(ReliabilityPolicy::BestEffort),
            "reliable" => Ok(ReliabilityPolicy::Reliable),
            other => Err(SessionError::Config(format!(
                "unrecognized reliability '{other}' (expected one of: best_effort, reliable)"
            ))),
        }
    }
}

/// How samples reach the subscriber.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum DeliveryMode {
    /// The listener is invoked as soon as a sample is available.
    #[default]
    Push,
    /// Samples are buffered until `Session::pull` is called.
    Pull,
}

impl Display for DeliveryMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMode::Push => write!(f, "push"),
            DeliveryMode::Pull => write!(f, "pull"),
        }
    }
}

impl FromStr for DeliveryMode {
    type Err = SessionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "push" => Ok(DeliveryMode::Push),
            "pull" => Ok(DeliveryMode::Pull),
            other => Err(SessionError::Config(format!(
                "unrecognized delivery mode '{other}' (expected one of: push, pull)"
            ))),
        }
    }
}

/// One registered subscription.
///
/// The active flag only ever goes from `true` to `false`. The invocation lock is
/// held for the whole duration of a listener call, so waiting on it guarantees that
/// no call is in flight.
pub(crate) struct SubscriptionEntry {
    id: SubscriptionId,
    handle: ResourceHandle,
    reliability: ReliabilityPolicy,
    mode: DeliveryMode,
    listener: Arc<dyn SampleListener>,
    active: AtomicBool,
    invocation: Mutex<()>,
    pull_buffer: Option<PullBuffer>,
}

impl SubscriptionEntry {
    fn new(
        id: SubscriptionId,
        handle: ResourceHandle,
        reliability: ReliabilityPolicy,
        mode: DeliveryMode,
        listener: Arc<dyn SampleListener>,
        pull_buffer_capacity: usize,
    ) -> Self {
        let pull_buffer = match mode {
            DeliveryMode::Pull => Some(PullBuffer::new(pull_buffer_capacity, reliability)),
            DeliveryMode::Push => None,
        };

        Self {
            id,
            handle,
            reliability,
            mode,
            listener,
            active: AtomicBool::new(true),
            invocation: Mutex::new(()),
            pull_buffer,
        }
    }

    pub(crate) fn id(&self) -> SubscriptionId {
        self.id
    }

    pub(crate) fn handle(&self) -> ResourceHandle {
        self.handle
    }

    pub(crate) fn reliability(&self) -> ReliabilityPolicy {
        self.reliability
    }

    pub(crate) fn mode(&self) -> DeliveryMode {
        self.mode
    }

    pub(crate) fn listener(&self) -> &Arc<dyn SampleListener> {
        &self.listener
    }

    pub(crate) fn pull_buffer(&self) -> Option<&PullBuffer> {
        self.pull_buffer.as_ref()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Marks the entry inactive and releases a producer blocked on its pull buffer.
    /// Returns `true` only for the call that performed the transition.
    pub(crate) fn deactivate(&self) -> bool {
        let was_active = self.active.swap(false, Ordering::AcqRel);
        if let Some(buffer) = self.pull_buffer.as_ref() {
            buffer.close();
        }
        was_active
    }

    /// Takes the invocation lock, returning it only if the entry is still active.
    pub(crate) async fn begin_invocation(&self) -> Option<MutexGuard<'_, ()>> {
        let guard = self.invocation.lock().await;
        self.is_active().then_some(guard)
    }

    /// Waits until any in-flight listener call has returned.
    pub(crate) async fn wait_idle(&self) {
        drop(self.invocation.lock().await);
    }
}

/// Handle-to-subscriptions map preserving registration order per handle.
pub(crate) struct SubscriptionRegistry {
    next_id: u64,
    entries: HashMap<SubscriptionId, Arc<SubscriptionEntry>>,
    by_handle: HashMap<ResourceHandle, Vec<Arc<SubscriptionEntry>>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry. The first id issued is `sid:1`.
    pub(crate) fn new() -> Self {
        Self {
            next_id: 1,
            entries: HashMap::new(),
            by_handle: HashMap::new(),
        }
    }

    fn was_issued(&self, id: SubscriptionId) -> bool {
        id.0 >= 1 && id.0 < self.next_id
    }

    /// Registers a fresh subscription on a currently valid handle.
    pub(crate) fn register(
        &mut self,
        resources: &ResourceTable,
        handle: ResourceHandle,
        reliability: ReliabilityPolicy,
        mode: DeliveryMode,
        listener: Arc<dyn SampleListener>,
        pull_buffer_capacity: usize,
    ) -> Result<Arc<SubscriptionEntry>, SessionError> {
        if !resources.is_valid(handle) {
            return Err(SessionError::UnknownHandle(handle));
        }

        let id = SubscriptionId::from_raw(self.next_id);
        self.next_id += 1;

        let entry = Arc::new(SubscriptionEntry::new(
            id,
            handle,
            reliability,
            mode,
            listener,
            pull_buffer_capacity,
        ));
        self.entries.insert(id, entry.clone());
        self.by_handle.entry(handle).or_default().push(entry.clone());
        Ok(entry)
    }

    /// Deactivates a subscription.
    ///
    /// Returns the entry when this call deactivated it, `None` when it was already
    /// inactive, and `UnknownSubscription` only for ids that were never issued.
    pub(crate) fn unregister(
        &mut self,
        id: SubscriptionId,
    ) -> Result<Option<Arc<SubscriptionEntry>>, SessionError> {
        if !self.was_issued(id) {
            return Err(SessionError::UnknownSubscription(id));
        }

        let Some(entry) = self.entries.remove(&id) else {
            return Ok(None);
        };

        if let Some(bound) = self.by_handle.get_mut(&entry.handle()) {
            bound.retain(|candidate| candidate.id() != id);
            if bound.is_empty() {
                self.by_handle.remove(&entry.handle());
            }
        }

        Ok(entry.deactivate().then_some(entry))
    }

    /// Returns the active subscriptions bound to `handle`, in registration order.
    pub(crate) fn lookup(&self, handle: ResourceHandle) -> Vec<Arc<SubscriptionEntry>> {
        self.by_handle
            .get(&handle)
            .map(|bound| {
                bound
                    .iter()
                    .filter(|entry| entry.is_active())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Looks up a subscription by id; `None` when it is no longer active.
    pub(crate) fn get(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<Arc<SubscriptionEntry>>, SessionError> {
        if !self.was_issued(id) {
            return Err(SessionError::UnknownSubscription(id));
        }
        Ok(self.entries.get(&id).cloned())
    }

    /// Returns `true` when at least one active subscription on `handle` is reliable.
    pub(crate) fn has_reliable(&self, handle: ResourceHandle) -> bool {
        self.by_handle.get(&handle).is_some_and(|bound| {
            bound.iter().any(|entry| {
                entry.is_active() && entry.reliability() == ReliabilityPolicy::Reliable
            })
        })
    }

    /// Returns the active reliable pull subscriptions bound to `handle`.
    pub(crate) fn reliable_pulls(&self, handle: ResourceHandle) -> Vec<Arc<SubscriptionEntry>> {
        self.by_handle
            .get(&handle)
            .map(|bound| {
                bound
                    .iter()
                    .filter(|entry| {
                        entry.is_active()
                            && entry.mode() == DeliveryMode::Pull
                            && entry.reliability() == ReliabilityPolicy::Reliable
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Deactivates and removes every subscription bound to `handle`.
    pub(crate) fn deactivate_handle(
        &mut self,
        handle: ResourceHandle,
    ) -> Vec<Arc<SubscriptionEntry>> {
        let bound = self.by_handle.remove(&handle).unwrap_or_default();
        for entry in &bound {
            self.entries.remove(&entry.id());
            entry.deactivate();
        }
        bound
    }

    /// Deactivates and removes every subscription.
    pub(crate) fn deactivate_all(&mut self) -> Vec<Arc<SubscriptionEntry>> {
        self.by_handle.clear();
        let drained: Vec<Arc<SubscriptionEntry>> =
            self.entries.drain().map(|(_, entry)| entry).collect();
        for entry in &drained {
            entry.deactivate();
        }
        drained
    }

    #[cfg(test)]
    pub(crate) fn active_count(&self) -> usize {
        self.entries.len()
    }
}
