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

//! Subscriber callback contract.

use crate::sample::Sample;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// What the delivery engine should do after a listener returns.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ListenerAction {
    Continue,
    /// The subscriber chose to stop: the session is closed cooperatively.
    StopSession,
}

/// A listener fault. Logged and isolated by the delivery engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListenerError(String);

impl ListenerError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl Display for ListenerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for ListenerError {}

impl From<&str> for ListenerError {
    fn from(reason: &str) -> Self {
        Self::new(reason)
    }
}

impl From<String> for ListenerError {
    fn from(reason: String) -> Self {
        Self(reason)
    }
}

pub type ListenerResult = Result<ListenerAction, ListenerError>;

/// Receives samples for one subscription.
///
/// Returning `Err` or panicking is treated as a fault of this subscriber only;
/// other subscriptions on the same resource keep receiving.
#[async_trait]
pub trait SampleListener: Send + Sync {
    async fn on_sample(&self, sample: Sample) -> ListenerResult;
}

/// Adapter turning a synchronous closure into a [`SampleListener`].
pub struct FnListener<F>(F);

impl<F> FnListener<F>
where
    F: Fn(Sample) -> ListenerResult + Send + Sync + 'static,
{
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

#[async_trait]
impl<F> SampleListener for FnListener<F>
where
    F: Fn(Sample) -> ListenerResult + Send + Sync + 'static,
{
    async fn on_sample(&self, sample: Sample) -> ListenerResult {
        (self.0)(sample)
    }
}

/// Wraps a closure as a shareable listener trait object.
pub fn listener_fn<F>(callback: F) -> Arc<dyn SampleListener>
where
    F: Fn(Sample) -> ListenerResult + Send + Sync + 'static,
{
    Arc::new(FnListener::new(callback))
}
