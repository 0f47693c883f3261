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

//! Session-level failure taxonomy.

use crate::control_plane::resource_table::ResourceHandle;
use crate::routing::subscription_registry::SubscriptionId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failures surfaced synchronously by the [`Session`](crate::Session) API.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionError {
    /// Malformed configuration, fatal to `open`.
    Config(String),
    /// The transport could not be established, fatal to `open`.
    Connect(String),
    /// The delivery worker could not be started.
    Runtime(String),
    InvalidExpr(String),
    UnknownHandle(ResourceHandle),
    UnknownSubscription(SubscriptionId),
    /// `pull` was called on a subscription registered in push mode.
    NotPullMode(SubscriptionId),
    SessionClosed,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Config(reason) => write!(f, "invalid session configuration: {reason}"),
            SessionError::Connect(reason) => write!(f, "unable to connect transport: {reason}"),
            SessionError::Runtime(reason) => {
                write!(f, "unable to start delivery runtime: {reason}")
            }
            SessionError::InvalidExpr(reason) => {
                write!(f, "invalid resource expression: {reason}")
            }
            SessionError::UnknownHandle(handle) => write!(f, "unknown resource handle {handle}"),
            SessionError::UnknownSubscription(id) => write!(f, "unknown subscription {id}"),
            SessionError::NotPullMode(id) => {
                write!(f, "subscription {id} is not registered in pull mode")
            }
            SessionError::SessionClosed => write!(f, "session is closed"),
        }
    }
}

impl Error for SessionError {}
