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

//! # pubsub-session
//!
//! `pubsub-session` is the local session and subscription-delivery core of a
//! publish/subscribe client library.
//!
//! Typical usage is API-first and remains centered on [`Session`]: open it over a
//! [`Transport`], declare a resource expression to obtain a compact [`ResourceHandle`],
//! then subscribe a [`SampleListener`] to that handle.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use pubsub_session::{
//!     listener_fn, DeliveryMode, ListenerAction, LoopbackTransport, ReliabilityPolicy, Session,
//!     SessionConfig, SessionMode,
//! };
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let transport = LoopbackTransport::new();
//! let publisher = transport.publisher();
//! let config = SessionConfig::default().with_mode(SessionMode::Peer);
//! let session = Session::open(config, Arc::new(transport)).await.unwrap();
//!
//! let handle = session.declare_expr("/test/thr").await.unwrap();
//! let received = Arc::new(AtomicUsize::new(0));
//! let counter = received.clone();
//! session
//!     .subscribe(
//!         handle,
//!         listener_fn(move |_sample| {
//!             counter.fetch_add(1, Ordering::SeqCst);
//!             Ok(ListenerAction::Continue)
//!         }),
//!         ReliabilityPolicy::Reliable,
//!         DeliveryMode::Push,
//!     )
//!     .await
//!     .unwrap();
//!
//! publisher.put(handle, vec![0u8; 8]).await.unwrap();
//!
//! session.undeclare_expr(handle).await.unwrap();
//! session.close().await.unwrap();
//! session.close().await.unwrap();
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - API facade: outward [`Session`] surface
//! - Control plane: resource-table ownership and session lifecycle transitions
//! - Routing: resource-expression grammar and the subscription registry
//! - Data plane: ingress sink, delivery worker, pull buffers and listener invocation
//! - Runtime: the dedicated delivery-worker thread boundary
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events and does not unconditionally initialize a global
//! subscriber. Binaries and tests are responsible for one-time
//! `tracing_subscriber` initialization at process boundaries.

mod config;
pub use config::{
    Locator, SessionConfig, SessionMode, DEFAULT_INGRESS_QUEUE_SIZE,
    DEFAULT_PULL_BUFFER_CAPACITY,
};

mod control_plane;
pub use control_plane::resource_table::ResourceHandle;

mod data_plane;
pub use data_plane::delivery_stats::SessionStats;
pub use data_plane::sample_sink::SampleSink;

mod error;
pub use error::SessionError;

mod listener;
pub use listener::{
    listener_fn, FnListener, ListenerAction, ListenerError, ListenerResult, SampleListener,
};

#[doc(hidden)]
pub mod observability;

mod routing;
pub use routing::subscription_registry::{DeliveryMode, ReliabilityPolicy, SubscriptionId};

mod runtime;

mod sample;
pub use sample::Sample;

mod session;
pub use session::Session;

mod transport;
pub use transport::{LoopbackPublisher, LoopbackTransport, Transport};
