//! Data-plane layer.
//!
//! Owns the ingress sink handed to the transport, the delivery worker that
//! drains it, pull buffers and the guarded listener invocation path.
//!
//! ```
//! use std::sync::Arc;
//! use pubsub_session::{
//!     listener_fn, DeliveryMode, ListenerAction, LoopbackTransport, ReliabilityPolicy, Session,
//!     SessionConfig,
//! };
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let transport = LoopbackTransport::new();
//! let publisher = transport.publisher();
//! let session = Session::open(SessionConfig::default(), Arc::new(transport))
//!     .await
//!     .unwrap();
//! let handle = session.declare_expr("/demo/pull").await.unwrap();
//! let id = session
//!     .subscribe(
//!         handle,
//!         listener_fn(|_| Ok(ListenerAction::Continue)),
//!         ReliabilityPolicy::BestEffort,
//!         DeliveryMode::Pull,
//!     )
//!     .await
//!     .unwrap();
//!
//! // Pull subscriptions buffer samples until the subscriber asks for them.
//! publisher.put(handle, b"hello".to_vec()).await.unwrap();
//! while !session.pull(id).await.unwrap() {
//!     tokio::task::yield_now().await;
//! }
//! session.close().await.unwrap();
//! # });
//! ```

pub(crate) mod delivery_stats;
pub(crate) mod delivery_worker;
pub(crate) mod listener_invocation;
pub(crate) mod pull_buffer;
pub(crate) mod sample_sink;
