//! Routing layer.
//!
//! Owns the resource-expression grammar and the subscription registry that
//! resolves a resource handle to its active subscriptions, in registration order.
//!
//! ```
//! use std::sync::Arc;
//! use pubsub_session::{
//!     listener_fn, DeliveryMode, ListenerAction, LoopbackTransport, ReliabilityPolicy, Session,
//!     SessionConfig,
//! };
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let session = Session::open(SessionConfig::default(), Arc::new(LoopbackTransport::new()))
//!     .await
//!     .unwrap();
//! let handle = session.declare_expr("/demo/routing").await.unwrap();
//!
//! // Two subscriptions on one handle receive independent ids.
//! let first = session
//!     .subscribe(handle, listener_fn(|_| Ok(ListenerAction::Continue)),
//!         ReliabilityPolicy::Reliable, DeliveryMode::Push)
//!     .await
//!     .unwrap();
//! let second = session
//!     .subscribe(handle, listener_fn(|_| Ok(ListenerAction::Continue)),
//!         ReliabilityPolicy::BestEffort, DeliveryMode::Push)
//!     .await
//!     .unwrap();
//! assert_ne!(first, second);
//!
//! // Malformed expressions are rejected before a handle is allocated.
//! assert!(session.declare_expr("/demo//routing").await.is_err());
//! session.close().await.unwrap();
//! # });
//! ```

pub(crate) mod resource_expr;
pub(crate) mod subscription_registry;
