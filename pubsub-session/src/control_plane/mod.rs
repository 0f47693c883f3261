//! Control-plane layer.
//!
//! Owns the resource-table identity model and session lifecycle semantics.
//! This layer is responsible for idempotent declare behavior and for the
//! close transition that invalidates every handle exactly once.
//!
//! ```
//! use std::sync::Arc;
//! use pubsub_session::{LoopbackTransport, Session, SessionConfig, SessionError};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let session = Session::open(SessionConfig::default(), Arc::new(LoopbackTransport::new()))
//!     .await
//!     .unwrap();
//!
//! // Declaring an expression twice yields the same handle.
//! let first = session.declare_expr("/demo/control").await.unwrap();
//! let second = session.declare_expr("/demo/control").await.unwrap();
//! assert_eq!(first, second);
//!
//! session.undeclare_expr(first).await.unwrap();
//! assert_eq!(
//!     session.undeclare_expr(first).await,
//!     Err(SessionError::UnknownHandle(first))
//! );
//! session.close().await.unwrap();
//! # });
//! ```

pub(crate) mod resource_table;
pub(crate) mod session_lifecycle;
pub(crate) mod session_state;
