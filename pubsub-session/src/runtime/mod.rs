//! Runtime integration layer.
//!
//! Isolates the delivery-worker thread boundary so async/threading behavior
//! remains localized and predictable for the rest of the crate.
//!
//! ```
//! use std::sync::Arc;
//! use pubsub_session::{LoopbackTransport, Session, SessionConfig};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! // Every open session owns exactly one delivery worker thread.
//! let session = Session::open(SessionConfig::default(), Arc::new(LoopbackTransport::new()))
//!     .await
//!     .unwrap();
//! session.close().await.unwrap();
//! assert!(session.is_closed());
//! # });
//! ```

pub(crate) mod worker_runtime;
