//! Canonical structured event names used across `pubsub-session`.

// Session lifecycle events.
pub const SESSION_OPEN_OK: &str = "session_open_ok";
pub const SESSION_OPEN_FAILED: &str = "session_open_failed";
pub const SESSION_CLOSE_START: &str = "session_close_start";
pub const SESSION_CLOSE_OK: &str = "session_close_ok";
pub const SESSION_CLOSE_NOOP: &str = "session_close_noop";
pub const SESSION_DROPPED_OPEN: &str = "session_dropped_open";
pub const TRANSPORT_CONNECT_OK: &str = "transport_connect_ok";
pub const TRANSPORT_DISCONNECT_FAILED: &str = "transport_disconnect_failed";

// Declaration and subscription events.
pub const RESOURCE_DECLARE_OK: &str = "resource_declare_ok";
pub const RESOURCE_UNDECLARE_OK: &str = "resource_undeclare_ok";
pub const SUBSCRIPTION_REGISTER_OK: &str = "subscription_register_ok";
pub const SUBSCRIPTION_UNREGISTER_OK: &str = "subscription_unregister_ok";

// Ingress and delivery events.
pub const INGRESS_DROP_QUEUE_FULL: &str = "ingress_drop_queue_full";
pub const DELIVERY_DISCARD_INVALID_HANDLE: &str = "delivery_discard_invalid_handle";
pub const DELIVERY_DISCARD_NO_SUBSCRIBER: &str = "delivery_discard_no_subscriber";
pub const DELIVERY_LISTENER_FAILED: &str = "delivery_listener_failed";
pub const DELIVERY_LISTENER_PANICKED: &str = "delivery_listener_panicked";
pub const DELIVERY_STOP_REQUESTED: &str = "delivery_stop_requested";
pub const DELIVERY_PULL_DROP_OLDEST: &str = "delivery_pull_drop_oldest";
pub const DELIVERY_PULL_SKIP_UNRESERVED: &str = "delivery_pull_skip_unreserved";

// Delivery worker runtime events.
pub const WORKER_START: &str = "worker_start";
pub const WORKER_STOP: &str = "worker_stop";
pub const RUNTIME_THREAD_NAME_FALLBACK: &str = "runtime_thread_name_fallback";
pub const RUNTIME_SPAWN_OK: &str = "runtime_spawn_ok";
pub const RUNTIME_SPAWN_FAILED: &str = "runtime_spawn_failed";
