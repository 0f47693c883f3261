//! Guarded listener invocation shared by push delivery and `Session::pull`.

use crate::control_plane::session_state::SessionShared;
use crate::listener::{ListenerAction, SampleListener};
use crate::observability::{events, fields};
use crate::routing::subscription_registry::SubscriptionEntry;
use crate::sample::Sample;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::warn;

const COMPONENT: &str = "listener_invocation";

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum InvocationOutcome {
    Completed(ListenerAction),
    Failed(String),
    Panicked(String),
}

/// Runs one listener call, turning both error returns and panics into outcomes.
pub(crate) async fn invoke_listener(
    listener: &Arc<dyn SampleListener>,
    sample: Sample,
) -> InvocationOutcome {
    match AssertUnwindSafe(listener.on_sample(sample))
        .catch_unwind()
        .await
    {
        Ok(Ok(action)) => InvocationOutcome::Completed(action),
        Ok(Err(err)) => InvocationOutcome::Failed(err.to_string()),
        Err(payload) => InvocationOutcome::Panicked(fields::format_panic_payload(payload.as_ref())),
    }
}

/// Counts and logs an outcome. Faults map to `Continue`.
pub(crate) fn record_outcome(
    shared: &SessionShared,
    entry: &SubscriptionEntry,
    outcome: InvocationOutcome,
) -> ListenerAction {
    shared.counters().record_delivered();

    match outcome {
        InvocationOutcome::Completed(action) => action,
        InvocationOutcome::Failed(err) => {
            shared.counters().record_fault();
            warn!(
                event = events::DELIVERY_LISTENER_FAILED,
                component = COMPONENT,
                session_id = shared.session_id(),
                subscription = %entry.id(),
                handle = %entry.handle(),
                err = err.as_str(),
                "listener returned an error"
            );
            ListenerAction::Continue
        }
        InvocationOutcome::Panicked(panic) => {
            shared.counters().record_fault();
            warn!(
                event = events::DELIVERY_LISTENER_PANICKED,
                component = COMPONENT,
                session_id = shared.session_id(),
                subscription = %entry.id(),
                handle = %entry.handle(),
                panic = panic.as_str(),
                "listener panicked"
            );
            ListenerAction::Continue
        }
    }
}

/// Invokes an active entry under its invocation lock.
///
/// Returns `None` when the entry was deactivated, or the session started
/// closing, before the call could start. The lock is released before
/// returning, so callers may tear the session down.
pub(crate) async fn invoke_entry(
    shared: &SessionShared,
    entry: &SubscriptionEntry,
    sample: Sample,
) -> Option<ListenerAction> {
    let guard = entry.begin_invocation().await?;
    if shared.is_closing() {
        return None;
    }
    let outcome = invoke_listener(entry.listener(), sample).await;
    drop(guard);

    Some(record_outcome(shared, entry, outcome))
}
