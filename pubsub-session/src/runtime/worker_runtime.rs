//! Runtime helper for spawning the session delivery loop.

use crate::error::SessionError;
use crate::observability::events;
use std::future::Future;
use std::thread;
use tokio::runtime::Builder;
use tokio::sync::{oneshot, watch};
use tracing::{info, warn};

pub(crate) const DEFAULT_DELIVERY_RUNTIME_THREAD_NAME: &str = "ps-deliver";
const COMPONENT: &str = "worker_runtime";

/// Owns the delivery thread and reports when its loop has returned.
pub(crate) struct DeliveryLoopHandle {
    worker_thread: String,
    finished: watch::Receiver<bool>,
    _join_handle: thread::JoinHandle<()>,
}

impl DeliveryLoopHandle {
    pub(crate) fn worker_thread(&self) -> &str {
        &self.worker_thread
    }

    #[cfg(test)]
    pub(crate) fn thread_id(&self) -> thread::ThreadId {
        self._join_handle.thread().id()
    }

    /// Resolves once the delivery loop has returned, even if it unwound.
    pub(crate) async fn wait_finished(&self) {
        let mut finished = self.finished.clone();
        // an Err means the sender dropped, which also means the thread is gone
        let _ = finished.wait_for(|done| *done).await;
    }
}

/// Marks the loop finished when dropped, so an unwinding loop still reports.
struct FinishedGuard(watch::Sender<bool>);

impl Drop for FinishedGuard {
    fn drop(&mut self) {
        self.0.send_replace(true);
    }
}

/// Starts `run_loop` on a dedicated thread driving its own current-thread runtime.
///
/// Resolves once the runtime is built, so a build failure is reported to the caller.
pub(crate) async fn spawn_delivery_loop<F, Fut>(
    thread_name: String,
    run_loop: F,
) -> Result<DeliveryLoopHandle, SessionError>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + 'static,
{
    let (ready_tx, ready_rx) = oneshot::channel::<Result<(), String>>();
    let (finished_tx, finished_rx) = watch::channel(false);

    let join_handle = thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let _finished = FinishedGuard(finished_tx);
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    let _ = ready_tx.send(Err(err.to_string()));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));
            runtime.block_on(run_loop());
        })
        .map_err(|err| {
            warn!(
                event = events::RUNTIME_SPAWN_FAILED,
                component = COMPONENT,
                worker_thread = thread_name.as_str(),
                err = %err,
                "failed to spawn delivery thread"
            );
            SessionError::Runtime(format!("failed to spawn delivery thread: {err}"))
        })?;

    let startup = match ready_rx.await {
        Ok(result) => result,
        Err(_) => Err("delivery thread exited before its runtime started".to_string()),
    };
    if let Err(reason) = startup {
        warn!(
            event = events::RUNTIME_SPAWN_FAILED,
            component = COMPONENT,
            worker_thread = thread_name.as_str(),
            err = reason.as_str(),
            "failed to build delivery runtime"
        );
        return Err(SessionError::Runtime(format!(
            "failed to build delivery runtime: {reason}"
        )));
    }

    info!(
        event = events::RUNTIME_SPAWN_OK,
        component = COMPONENT,
        worker_thread = thread_name.as_str(),
        "delivery runtime thread spawned"
    );

    Ok(DeliveryLoopHandle {
        worker_thread: thread_name,
        finished: finished_rx,
        _join_handle: join_handle,
    })
}

#[cfg(test)]
mod tests {
    use super::spawn_delivery_loop;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn loop_runs_on_the_named_thread_and_reports_completion() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_in_loop = ran.clone();

        let handle = spawn_delivery_loop("ps-deliver-test".to_string(), move || async move {
            assert_eq!(std::thread::current().name(), Some("ps-deliver-test"));
            ran_in_loop.store(true, Ordering::SeqCst);
        })
        .await
        .expect("spawn should succeed");

        handle.wait_finished().await;

        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(handle.worker_thread(), "ps-deliver-test");
        assert_ne!(handle.thread_id(), std::thread::current().id());
    }

    #[tokio::test]
    async fn panicking_loop_still_reports_completion() {
        let handle = spawn_delivery_loop("ps-deliver-boom".to_string(), || async {
            panic!("delivery loop blew up");
        })
        .await
        .expect("spawn should succeed");

        handle.wait_finished().await;
    }
}
