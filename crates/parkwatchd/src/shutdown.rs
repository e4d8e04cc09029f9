//! Waiting on OS threads from async code without pinning the runtime.
//!
//! `spawn_blocking` tasks hold the runtime open when it is dropped, so a
//! blocking `join()` on a stuck thread would delay process exit without
//! bound. [`join_thread`] joins on a detached helper thread instead and
//! gives up after a timeout; the runtime can then shut down at once.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

/// Waits up to `wait` for `handle` to finish.
///
/// Returns `None` on timeout (the thread keeps running, detached) or when
/// the helper thread could not be started.
pub async fn join_thread<T: Send + 'static>(
    handle: JoinHandle<T>,
    wait: Duration,
) -> Option<thread::Result<T>> {
    let (tx, rx) = oneshot::channel();
    let joiner = thread::Builder::new()
        .name("joiner".to_string())
        .spawn(move || {
            // Ignore: the waiter may have given up already
            let _ = tx.send(handle.join());
        });
    if let Err(e) = joiner {
        debug!(error = %e, "Failed to start joiner thread");
        return None;
    }

    match tokio::time::timeout(wait, rx).await {
        Ok(Ok(result)) => Some(result),
        Ok(Err(_)) | Err(_) => None,
    }
}
