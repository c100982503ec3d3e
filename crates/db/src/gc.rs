use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default interval between value-log GC sweeps.
const GC_INTERVAL: Duration = Duration::from_secs(60);

/// Handle to the background value-log compaction task.
///
/// Modeled per the concurrency design notes: it is the only true concurrent consumer of the KV
/// handle, has an explicit lifecycle (`start on open, signal on close, join before close
/// returns`), and never observes a partial write because transactions in this adapter are
/// snapshot-isolated copies, not in-place mutations.
pub struct GcHandle {
    cancel: CancellationToken,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl GcHandle {
    /// Starts the GC loop. If there is no running Tokio runtime (e.g. a purely synchronous
    /// caller), the handle degrades to a no-op: there's nothing to compact in an in-memory
    /// adapter, so a missing runtime is not an error condition here.
    pub fn spawn() -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::runtime::Handle::try_current().ok().map(|handle| {
            let cancel = cancel.clone();
            handle.spawn(run_gc_loop(cancel))
        });
        Self { cancel, task }
    }

    /// Signals the loop to stop and waits for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Some(task) = self.task {
            let _ = task.await;
        }
    }
}

impl Drop for GcHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_gc_loop(cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(GC_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(target: "sync::db::gc", "GC task stopping");
                return;
            }
            _ = ticker.tick() => {
                debug!(target: "sync::db::gc", "value-log GC sweep (no-op on the in-memory adapter)");
            }
        }
    }
}
