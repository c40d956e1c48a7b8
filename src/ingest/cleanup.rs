//! Emergency cleanup of a failed disk-mode run

use super::convergence::Convergence;
use super::disk_sink::{PendingWrite, WriteReport, remove_partial};
use super::registry::Registry;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Reverse every disk side effect of a failed run.
///
/// Cancels all writers, waits for them to stop and removes every file the run
/// created, including ones that were already complete. Runs at most once per
/// run; later calls return immediately.
pub(crate) async fn emergency_sweep(
    registry: &mut Registry,
    convergence: &Convergence,
    cancel: &CancellationToken,
) {
    if !convergence.begin_emergency() {
        return;
    }
    cancel.cancel();

    let mut writes: Vec<&mut PendingWrite> = registry.pending_writes().collect();
    info!(files = writes.len(), "emergency sweep started");

    futures::future::join_all(writes.iter_mut().map(|write| write.settle())).await;

    let mut removed = 0usize;
    for write in &writes {
        // The path may belong to someone else.
        if write.report() == Some(WriteReport::NotCreated) {
            continue;
        }
        if remove_partial(write.path()).await {
            removed += 1;
        }
    }
    convergence.finish_emergency();
    info!(files = writes.len(), removed, "emergency sweep finished");
}
