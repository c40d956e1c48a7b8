//! Disk sink
//!
//! Each file part with at least one byte gets a [`PendingWrite`]: a writer
//! task owning a randomly named file plus a bounded chunk queue in front of
//! it. A full queue is the "buffer capacity exceeded" signal that pauses the
//! host body through the shared [`BackpressureGate`].

use super::convergence::Convergence;
use super::gate::BackpressureGate;
use crate::decoder::FileBody;
use crate::error::FormError;
use crate::types::FileInfo;
use crate::utils::random_file_path;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Everything a disk-mode file part needs from its run
#[derive(Debug, Clone)]
pub(crate) struct DiskContext {
    /// Scratch directory the random file names live in
    pub(crate) dir: PathBuf,
    /// Chunks a writer may queue before the sink blocks
    pub(crate) queue_depth: usize,
    /// Per-file size limit
    pub(crate) file_size: Option<u64>,
    pub(crate) gate: BackpressureGate,
    pub(crate) convergence: Arc<Convergence>,
    /// Parent of every writer's cancellation token
    pub(crate) cancel: CancellationToken,
}

/// How a writer task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteReport {
    /// All bytes are on disk
    Written { size: u64 },
    /// The file could not be created, or the path was already taken; nothing
    /// of this run is on disk
    NotCreated,
    /// Writing the file failed; the run failure is recorded
    Failed,
    /// The run failed or was cancelled; the file was removed
    Discarded,
}

/// One in-flight disk job
#[derive(Debug)]
pub(crate) struct PendingWrite {
    tx: Option<mpsc::Sender<Bytes>>,
    handle: Option<JoinHandle<WriteReport>>,
    path: PathBuf,
    report: Option<WriteReport>,
}

impl PendingWrite {
    /// Spawn a writer for a fresh random path in the scratch directory
    pub(crate) fn start(ctx: &DiskContext) -> Self {
        Self::spawn(random_file_path(&ctx.dir), ctx)
    }

    /// Spawn a writer for `path`, which must not exist yet
    pub(super) fn spawn(path: PathBuf, ctx: &DiskContext) -> Self {
        let (tx, rx) = mpsc::channel(ctx.queue_depth.max(1));
        let handle = tokio::spawn(run_writer(
            path.clone(),
            rx,
            ctx.convergence.clone(),
            ctx.cancel.child_token(),
        ));
        Self {
            tx: Some(tx),
            handle: Some(handle),
            path,
            report: None,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Queue a chunk, holding a pause on the host while the queue is full
    pub(crate) async fn push(&mut self, chunk: Bytes, gate: &BackpressureGate) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(chunk) {
            Ok(()) => {}
            Err(TrySendError::Full(chunk)) => {
                let _pause = gate.hold();
                if tx.send(chunk).await.is_err() {
                    self.tx = None;
                }
            }
            // The writer stopped early and already reported why.
            Err(TrySendError::Closed(_)) => self.tx = None,
        }
    }

    /// No more chunks for this file
    pub(crate) fn close(&mut self) {
        self.tx = None;
    }

    /// Wait for the writer task to end.
    ///
    /// Safe to call repeatedly and to drop midway.
    pub(crate) async fn settle(&mut self) -> WriteReport {
        self.close();
        if let Some(handle) = &mut self.handle {
            let report = match handle.await {
                Ok(report) => report,
                Err(e) => {
                    warn!(path = ?self.path, error = %e, "file writer task failed");
                    WriteReport::Failed
                }
            };
            self.handle = None;
            self.report = Some(report);
        }
        self.report.unwrap_or(WriteReport::Failed)
    }

    /// Report of a settled writer
    pub(crate) fn report(&self) -> Option<WriteReport> {
        self.report
    }
}

/// Disk-mode state of one file part; `write` stays `None` for empty parts
#[derive(Debug)]
pub(crate) struct DiskSlot {
    pub(crate) info: FileInfo,
    pub(crate) write: Option<PendingWrite>,
}

impl DiskSlot {
    pub(crate) fn new(info: FileInfo) -> Self {
        Self { info, write: None }
    }
}

/// Stream one file part to disk.
///
/// The file is only created once the first non-empty chunk arrives.
pub(crate) async fn stream_file(
    body: &mut FileBody<'_>,
    slot: &mut DiskSlot,
    ctx: &DiskContext,
) -> Result<(), FormError> {
    let mut size = 0u64;
    while let Some(chunk) = body.chunk().await? {
        if ctx.convergence.is_resolved() {
            return Ok(());
        }
        if chunk.is_empty() {
            continue;
        }
        size += chunk.len() as u64;
        if let Some(max) = ctx.file_size
            && size > max
        {
            return Err(FormError::FileTooLarge {
                filename: slot.info.filename.clone(),
            });
        }
        let write = slot.write.get_or_insert_with(|| PendingWrite::start(ctx));
        write.push(chunk, &ctx.gate).await;
    }
    if let Some(write) = &mut slot.write {
        write.close();
    }
    Ok(())
}

async fn run_writer(
    path: PathBuf,
    rx: mpsc::Receiver<Bytes>,
    convergence: Arc<Convergence>,
    cancel: CancellationToken,
) -> WriteReport {
    let created = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await;
    let file = match created {
        Ok(file) => file,
        Err(e) => {
            warn!(path = ?path, error = %e, "failed to create file");
            convergence.fail(FormError::write(&e));
            return WriteReport::NotCreated;
        }
    };
    debug!(path = ?path, "created file");
    drain_into(file, &path, rx, &convergence, &cancel).await
}

/// Write queued chunks into a file this run created until the queue closes
async fn drain_into(
    mut file: tokio::fs::File,
    path: &Path,
    mut rx: mpsc::Receiver<Bytes>,
    convergence: &Convergence,
    cancel: &CancellationToken,
) -> WriteReport {
    let mut size = 0u64;
    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                drop(file);
                remove_partial(path).await;
                return WriteReport::Discarded;
            }
            chunk = rx.recv() => chunk,
        };
        let Some(chunk) = chunk else {
            break;
        };
        if let Err(e) = file.write_all(&chunk).await {
            warn!(path = ?path, error = %e, "write failed");
            convergence.fail(FormError::write(&e));
            drop(file);
            remove_partial(path).await;
            return WriteReport::Failed;
        }
        size += chunk.len() as u64;
    }

    if let Err(e) = file.flush().await {
        warn!(path = ?path, error = %e, "flush failed");
        convergence.fail(FormError::write(&e));
        drop(file);
        remove_partial(path).await;
        return WriteReport::Failed;
    }
    drop(file);

    // A cancelled run closes the queue too; its file has no owner.
    if convergence.is_failed() || cancel.is_cancelled() {
        remove_partial(path).await;
        return WriteReport::Discarded;
    }
    WriteReport::Written { size }
}

/// Best-effort removal of a file this run created
pub(crate) async fn remove_partial(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = ?path, error = %e, "failed to remove file");
            false
        }
    }
}
