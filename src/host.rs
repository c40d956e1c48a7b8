//! Host body abstraction
//!
//! The engine never talks to a socket. It consumes an [`IncomingBody`]: an
//! ordered feed of [`BodyChunk`]s plus a [`FlowControl`] handle carrying
//! pause/resume and the client abort notification. The producing side holds a
//! [`BodyFeeder`], which waits while the body is paused.
//!
//! ```
//! use form_ingest::host;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> form_ingest::Result<()> {
//! let (feeder, mut body) = host::channel(4);
//! feeder.send("hello ", false).await?;
//! feeder.send("world", true).await?;
//!
//! let first = body.next_chunk().await.unwrap();
//! assert_eq!(&first.data[..], b"hello ");
//! let last = body.next_chunk().await.unwrap();
//! assert!(last.is_last);
//! assert!(body.next_chunk().await.is_none());
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// One piece of raw body bytes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BodyChunk {
    /// Raw bytes
    pub data: Bytes,
    /// Whether this is the final chunk of the body
    pub is_last: bool,
}

/// Shared pause/resume and abort state of one body
#[derive(Clone, Debug)]
pub struct FlowControl {
    paused: Arc<watch::Sender<bool>>,
    abort: CancellationToken,
}

impl Default for FlowControl {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowControl {
    /// Running, not aborted
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            paused: Arc::new(paused),
            abort: CancellationToken::new(),
        }
    }

    /// Stop the producer from sending further chunks
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    /// Let the producer send chunks again
    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Whether the body is currently paused
    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Raise the client abort notification
    pub fn abort(&self) {
        self.abort.cancel();
    }

    /// Whether the client aborted
    pub fn is_aborted(&self) -> bool {
        self.abort.is_cancelled()
    }

    /// Completes once the client aborts
    pub fn aborted(&self) -> WaitForCancellationFuture<'_> {
        self.abort.cancelled()
    }

    /// Wait until the body is not paused.
    ///
    /// Fails with [`Error::Aborted`] if the client aborts while waiting.
    pub async fn wait_resumed(&self) -> Result<()> {
        let mut paused = self.paused.subscribe();
        tokio::select! {
            biased;
            _ = self.abort.cancelled() => Err(Error::Aborted),
            resumed = paused.wait_for(|paused| !*paused) => match resumed {
                Ok(_) => Ok(()),
                // The sender lives in `self`, so this cannot close while we wait.
                Err(_) => Err(Error::Closed),
            },
        }
    }
}

/// Producing side of a body
#[derive(Clone, Debug)]
pub struct BodyFeeder {
    tx: mpsc::Sender<BodyChunk>,
    control: FlowControl,
}

impl BodyFeeder {
    /// Send the next chunk, waiting while the body is paused
    pub async fn send(&self, data: impl Into<Bytes>, is_last: bool) -> Result<()> {
        tokio::select! {
            biased;
            resumed = self.control.wait_resumed() => resumed?,
            // A body dropped while paused is never resumed.
            _ = self.tx.closed() => return Err(Error::Closed),
        }
        let chunk = BodyChunk {
            data: data.into(),
            is_last,
        };
        tokio::select! {
            biased;
            _ = self.control.aborted() => Err(Error::Aborted),
            sent = self.tx.send(chunk) => sent.map_err(|_| Error::Closed),
        }
    }

    /// Mark the end of the body without further bytes
    pub async fn finish(&self) -> Result<()> {
        self.send(Bytes::new(), true).await
    }

    /// Abort the body as a disconnecting client would
    pub fn abort(&self) {
        self.control.abort();
    }

    /// Flow control shared with the consuming side
    pub fn control(&self) -> &FlowControl {
        &self.control
    }
}

/// Consuming side of a body, handed to the engine
#[derive(Debug)]
pub struct IncomingBody {
    rx: mpsc::Receiver<BodyChunk>,
    control: FlowControl,
    finished: bool,
}

impl IncomingBody {
    /// Next chunk in arrival order.
    ///
    /// Returns `None` after the last chunk, or when every feeder went away.
    pub async fn next_chunk(&mut self) -> Option<BodyChunk> {
        if self.finished {
            return None;
        }
        let chunk = self.rx.recv().await;
        match &chunk {
            Some(chunk) if chunk.is_last => self.finished = true,
            None => self.finished = true,
            _ => {}
        }
        chunk
    }

    /// Flow control shared with the producing side
    pub fn control(&self) -> &FlowControl {
        &self.control
    }

    /// Pause the producer
    pub fn pause(&self) {
        self.control.pause();
    }

    /// Resume the producer
    pub fn resume(&self) {
        self.control.resume();
    }

    /// Whether the client aborted
    pub fn is_aborted(&self) -> bool {
        self.control.is_aborted()
    }

    /// Pump a byte stream (for example an HTTP request body) into a new body.
    ///
    /// Pause/resume is honoured between stream items, and a stream error is
    /// reported as a client abort. Must be called inside a tokio runtime.
    pub fn from_stream<S, B, E>(stream: S, capacity: usize) -> Self
    where
        S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
        B: Into<Bytes> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let (feeder, body) = channel(capacity);
        tokio::spawn(async move {
            let mut stream = std::pin::pin!(stream);
            while let Some(item) = stream.next().await {
                match item {
                    Ok(data) => {
                        let data: Bytes = data.into();
                        if feeder.send(data, false).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "request body stream failed, aborting body");
                        feeder.abort();
                        return;
                    }
                }
            }
            feeder.finish().await.ok();
        });
        body
    }
}

/// Create a connected feeder/body pair buffering up to `capacity` chunks
pub fn channel(capacity: usize) -> (BodyFeeder, IncomingBody) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let control = FlowControl::new();
    (
        BodyFeeder {
            tx,
            control: control.clone(),
        },
        IncomingBody {
            rx,
            control,
            finished: false,
        },
    )
}
