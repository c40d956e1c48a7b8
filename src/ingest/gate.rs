//! Backpressure gate shared by every file sink of one run
//!
//! Several slow files may ask the single input body to pause at the same
//! time. The gate counts those requests: the body is paused by the first
//! requester and resumed only when the last one has drained.

use crate::host::FlowControl;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Counting pause/resume gate in front of the host body
///
/// Cloning shares the counter.
#[derive(Clone, Debug)]
pub(crate) struct BackpressureGate {
    /// Outstanding pause requests
    depth: Arc<AtomicUsize>,
    control: FlowControl,
}

impl BackpressureGate {
    pub(crate) fn new(control: FlowControl) -> Self {
        Self {
            depth: Arc::new(AtomicUsize::new(0)),
            control,
        }
    }

    /// Request a pause. The body stays paused until the returned guard drops.
    pub(crate) fn hold(&self) -> PauseGuard {
        if self.depth.fetch_add(1, Ordering::SeqCst) == 0 && !self.control.is_aborted() {
            debug!("write queue full, pausing body");
            self.control.pause();
        }
        PauseGuard { gate: self.clone() }
    }

    /// Outstanding pause requests
    pub(crate) fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    fn release(&self) {
        if self.depth.fetch_sub(1, Ordering::SeqCst) == 1 && !self.control.is_aborted() {
            debug!("write queues drained, resuming body");
            self.control.resume();
        }
    }
}

/// One outstanding pause request; dropping it is the drain signal
#[derive(Debug)]
pub(crate) struct PauseGuard {
    gate: BackpressureGate,
}

impl Drop for PauseGuard {
    fn drop(&mut self) {
        self.gate.release();
    }
}
