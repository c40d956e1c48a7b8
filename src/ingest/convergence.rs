//! Completion convergence
//!
//! Every terminal signal of a run (decoder close or error, limit and
//! duplicate violations, write failures, client abort) funnels into one
//! [`Convergence`]. The first signal decides the run; later ones are no-ops.

use crate::error::FormError;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Terminal {
    /// The decoder reached the end of the body without a recorded failure
    Closed,
    /// The first recorded failure
    Failed(FormError),
}

/// Progress of the emergency sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum EmergencyState {
    NotStarted = 0,
    InProgress = 1,
    Complete = 2,
}

/// Write-once terminal cell with a completion signal
#[derive(Debug)]
pub(crate) struct Convergence {
    terminal: OnceLock<Terminal>,
    resolved: CancellationToken,
    emergency: AtomicU8,
}

impl Default for Convergence {
    fn default() -> Self {
        Self::new()
    }
}

impl Convergence {
    pub(crate) fn new() -> Self {
        Self {
            terminal: OnceLock::new(),
            resolved: CancellationToken::new(),
            emergency: AtomicU8::new(EmergencyState::NotStarted as u8),
        }
    }

    /// Resolve RUNNING -> RESOLVED. Returns whether this call won.
    fn resolve(&self, terminal: Terminal) -> bool {
        let won = self.terminal.set(terminal).is_ok();
        if won {
            match self.terminal.get() {
                Some(Terminal::Failed(err)) => {
                    debug!(error = %err, code_class = %err.code_class(), "run failed")
                }
                _ => debug!("run closed"),
            }
            self.resolved.cancel();
        }
        won
    }

    /// Record a clean end of body
    pub(crate) fn close(&self) -> bool {
        self.resolve(Terminal::Closed)
    }

    /// Record a failure; the first failure wins
    pub(crate) fn fail(&self, err: FormError) -> bool {
        self.resolve(Terminal::Failed(err))
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.terminal.get().is_some()
    }

    pub(crate) fn is_failed(&self) -> bool {
        matches!(self.terminal.get(), Some(Terminal::Failed(_)))
    }

    pub(crate) fn terminal(&self) -> Option<&Terminal> {
        self.terminal.get()
    }

    /// Completes once the run is resolved
    pub(crate) async fn resolved(&self) {
        self.resolved.cancelled().await
    }

    /// Claim the emergency sweep. Only the first caller gets `true`.
    pub(crate) fn begin_emergency(&self) -> bool {
        self.emergency
            .compare_exchange(
                EmergencyState::NotStarted as u8,
                EmergencyState::InProgress as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    pub(crate) fn finish_emergency(&self) {
        self.emergency
            .store(EmergencyState::Complete as u8, Ordering::SeqCst);
    }

    pub(crate) fn emergency_state(&self) -> EmergencyState {
        match self.emergency.load(Ordering::SeqCst) {
            0 => EmergencyState::NotStarted,
            1 => EmergencyState::InProgress,
            _ => EmergencyState::Complete,
        }
    }
}
