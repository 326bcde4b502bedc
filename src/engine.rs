/*!
 * Engine State
 *
 * Running flag and cancellation shared between a background engine and the
 * control surface that starts and stops it.
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Per-engine running state.
///
/// The control surface flips it through [`EngineState::begin`] and
/// [`EngineState::request_stop`]; the engine's own loop only reads it.
/// A fresh token is issued on every `begin` so a stopped engine can be
/// started again.
#[derive(Debug, Clone)]
pub struct EngineState {
    running: Arc<AtomicBool>,
    token: CancellationToken,
}

impl EngineState {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            token: CancellationToken::new(),
        }
    }

    /// Whether the engine loop should keep iterating.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.token.is_cancelled()
    }

    /// Marks the engine running and returns the handle its task observes.
    ///
    /// Returns `None` when the engine is already running.
    pub fn begin(&mut self) -> Option<EngineState> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        self.token = CancellationToken::new();
        Some(self.clone())
    }

    /// Clears the running flag and wakes any pending sleep.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.token.cancel();
    }

    /// Resolves once a stop has been requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Sleeps for `duration` unless a stop arrives first.
    ///
    /// Returns `true` when the full duration elapsed and the engine is still
    /// running.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(duration) => self.is_running(),
        }
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}
