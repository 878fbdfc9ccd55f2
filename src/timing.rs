//! Timed suspension and cooperative cancellation
//!
//! Every wait in a playback sequence goes through [`Pacer::pause`], which
//! is also the only place a sequence can be interrupted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use crate::error::{PlaybackError, PlaybackResult};

#[derive(Default)]
struct TokenState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cancellation token for cooperative cancellation.
#[derive(Clone, Default)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation and wake any pending pause.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Release);
        self.state.notify.notify_waiters();
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Re-arm the token for the next sequence.
    pub fn reset(&self) {
        self.state.cancelled.store(false, Ordering::Release);
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent cancel is not missed
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    fn check(&self) -> PlaybackResult<()> {
        if self.is_cancelled() {
            Err(PlaybackError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Scaled, cancellable sleeps
#[derive(Debug, Clone)]
pub struct Pacer {
    scale: f64,
    token: CancellationToken,
}

impl Pacer {
    pub fn new(scale: f64, token: CancellationToken) -> Self {
        Self { scale, token }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Wall-clock duration of a nominal wait. A scale that yields no
    /// representable duration (negative, NaN) waits not at all.
    pub fn duration(&self, ms: u64) -> Duration {
        Duration::try_from_secs_f64(ms as f64 * self.scale / 1000.0).unwrap_or(Duration::ZERO)
    }

    /// Sleep for `ms` (scaled). Returns `Cancelled` if the token fires
    /// before or during the wait.
    pub async fn pause(&self, ms: u64) -> PlaybackResult<()> {
        self.token.check()?;
        tokio::select! {
            _ = tokio::time::sleep(self.duration(ms)) => {}
            _ = self.token.cancelled() => {}
        }
        self.token.check()
    }
}
