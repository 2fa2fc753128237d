//! Cancellable sleeps.
//!
//! Every wait in the bot (poll interval, brief pauses between remote calls,
//! retry backoff) goes through a [`Pacer`] so that a shutdown request ends
//! the wait immediately instead of after up to half an hour of backoff.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// A sleep was cut short by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("interrupted while waiting")]
pub struct Interrupted;

/// Sleeps that end early when the shared token is cancelled.
#[derive(Debug, Clone)]
pub struct Pacer {
    cancel: CancellationToken,
}

impl Pacer {
    pub fn new(cancel: CancellationToken) -> Self {
        Pacer { cancel }
    }

    /// Waits for `duration`, or returns [`Interrupted`] as soon as the token
    /// is cancelled. An already-cancelled token interrupts even a zero wait.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        if self.cancel.is_cancelled() {
            return Err(Interrupted);
        }
        trace!(duration_ms = duration.as_millis() as u64, "sleeping");
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}
