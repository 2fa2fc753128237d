//! The long-running driver: session upkeep and the poll loop.

use thiserror::Error;

pub mod poll;
pub mod session;

pub use poll::{CycleStats, PollLoop};
pub use session::SessionKeeper;

use crate::dispatch::DispatchError;
use crate::retry::{Interrupted, RetryError};
use crate::store::StoreError;

/// Conditions that end the poll loop. The process logs them and exits.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("login failed: {0}")]
    Login(#[source] RetryError),

    #[error("fetch failed: {0}")]
    Fetch(#[source] RetryError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("could not flush dedup store: {0}")]
    Store(#[from] StoreError),

    #[error("interrupted by shutdown")]
    Interrupted,
}

impl FatalError {
    fn login(err: RetryError) -> Self {
        if err.is_interrupted() {
            FatalError::Interrupted
        } else {
            FatalError::Login(err)
        }
    }

    fn fetch(err: RetryError) -> Self {
        if err.is_interrupted() {
            FatalError::Interrupted
        } else {
            FatalError::Fetch(err)
        }
    }

    /// True if the loop ended because shutdown was requested.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            FatalError::Interrupted | FatalError::Dispatch(DispatchError::Interrupted(_))
        )
    }
}

impl From<Interrupted> for FatalError {
    fn from(_: Interrupted) -> Self {
        FatalError::Interrupted
    }
}
