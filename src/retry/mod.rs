//! Retry of remote calls.
//!
//! Every remote call goes through a [`RetryExecutor`]:
//!
//! - Transient failures (see [`TransportErrorKind`]) are retried without an
//!   attempt limit, sleeping a randomized exponential backoff between
//!   attempts.
//! - Terminal failures are returned immediately as [`RetryError::Terminal`].
//! - A fail-fast [`RetryPolicy`] turns a matching transient failure into
//!   [`RetryError::FailedFast`] without retrying.
//! - Registered [`FailureHook`]s run once per failed attempt, before the
//!   backoff sleep. The session keeper uses this to refresh an expired
//!   login so that an auth expiry is not mistaken for a genuine failure.
//!
//! All sleeps are cancellable; cancellation surfaces as
//! [`RetryError::Interrupted`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

mod backoff;
mod pacer;

pub use backoff::RetryConfig;
pub use pacer::{Interrupted, Pacer};

use crate::transport::{TransportError, TransportErrorKind};

/// Controls which failures abort a call instead of being retried.
///
/// Terminal failures always abort regardless of the policy.
#[derive(Clone, Copy, Default)]
pub enum RetryPolicy {
    /// Retry every transient failure.
    #[default]
    RetryTransient,

    /// Abort on the first failure of any kind.
    FailFast,

    /// Abort on failures matching the predicate; retry other transient ones.
    FailFastWhen(fn(&TransportError) -> bool),
}

impl RetryPolicy {
    fn aborts_on(&self, error: &TransportError) -> bool {
        match self {
            RetryPolicy::RetryTransient => false,
            RetryPolicy::FailFast => true,
            RetryPolicy::FailFastWhen(predicate) => predicate(error),
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryPolicy::RetryTransient => f.write_str("RetryTransient"),
            RetryPolicy::FailFast => f.write_str("FailFast"),
            RetryPolicy::FailFastWhen(_) => f.write_str("FailFastWhen(..)"),
        }
    }
}

/// Why a retried call gave up.
#[derive(Debug, Error)]
pub enum RetryError {
    /// The platform refused the call; retrying cannot help.
    #[error("{operation}: {source}")]
    Terminal {
        operation: String,
        source: TransportError,
    },

    /// The policy forbade retrying this failure.
    #[error("{operation} failed without retry: {source}")]
    FailedFast {
        operation: String,
        source: TransportError,
    },

    /// Shutdown was requested while waiting to retry.
    #[error("{operation} interrupted")]
    Interrupted { operation: String },
}

impl RetryError {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, RetryError::Interrupted { .. })
    }

    /// The failure that ended the call, if it ended on one.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            RetryError::Terminal { source, .. } | RetryError::FailedFast { source, .. } => {
                Some(source)
            }
            RetryError::Interrupted { .. } => None,
        }
    }

    pub fn kind(&self) -> Option<TransportErrorKind> {
        self.transport_error().map(|e| e.kind)
    }
}

/// The state of a call after a failed attempt.
#[derive(Debug)]
pub struct RetryAttempt {
    /// Name the call was registered under.
    pub operation: String,

    /// Consecutive failures so far (1 on the first failure).
    pub failures: u32,

    /// Total time slept in backoff before this attempt.
    pub slept: Duration,

    /// The failure that ended this attempt.
    pub error: TransportError,
}

/// Callback run once per failed attempt, before the backoff sleep.
///
/// Hooks may themselves wait (and be interrupted); an interrupted hook ends
/// the call with [`RetryError::Interrupted`].
pub trait FailureHook: Send + Sync {
    fn on_failure<'a>(
        &'a self,
        attempt: &'a RetryAttempt,
    ) -> Pin<Box<dyn Future<Output = Result<(), Interrupted>> + Send + 'a>>;
}

/// Runs remote calls with backoff, sharing a config and a pacer.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
    pacer: Pacer,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig, pacer: Pacer) -> Self {
        RetryExecutor { config, pacer }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    /// Starts describing a call. The name appears in logs and errors.
    pub fn named<'a>(&'a self, operation: impl Into<String>) -> Retry<'a> {
        Retry {
            executor: self,
            operation: operation.into(),
            policy: RetryPolicy::default(),
            hooks: Vec::new(),
        }
    }
}

/// A single call being configured; see [`RetryExecutor::named`].
pub struct Retry<'a> {
    executor: &'a RetryExecutor,
    operation: String,
    policy: RetryPolicy,
    hooks: Vec<&'a dyn FailureHook>,
}

impl<'a> Retry<'a> {
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn fail_fast(self) -> Self {
        self.policy(RetryPolicy::FailFast)
    }

    pub fn on_failure(mut self, hook: &'a dyn FailureHook) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Runs `work` until it succeeds, fails terminally, is aborted by the
    /// policy, or the pacer is cancelled.
    pub async fn run<T, F, Fut>(self, mut work: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let Retry {
            executor,
            operation,
            policy,
            hooks,
        } = self;

        let mut failures: u32 = 0;
        let mut slept = Duration::ZERO;

        loop {
            let error = match work().await {
                Ok(value) => {
                    if failures > 0 {
                        debug!(operation = %operation, failures, "recovered after retries");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };
            failures = failures.saturating_add(1);

            if !error.is_transient() {
                warn!(operation = %operation, error = %error, "terminal failure");
                return Err(RetryError::Terminal {
                    operation,
                    source: error,
                });
            }
            if policy.aborts_on(&error) {
                warn!(operation = %operation, error = %error, "failed; not retrying");
                return Err(RetryError::FailedFast {
                    operation,
                    source: error,
                });
            }

            let attempt = RetryAttempt {
                operation: operation.clone(),
                failures,
                slept,
                error,
            };
            for hook in &hooks {
                if hook.on_failure(&attempt).await.is_err() {
                    return Err(RetryError::Interrupted { operation });
                }
            }

            let delay = executor
                .config
                .delay_for_failure(failures, &mut rand::thread_rng());
            debug!(
                operation = %operation,
                failures,
                delay_ms = delay.as_millis() as u64,
                error = %attempt.error,
                "transient failure; retrying"
            );
            if executor.pacer.sleep(delay).await.is_err() {
                return Err(RetryError::Interrupted { operation });
            }
            slept += delay;
        }
    }
}
