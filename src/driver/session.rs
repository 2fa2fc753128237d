//! Keeps the login session fresh.
//!
//! The keeper records when the current session will expire, measured on the
//! runtime clock at login. Before each cycle the poll loop asks it to
//! [`ensure_fresh`](SessionKeeper::ensure_fresh); the retry executor also
//! consults it after every failed attempt, so an expired credential is
//! replaced before the call is retried.
//!
//! Refreshes are fail-fast: a re-login that fails is logged and left for the
//! next check rather than retried in place.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::retry::{FailureHook, Interrupted, RetryAttempt, RetryError, RetryExecutor, RetryPolicy};
use crate::transport::{Transport, TransportError, TransportErrorKind};
use crate::types::{Credentials, LoginSession};

/// Stand-in deadline for sessions whose lifetime overflows the clock.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

#[derive(Debug)]
struct Held {
    session: LoginSession,
    deadline: Instant,
}

/// Owns the current [`LoginSession`] and replaces it before it expires.
pub struct SessionKeeper<'a, T> {
    transport: &'a T,
    retry: &'a RetryExecutor,
    credentials: &'a Credentials,
    margin: Duration,
    current: Mutex<Option<Held>>,
}

impl<'a, T: Transport> SessionKeeper<'a, T> {
    /// Creates a keeper with no session. `margin` is how long before expiry
    /// a session is replaced.
    pub fn new(
        transport: &'a T,
        retry: &'a RetryExecutor,
        credentials: &'a Credentials,
        margin: Duration,
    ) -> Self {
        SessionKeeper {
            transport,
            retry,
            credentials,
            margin,
            current: Mutex::new(None),
        }
    }

    /// The first login. Network failures are retried; a malformed response
    /// or a terminal rejection is returned.
    pub async fn login(&self) -> Result<(), RetryError> {
        self.login_with(RetryPolicy::FailFastWhen(is_parse_error))
            .await
    }

    /// Re-logs in if there is no session or it expires within the margin.
    ///
    /// Returns whether a usable session is held afterwards. A failed
    /// refresh is logged, not returned; only shutdown is an error.
    pub async fn ensure_fresh(&self) -> Result<bool, Interrupted> {
        if !self.needs_refresh() {
            return Ok(true);
        }
        self.invalidate();
        debug!("refreshing login session");
        match self.login_with(RetryPolicy::FailFast).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_interrupted() => Err(Interrupted),
            Err(e) => {
                warn!(error = %e, "session refresh failed");
                Ok(false)
            }
        }
    }

    /// True if there is no session or it expires within the margin.
    pub fn needs_refresh(&self) -> bool {
        match &*self.lock() {
            Some(held) => held.deadline.saturating_duration_since(Instant::now()) < self.margin,
            None => true,
        }
    }

    /// Drops the current session so the next check re-logs in.
    pub fn invalidate(&self) {
        if self.lock().take().is_some() {
            debug!("login session invalidated");
        }
    }

    /// The current session, if any.
    pub fn session(&self) -> Option<LoginSession> {
        self.lock().as_ref().map(|held| held.session.clone())
    }

    async fn login_with(&self, policy: RetryPolicy) -> Result<(), RetryError> {
        let transport = self.transport;
        let credentials = self.credentials;
        let session = self
            .retry
            .named("login")
            .policy(policy)
            .run(|| transport.login(credentials))
            .await?;

        info!(
            username = %credentials.username,
            expires_at = %session.expires_at(),
            "logged in"
        );
        let now = Instant::now();
        let deadline = now
            .checked_add(session.expires_in)
            .unwrap_or(now + FAR_FUTURE);
        *self.lock() = Some(Held { session, deadline });
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Held>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn is_parse_error(error: &TransportError) -> bool {
    error.kind == TransportErrorKind::Parse
}

impl<T: Transport> FailureHook for SessionKeeper<'_, T> {
    fn on_failure<'b>(
        &'b self,
        attempt: &'b RetryAttempt,
    ) -> Pin<Box<dyn Future<Output = Result<(), Interrupted>> + Send + 'b>> {
        Box::pin(async move {
            if attempt.error.is_unauthorized() {
                debug!(operation = %attempt.operation, "credential rejected");
                self.invalidate();
            }
            self.ensure_fresh().await.map(|_| ())
        })
    }
}
