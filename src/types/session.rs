//! Login credentials and the access session they produce.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Credentials used to log in.
///
/// `Debug` redacts the secrets.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub app_client_id: String,
    pub app_client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("app_client_id", &self.app_client_id)
            .finish_non_exhaustive()
    }
}

/// An access credential with its acquisition time and declared lifetime.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginSession {
    pub access_token: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_in: Duration,
}

impl LoginSession {
    pub fn new(access_token: impl Into<String>, acquired_at: DateTime<Utc>, expires_in: Duration) -> Self {
        LoginSession {
            access_token: access_token.into(),
            acquired_at,
            expires_in,
        }
    }

    /// The instant at which the platform stops accepting the token.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(self.expires_in).unwrap_or(chrono::Duration::MAX);
        self.acquired_at
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl fmt::Debug for LoginSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginSession")
            .field("acquired_at", &self.acquired_at)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_acquired(secs_ago: i64, ttl_secs: u64) -> (LoginSession, DateTime<Utc>) {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let acquired = now - chrono::Duration::seconds(secs_ago);
        (
            LoginSession::new("token", acquired, Duration::from_secs(ttl_secs)),
            now,
        )
    }

    #[test]
    fn expires_at_adds_lifetime() {
        let (session, now) = session_acquired(100, 3600);
        assert_eq!(session.expires_at(), now + chrono::Duration::seconds(3500));
    }

    #[test]
    fn absurd_lifetime_saturates() {
        let (mut session, _) = session_acquired(0, 60);
        session.expires_in = Duration::MAX;
        assert_eq!(session.expires_at(), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn debug_redacts_secrets() {
        let creds = Credentials {
            username: "bot".into(),
            password: "hunter2".into(),
            app_client_id: "id".into(),
            app_client_secret: "shh".into(),
        };
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("shh"));

        let (session, _) = session_acquired(0, 60);
        assert!(!format!("{:?}", session).contains("token"));
    }
}
