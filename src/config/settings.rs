//! Operational settings for the poll loop.

use std::time::Duration;

use serde::Deserialize;

use super::{ConfigError, Result};
use crate::retry::RetryConfig;
use crate::types::{Credentials, Realm, Username};

/// Default interval between poll cycles (30 seconds).
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Default pause between consecutive remote calls (5 seconds).
const DEFAULT_BRIEF_PAUSE_MS: u64 = 5_000;

/// Default wait after the first login before polling (15 seconds).
const DEFAULT_STARTUP_DELAY_SECS: u64 = 15;

/// Default margin before session expiry at which to re-login (5 minutes).
const DEFAULT_REFRESH_MARGIN_SECS: u64 = 300;

pub const POLL_INTERVAL_ENV: &str = "SUMMON_BOT_POLL_INTERVAL_SECS";
pub const BRIEF_PAUSE_ENV: &str = "SUMMON_BOT_BRIEF_PAUSE_MS";

/// Everything the poll loop needs to run.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// The bot's own account; items it authored are never dispatched.
    pub identity: Username,
    /// Monitored realms. Fetches use their combined listing; bans apply to
    /// each.
    pub realms: Vec<Realm>,
    pub credentials: Credentials,
    pub timing: Timing,
}

/// Timing of the poll loop and its remote calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Sleep between poll cycles.
    ///
    /// Default: 30 seconds. Configure via `SUMMON_BOT_POLL_INTERVAL_SECS`.
    pub poll_interval: Duration,

    /// Pause between consecutive remote calls.
    ///
    /// Default: 5 seconds. Configure via `SUMMON_BOT_BRIEF_PAUSE_MS`.
    pub brief_pause: Duration,

    /// Wait after the initial login before the first cycle.
    pub startup_delay: Duration,

    /// Re-login when the session expires within this margin.
    pub refresh_margin: Duration,

    pub retry: RetryConfig,
}

impl Default for Timing {
    fn default() -> Self {
        Self::new()
    }
}

impl Timing {
    pub fn new() -> Self {
        Timing {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            brief_pause: Duration::from_millis(DEFAULT_BRIEF_PAUSE_MS),
            startup_delay: Duration::from_secs(DEFAULT_STARTUP_DELAY_SECS),
            refresh_margin: Duration::from_secs(DEFAULT_REFRESH_MARGIN_SECS),
            retry: RetryConfig::DEFAULT,
        }
    }

    /// Applies the `[timing]` table of `bot.toml`.
    pub fn with_overrides(self, overrides: &TimingOverrides) -> Self {
        let base = self.retry.base_delay;
        let cap = self.retry.max_delay;
        Timing {
            poll_interval: overrides
                .poll_interval_secs
                .map_or(self.poll_interval, Duration::from_secs),
            brief_pause: overrides
                .brief_pause_ms
                .map_or(self.brief_pause, Duration::from_millis),
            startup_delay: overrides
                .startup_delay_secs
                .map_or(self.startup_delay, Duration::from_secs),
            refresh_margin: overrides
                .refresh_margin_secs
                .map_or(self.refresh_margin, Duration::from_secs),
            retry: RetryConfig::new(
                overrides.retry_base_secs.map_or(base, Duration::from_secs),
                overrides.retry_cap_secs.map_or(cap, Duration::from_secs),
            ),
        }
    }

    /// Applies environment overrides, reading variables through `lookup`.
    ///
    /// Reads `SUMMON_BOT_POLL_INTERVAL_SECS` and `SUMMON_BOT_BRIEF_PAUSE_MS`.
    /// A set but unparsable value is an error rather than silently ignored.
    pub fn with_env(self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let parse = |key: &str| -> Result<Option<u64>> {
            match lookup(key) {
                None => Ok(None),
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| ConfigError::InvalidOverride {
                        key: key.to_string(),
                        value,
                    }),
            }
        };
        Ok(Timing {
            poll_interval: parse(POLL_INTERVAL_ENV)?
                .map_or(self.poll_interval, Duration::from_secs),
            brief_pause: parse(BRIEF_PAUSE_ENV)?.map_or(self.brief_pause, Duration::from_millis),
            ..self
        })
    }

    /// Applies overrides from the process environment.
    pub fn with_process_env(self) -> Result<Self> {
        self.with_env(|key| std::env::var(key).ok())
    }
}

/// The optional `[timing]` table of `bot.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingOverrides {
    pub poll_interval_secs: Option<u64>,
    pub brief_pause_ms: Option<u64>,
    pub startup_delay_secs: Option<u64>,
    pub refresh_margin_secs: Option<u64>,
    pub retry_base_secs: Option<u64>,
    pub retry_cap_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let timing = Timing::new();
        assert_eq!(timing.poll_interval, Duration::from_secs(30));
        assert_eq!(timing.brief_pause, Duration::from_secs(5));
        assert_eq!(timing.startup_delay, Duration::from_secs(15));
        assert_eq!(timing.refresh_margin, Duration::from_secs(300));
        assert_eq!(timing.retry, RetryConfig::DEFAULT);
    }

    #[test]
    fn file_overrides_replace_only_given_fields() {
        let overrides = TimingOverrides {
            poll_interval_secs: Some(60),
            retry_cap_secs: Some(600),
            ..TimingOverrides::default()
        };
        let timing = Timing::new().with_overrides(&overrides);
        assert_eq!(timing.poll_interval, Duration::from_secs(60));
        assert_eq!(timing.brief_pause, Duration::from_secs(5));
        assert_eq!(timing.retry.base_delay, Duration::from_secs(10));
        assert_eq!(timing.retry.max_delay, Duration::from_secs(600));
    }

    #[test]
    fn env_overrides() {
        let timing = Timing::new()
            .with_env(env(&[(POLL_INTERVAL_ENV, "120"), (BRIEF_PAUSE_ENV, "250")]))
            .unwrap();
        assert_eq!(timing.poll_interval, Duration::from_secs(120));
        assert_eq!(timing.brief_pause, Duration::from_millis(250));
    }

    #[test]
    fn missing_env_keeps_values() {
        let timing = Timing::new().with_env(env(&[])).unwrap();
        assert_eq!(timing, Timing::new());
    }

    #[test]
    fn unparsable_env_is_an_error() {
        let err = Timing::new()
            .with_env(env(&[(POLL_INTERVAL_ENV, "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { .. }));
    }
}
