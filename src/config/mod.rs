//! Configuration: operational settings and the read-only named resources
//! handlers consume.
//!
//! A configuration directory looks like:
//!
//! ```text
//! bot.toml             identity, realms, [credentials], optional [timing]
//! lists/banned.txt     one user per line
//! templates/<name>.txt reply templates
//! ```
//!
//! [`load_dir`] reads it into a [`BotConfig`] (what the poll loop needs) and
//! a [`ConfigSet`] (what handlers and the gate read through
//! [`ConfigSource`]).

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub mod loader;
pub mod set;
pub mod settings;

pub use loader::{BOT_FILE, LoadedConfig, load_dir};
pub use set::{ConfigSet, parse_list, parse_template};
pub use settings::{BotConfig, Timing, TimingOverrides};

/// Name of the banned-actor list.
pub const BANNED_LIST: &str = "banned";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid value {value:?} for {key}")]
    InvalidOverride { key: String, value: String },
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Named resources resolved by name. Read-only to the core.
pub trait ConfigSource: Send + Sync {
    /// Entries of a named list; empty if the list does not exist.
    fn list(&self, name: &str) -> &[String];

    /// A named key/value group.
    fn group(&self, name: &str) -> Option<&HashMap<String, String>>;

    /// A named free-text template.
    fn template(&self, name: &str) -> Option<&str>;

    /// Whether `entry` is on the named list. Lists are stored normalized, so
    /// `entry` must already be lower-cased.
    fn list_contains(&self, name: &str, entry: &str) -> bool {
        self.list(name).iter().any(|e| e == entry)
    }
}
